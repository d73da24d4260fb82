use crate::models::ImageInput;

use super::credentials::Credential;
use super::error::ServiceError;

/// Which of the two configured models a prompt targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Accepts image + text.
    Vision,
    Text,
}

impl ModelKind {
    pub fn max_tokens(self) -> u32 {
        match self {
            ModelKind::Vision => 1500,
            ModelKind::Text => 2500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub model: ModelKind,
    pub text: String,
    pub image: Option<ImageInput>,
}

/// Trait for text-in/text-out model providers
#[async_trait::async_trait]
pub trait InferenceService: Send + Sync {
    /// Sends one prompt and returns the model's raw text answer.
    async fn complete(&self, credential: &Credential, prompt: &Prompt)
        -> Result<String, ServiceError>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned answers in order and records every prompt it was sent.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, ServiceError>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, error: ServiceError) -> Self {
            self.replies.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn prompts(&self) -> Vec<Prompt> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn calls_to(&self, model: ModelKind) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.model == model)
                .count()
        }
    }

    #[async_trait::async_trait]
    impl InferenceService for ScriptedModel {
        async fn complete(
            &self,
            _credential: &Credential,
            prompt: &Prompt,
        ) -> Result<String, ServiceError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::MalformedResponse("no scripted reply".into())))
        }
    }
}
