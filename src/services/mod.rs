pub mod ai_service; // Inference trait seam
pub mod credentials;
pub mod dashscope; // DashScope (Qwen) models
pub mod error;
pub mod normalizer;
pub mod prompts;

pub use ai_service::InferenceService;
pub use credentials::CredentialResolver;
pub use dashscope::DashScopeClient;
pub use prompts::PromptBuilder;
