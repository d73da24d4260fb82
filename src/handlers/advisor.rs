use std::sync::Arc;

use crate::models::{
    IdentifiedMeal, Identification, ImageInput, MealPlan, NutritionRecord, RecipeSuggestion,
    UserProfile,
};
use crate::services::credentials::{Credential, CredentialResolver};
use crate::services::error::ServiceError;
use crate::services::normalizer;
use crate::services::prompts::PromptBuilder;
use crate::services::InferenceService;

/// Result of looking at a photo.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifyOutcome {
    NotFood,
    /// The vision model answered with something that could not be read.
    Unreadable { error: String },
    Identified(IdentifiedMeal),
}

/// Entry points of the service. Each call resolves its own credential and
/// holds no state between calls.
pub struct NutritionAdvisor {
    model: Arc<dyn InferenceService>,
    credentials: CredentialResolver,
    prompts: PromptBuilder,
    assume_food_when_unflagged: bool,
    keep_report_code_blocks: bool,
}

impl NutritionAdvisor {
    pub fn new(
        model: Arc<dyn InferenceService>,
        credentials: CredentialResolver,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            model,
            credentials,
            prompts,
            assume_food_when_unflagged: true,
            keep_report_code_blocks: false,
        }
    }

    /// How to treat detected items the vision model did not flag as food or
    /// not food.
    pub fn assume_food_when_unflagged(mut self, assume: bool) -> Self {
        self.assume_food_when_unflagged = assume;
        self
    }

    /// Keep code blocks inside evaluation reports instead of stripping every
    /// fence marker.
    pub fn keep_report_code_blocks(mut self, keep: bool) -> Self {
        self.keep_report_code_blocks = keep;
        self
    }

    /// Detects the items in a photo and looks up nutrition for the ones that
    /// are food. Makes no nutrition call when the photo shows no food.
    pub async fn identify(
        &self,
        api_key: Option<&str>,
        image: ImageInput,
    ) -> Result<IdentifyOutcome, ServiceError> {
        if image.bytes.is_empty() {
            return Err(ServiceError::InvalidUpload("the uploaded file is empty".to_string()));
        }
        let credential = self.credentials.resolve(api_key)?;

        log::info!("📸 Identifying ingredients in a {} byte {} image", image.bytes.len(), image.mime_type);
        let prompt = self.prompts.identification(image);
        let raw = self.model.complete(&credential, &prompt).await?;

        let items = match normalizer::identification(&raw) {
            Identification::NoFood => {
                log::info!("🚫 No food found in the photo");
                return Ok(IdentifyOutcome::NotFood);
            }
            Identification::Failed { error } => return Ok(IdentifyOutcome::Unreadable { error }),
            Identification::Food { items } => items,
        };

        let ingredients: Vec<String> = items
            .iter()
            .filter(|item| item.counts_as_food(self.assume_food_when_unflagged))
            .map(|item| item.name.clone())
            .collect();

        log::info!(
            "🥕 Detected {} items, {} of them food: {:?}",
            items.len(),
            ingredients.len(),
            ingredients
        );

        let nutrition = if ingredients.is_empty() {
            Vec::new()
        } else {
            // The items are already known; a failed lookup only loses the nutrition table
            match self.lookup_nutrition(&credential, &ingredients).await {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("⚠️ Nutrition lookup after identification failed: {}", e);
                    Vec::new()
                }
            }
        };

        Ok(IdentifyOutcome::Identified(IdentifiedMeal {
            ingredients,
            items_with_loc: items,
            nutrition,
        }))
    }

    pub async fn get_nutrition(
        &self,
        api_key: Option<&str>,
        ingredients: &[String],
    ) -> Result<Vec<NutritionRecord>, ServiceError> {
        let credential = self.credentials.resolve(api_key)?;
        self.lookup_nutrition(&credential, ingredients).await
    }

    pub async fn recommend(
        &self,
        api_key: Option<&str>,
        ingredients: &[String],
        profile: Option<&UserProfile>,
    ) -> Result<Vec<RecipeSuggestion>, ServiceError> {
        let credential = self.credentials.resolve(api_key)?;

        log::info!("🍳 Requesting recipes for: {:?}", ingredients);
        let prompt = self.prompts.recommendation(ingredients, profile);
        let raw = self.model.complete(&credential, &prompt).await?;

        let recipes: Vec<RecipeSuggestion> = normalizer::record_list(&raw);
        log::info!("✅ Received {} recipe suggestions", recipes.len());
        Ok(recipes)
    }

    /// Returns a Markdown report on the plan.
    pub async fn evaluate(
        &self,
        api_key: Option<&str>,
        plan: &MealPlan,
    ) -> Result<String, ServiceError> {
        let credential = self.credentials.resolve(api_key)?;

        log::info!("📋 Evaluating meal plan with {} slots", plan.slots().count());
        let prompt = self.prompts.evaluation(plan);
        let raw = self.model.complete(&credential, &prompt).await?;

        if self.keep_report_code_blocks {
            Ok(normalizer::report_keeping_code_blocks(&raw))
        } else {
            Ok(normalizer::report(&raw))
        }
    }

    async fn lookup_nutrition(
        &self,
        credential: &Credential,
        ingredients: &[String],
    ) -> Result<Vec<NutritionRecord>, ServiceError> {
        log::info!("🔬 Requesting nutrition for: {:?}", ingredients);
        let prompt = self.prompts.nutrition(ingredients);
        let raw = self.model.complete(credential, &prompt).await?;

        let records: Vec<NutritionRecord> = normalizer::record_list(&raw);
        log::info!("✅ Received {} nutrition records", records.len());
        Ok(records)
    }
}
