use serde::{Deserialize, Serialize};

use crate::models::{IdentifiedMeal, MealPlan, UserProfile};

/// Header a caller can use to bring its own DashScope key.
pub const API_KEY_HEADER: &str = "x-api-key";

pub const NOT_FOOD_MESSAGE: &str =
    "No valid ingredients recognized, please upload a photo that contains food.";

// Request bodies

#[derive(Debug, Deserialize)]
pub struct IngredientsRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct MealPlanRequest {
    pub plan: MealPlan,
}

/// Every endpoint answers HTTP 200 with this envelope; callers inspect
/// `status` to tell success from failure.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiReply<T> {
    Success(T),
    Error(ErrorReply),
}

#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_food: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DataReply<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ReportReply {
    pub report: String,
}

pub type IdentifyReply = ApiReply<IdentifiedMeal>;

impl<T> ApiReply<T> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiReply::Error(ErrorReply {
            message: message.into(),
            is_food: None,
        })
    }

    pub fn not_food(message: impl Into<String>) -> Self {
        ApiReply::Error(ErrorReply {
            message: message.into(),
            is_food: Some(false),
        })
    }
}

pub mod server {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, Multipart, State},
        http::HeaderMap,
        routing::{get, post},
        Json, Router,
    };
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::services::{ServeDir, ServeFile};

    use crate::handlers::{IdentifyOutcome, NutritionAdvisor};
    use crate::models::{ImageInput, NutritionRecord, RecipeSuggestion};
    use crate::services::error::ServiceError;

    pub struct AppState {
        pub advisor: Arc<NutritionAdvisor>,
    }

    #[derive(Debug, Clone)]
    pub struct RouterOptions {
        /// Built single-page frontend served for every non-API path.
        pub static_dir: PathBuf,
        pub max_upload_bytes: usize,
    }

    pub fn create_api_router(advisor: Arc<NutritionAdvisor>, options: RouterOptions) -> Router {
        let state = Arc::new(AppState { advisor });

        let router = Router::new()
            .route("/api/identify", post(identify_handler))
            .route("/api/nutrition", post(nutrition_handler))
            .route("/api/recommend", post(recommend_handler))
            .route("/api/evaluate", post(evaluate_handler))
            .route("/health", get(health_check));

        let index = options.static_dir.join("index.html");
        let router = if index.is_file() {
            log::info!("🗂️ Serving frontend from {}", options.static_dir.display());
            router.fallback_service(ServeDir::new(&options.static_dir).fallback(ServeFile::new(index)))
        } else {
            log::warn!(
                "⚠️ No frontend build at {}, only the API is served",
                options.static_dir.display()
            );
            router.fallback(frontend_missing)
        };

        router
            .layer(DefaultBodyLimit::max(options.max_upload_bytes))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }

    fn api_key(headers: &HeaderMap) -> Option<&str> {
        headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
    }

    fn failure<T>(operation: &str, e: ServiceError) -> Json<ApiReply<T>> {
        log::error!("❌ {} failed: {}", operation, e);
        Json(ApiReply::error(e.to_string()))
    }

    /// Every identify error carries `is_food: false`.
    fn identify_failure(e: ServiceError) -> Json<IdentifyReply> {
        log::error!("❌ identify failed: {}", e);
        Json(ApiReply::not_food(e.to_string()))
    }

    async fn read_upload(multipart: &mut Multipart) -> Result<ImageInput, ServiceError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::InvalidUpload(e.to_string()))?
        {
            if field.name() != Some("file") {
                continue;
            }

            let mime_type = ImageInput::mime_for(field.content_type(), field.file_name());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::InvalidUpload(e.to_string()))?;

            return Ok(ImageInput::new(mime_type, bytes.to_vec()));
        }

        Err(ServiceError::InvalidUpload("missing 'file' field".to_string()))
    }

    async fn identify_handler(
        State(state): State<Arc<AppState>>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> Json<IdentifyReply> {
        let image = match read_upload(&mut multipart).await {
            Ok(image) => image,
            Err(e) => return identify_failure(e),
        };

        match state.advisor.identify(api_key(&headers), image).await {
            Ok(IdentifyOutcome::Identified(meal)) => Json(ApiReply::Success(meal)),
            Ok(IdentifyOutcome::NotFood) => Json(ApiReply::not_food(NOT_FOOD_MESSAGE)),
            Ok(IdentifyOutcome::Unreadable { error }) => {
                log::warn!("⚠️ Identification answer unreadable: {}", error);
                Json(ApiReply::not_food(error))
            }
            Err(e) => identify_failure(e),
        }
    }

    async fn nutrition_handler(
        State(state): State<Arc<AppState>>,
        headers: HeaderMap,
        Json(request): Json<IngredientsRequest>,
    ) -> Json<ApiReply<DataReply<Vec<NutritionRecord>>>> {
        match state
            .advisor
            .get_nutrition(api_key(&headers), &request.ingredients)
            .await
        {
            Ok(data) => Json(ApiReply::Success(DataReply { data })),
            Err(e) => failure("nutrition", e),
        }
    }

    async fn recommend_handler(
        State(state): State<Arc<AppState>>,
        headers: HeaderMap,
        Json(request): Json<IngredientsRequest>,
    ) -> Json<ApiReply<DataReply<Vec<RecipeSuggestion>>>> {
        match state
            .advisor
            .recommend(
                api_key(&headers),
                &request.ingredients,
                request.user_profile.as_ref(),
            )
            .await
        {
            Ok(data) => Json(ApiReply::Success(DataReply { data })),
            Err(e) => failure("recommend", e),
        }
    }

    async fn evaluate_handler(
        State(state): State<Arc<AppState>>,
        headers: HeaderMap,
        Json(request): Json<MealPlanRequest>,
    ) -> Json<ApiReply<ReportReply>> {
        match state.advisor.evaluate(api_key(&headers), &request.plan).await {
            Ok(report) => Json(ApiReply::Success(ReportReply { report })),
            Err(e) => failure("evaluate", e),
        }
    }

    async fn frontend_missing() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "error": "Frontend not built or dist folder missing" }))
    }

    async fn health_check() -> &'static str {
        "OK"
    }
}
