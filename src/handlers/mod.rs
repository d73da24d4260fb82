pub mod advisor;

pub use advisor::{IdentifyOutcome, NutritionAdvisor};
