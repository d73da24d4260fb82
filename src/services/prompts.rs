//! Instructions sent to the model for each advisor operation.
//!
//! Every JSON-returning prompt asks for bare JSON; the normalizer still copes
//! when the model wraps its answer in Markdown fences anyway.

use crate::models::{ImageInput, MealPlan, UserProfile};

use super::ai_service::{ModelKind, Prompt};

pub const DEFAULT_LANGUAGE: &str = "Simplified Chinese";

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl PromptBuilder {
    /// `language` is the language names and prose in the answers are written in.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn identification(&self, image: ImageInput) -> Prompt {
        let text = format!(
            "Analyse this photo.\n\
             1. First decide whether the photo contains any food or ingredients. If it does not, \
             reply with exactly this JSON: {{\"is_food\": false}}\n\
             2. If it does, identify every item and give its position in the photo as a bounding \
             box in a 0-1000 coordinate space.\n\
             3. For every detected item, state whether it is food (is_food: true/false).\n\
             4. Reply with strict JSON only. Do not use Markdown formatting.\n\
             Example:\n\
             {{\n\
             \x20 \"is_food\": true,\n\
             \x20 \"items\": [\n\
             \x20   {{\"name\": \"tomato\", \"box_2d\": [250, 300, 400, 450], \"is_food\": true}},\n\
             \x20   {{\"name\": \"plate\", \"box_2d\": [200, 250, 800, 850], \"is_food\": false}}\n\
             \x20 ]\n\
             }}\n\
             box_2d is [x1, y1, x2, y2], where (x1, y1) is the top-left corner and (x2, y2) the \
             bottom-right corner.\n\
             Write item names in {}.",
            self.language
        );

        Prompt {
            model: ModelKind::Vision,
            text,
            image: Some(image),
        }
    }

    /// Each name is listed once, in first-seen order.
    pub fn nutrition(&self, ingredients: &[String]) -> Prompt {
        let mut distinct: Vec<&str> = Vec::with_capacity(ingredients.len());
        for name in ingredients {
            if !distinct.contains(&name.as_str()) {
                distinct.push(name);
            }
        }

        let text = format!(
            "Analyse the nutritional content of these ingredients: {}.\n\
             Reply with strict JSON only, without any Markdown code fences.\n\
             The reply must be a list with one element per ingredient, each containing:\n\
             - name: the ingredient name\n\
             - calories: kcal per 100 g\n\
             - protein: protein per 100 g, in grams\n\
             - fat: fat per 100 g, in grams\n\
             - carbs: carbohydrates per 100 g, in grams\n\
             - benefit: its main nutritional value in at most ten words\n\
             Write name and benefit in {}.",
            distinct.join(", "),
            self.language
        );

        text_prompt(text)
    }

    pub fn recommendation(&self, ingredients: &[String], profile: Option<&UserProfile>) -> Prompt {
        let mut text = format!(
            "I have these ingredients at hand: {}.\n\
             Recommend exactly 3 dishes that can be cooked with them.\n",
            ingredients.join(", ")
        );

        if let Some(profile) = profile.filter(|p| !p.is_empty()) {
            // A Map<String, Value> always serializes
            let profile = serde_json::to_string(profile).unwrap_or_default();
            text.push_str(&format!(
                "Tailor the dishes to this diner profile: {}\n",
                profile
            ));
        }

        text.push_str(&format!(
            "Reply with strict JSON only, without any Markdown code fences.\n\
             The reply must be a list, each element containing:\n\
             - name: dish name\n\
             - description: a short introduction\n\
             - ingredients: list of required ingredients\n\
             - steps: detailed cooking steps as a list of strings\n\
             - nutrition_eval: an assessment of its nutritional value\n\
             - taste_eval: an assessment of its taste and texture\n\
             - video_keyword: a search phrase for finding a video of how to cook it \
             (for example \"scrambled eggs with tomato recipe\")\n\
             Write all text in {}.",
            self.language
        ));

        text_prompt(text)
    }

    pub fn evaluation(&self, plan: &MealPlan) -> Prompt {
        // Slot names and dish lists are plain strings
        let plan_json = serde_json::to_string(plan).unwrap_or_else(|_| "{}".to_string());

        let text = format!(
            "This is my meal plan for one day:\n\
             {}\n\n\
             Give it a professional assessment covering:\n\
             1. Nutritional balance (ratio of carbohydrates, protein and fat, vitamin intake, etc.)\n\
             2. Whether the calorie total is reasonable\n\
             3. Ingredient diversity\n\
             4. Suggestions for improvement\n\n\
             Present it as a well-formatted Markdown report written in {}.",
            plan_json, self.language
        );

        text_prompt(text)
    }
}

fn text_prompt(text: String) -> Prompt {
    Prompt {
        model: ModelKind::Text,
        text,
        image: None,
    }
}
