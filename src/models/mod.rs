use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// An object the vision model located in the uploaded photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedItem {
    pub name: String,
    /// `[x1, y1, x2, y2]` in a 0-1000 coordinate space, top-left to bottom-right.
    #[serde(
        rename = "box_2d",
        alias = "bounding_box",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bounding_box: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_food: Option<bool>,
}

impl DetectedItem {
    /// Whether the item counts as an ingredient. `assume_food` decides items
    /// the model did not flag either way.
    pub fn counts_as_food(&self, assume_food: bool) -> bool {
        self.is_food.unwrap_or(assume_food)
    }
}

/// What the vision model made of a photo.
#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    NoFood,
    Food { items: Vec<DetectedItem> },
    /// The model answered but the answer could not be read.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub name: String,
    #[serde(rename = "calories", deserialize_with = "lenient_number")]
    pub calories_per_100g: f64,
    #[serde(rename = "protein", deserialize_with = "lenient_number")]
    pub protein_g: f64,
    #[serde(rename = "fat", deserialize_with = "lenient_number")]
    pub fat_g: f64,
    #[serde(rename = "carbs", deserialize_with = "lenient_number")]
    pub carbs_g: f64,
    #[serde(default)]
    pub benefit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSuggestion {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub steps: Vec<String>,
    #[serde(default)]
    pub nutrition_eval: String,
    #[serde(default)]
    pub taste_eval: String,
    #[serde(default)]
    pub video_keyword: String,
}

/// Free-form diner preferences (allergies, goals, taste). Passed to the model
/// as-is.
pub type UserProfile = Map<String, Value>;

/// A day of meals: slot label ("breakfast") to dish or ingredient names.
/// Slots keep the order the client sent them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct MealPlan {
    slots: Vec<(String, Vec<String>)>,
}

impl MealPlan {
    pub fn slots(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.slots.iter().map(|(s, d)| (s.as_str(), d.as_slice()))
    }
}

#[cfg(test)]
impl MealPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(mut self, slot: impl Into<String>, dishes: Vec<String>) -> Self {
        self.slots.push((slot.into(), dishes));
        self
    }
}

impl TryFrom<Map<String, Value>> for MealPlan {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut slots = Vec::with_capacity(map.len());
        for (slot, dishes) in map {
            let dishes: Vec<String> = serde_json::from_value(dishes)
                .map_err(|e| format!("meal slot '{}' must be a list of strings: {}", slot, e))?;
            slots.push((slot, dishes));
        }
        Ok(Self { slots })
    }
}

impl From<MealPlan> for Map<String, Value> {
    fn from(plan: MealPlan) -> Self {
        plan.slots
            .into_iter()
            .map(|(slot, dishes)| (slot, Value::from(dishes)))
            .collect()
    }
}

/// An uploaded photo, ready to be inlined into a vision request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Picks the MIME type from the upload's declared content type, falling
    /// back to the file extension and then to JPEG.
    pub fn mime_for(content_type: Option<&str>, file_name: Option<&str>) -> String {
        if let Some(ct) = content_type.filter(|ct| ct.starts_with("image/")) {
            return ct.to_string();
        }

        let ext = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            _ => "image/jpeg",
        }
        .to_string()
    }
}

/// Everything `identify` hands back when the photo shows food.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifiedMeal {
    /// Names of the items counted as food, in detection order.
    pub ingredients: Vec<String>,
    /// Every detected item, food or not, so the caller can flag the rest.
    pub items_with_loc: Vec<DetectedItem>,
    pub nutrition: Vec<NutritionRecord>,
}

/// Accepts `52`, `52.5`, `"52 kcal"` or `"1,250"`.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => parse_quantity(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("not a number: {:?}", s))),
        other => Err(serde::de::Error::custom(format!(
            "expected a number, got {}",
            other
        ))),
    }
}

/// Pulls the first number out of a free-text quantity such as "about 1,250 kcal".
pub fn parse_quantity(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let token = token.trim_end_matches(['.', ',']);

    // "1,250" is a thousands separator, "12,5" a decimal comma
    let cleaned = match token.rsplit_once(',') {
        Some((_, tail)) if !token.contains('.') && tail.len() == 3 => token.replace(',', ""),
        _ => token.replace(',', "."),
    };

    cleaned.parse::<f64>().ok()
}

/// Accepts a JSON list of strings or a single newline-separated string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<String>),
        One(String),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("650"), Some(650.0));
        assert_eq!(parse_quantity("1,250 kcal"), Some(1250.0));
        assert_eq!(parse_quantity("12,5 g"), Some(12.5));
        assert_eq!(parse_quantity("约 3.2g"), Some(3.2));
        assert_eq!(parse_quantity("50-60"), Some(50.0));
        assert_eq!(parse_quantity("unknown"), None);
    }

    #[test]
    fn test_nutrition_record_accepts_strings_with_units() {
        let record: NutritionRecord = serde_json::from_value(json!({
            "name": "egg",
            "calories": "144 kcal",
            "protein": 13.3,
            "fat": "8.8g",
            "carbs": 2
        }))
        .unwrap();

        assert_eq!(record.calories_per_100g, 144.0);
        assert_eq!(record.protein_g, 13.3);
        assert_eq!(record.fat_g, 8.8);
        assert_eq!(record.carbs_g, 2.0);
        assert_eq!(record.benefit, "");
    }

    #[test]
    fn test_nutrition_record_rejects_missing_fields() {
        let result = serde_json::from_value::<NutritionRecord>(json!({
            "name": "egg",
            "calories": 144
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_nutrition_record_serializes_wire_names() {
        let record = NutritionRecord {
            name: "rice".to_string(),
            calories_per_100g: 116.0,
            protein_g: 2.6,
            fat_g: 0.3,
            carbs_g: 25.9,
            benefit: "energy".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["calories"], json!(116.0));
        assert_eq!(value["carbs"], json!(25.9));
        assert!(value.get("calories_per_100g").is_none());
    }

    #[test]
    fn test_recipe_steps_from_single_string() {
        let recipe: RecipeSuggestion = serde_json::from_value(json!({
            "name": "Omelette",
            "steps": "Beat the eggs\n\nFry them\n"
        }))
        .unwrap();
        assert_eq!(recipe.steps, vec!["Beat the eggs", "Fry them"]);
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn test_detected_item_wire_format() {
        let item: DetectedItem =
            serde_json::from_value(json!({"name": "plate", "box_2d": [200, 250, 800, 850]}))
                .unwrap();
        assert_eq!(item.bounding_box, Some([200.0, 250.0, 800.0, 850.0]));
        assert_eq!(item.is_food, None);
        assert!(item.counts_as_food(true));
        assert!(!item.counts_as_food(false));

        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("box_2d").is_some());
        assert!(value.get("is_food").is_none());
    }

    #[test]
    fn test_meal_plan_keeps_slot_order() {
        let plan: MealPlan = serde_json::from_value(json!({
            "breakfast": ["congee"],
            "lunch": ["rice", "fish"],
            "dinner": []
        }))
        .unwrap();

        let slots: Vec<&str> = plan.slots().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec!["breakfast", "lunch", "dinner"]);
        assert_eq!(
            serde_json::to_string(&plan).unwrap(),
            r#"{"breakfast":["congee"],"lunch":["rice","fish"],"dinner":[]}"#
        );
    }

    #[test]
    fn test_meal_plan_rejects_non_list_slot() {
        let result = serde_json::from_value::<MealPlan>(json!({"breakfast": "congee"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_mime_for_upload() {
        assert_eq!(ImageInput::mime_for(Some("image/png"), Some("a.jpg")), "image/png");
        assert_eq!(ImageInput::mime_for(None, Some("dish.PNG")), "image/png");
        assert_eq!(
            ImageInput::mime_for(Some("application/octet-stream"), Some("dish.webp")),
            "image/webp"
        );
        assert_eq!(ImageInput::mime_for(None, None), "image/jpeg");
    }
}
