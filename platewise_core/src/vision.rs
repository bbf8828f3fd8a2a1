//! Boundary to the menu vision service.
//!
//! The service itself is an external collaborator: it takes a JPEG of a
//! restaurant menu plus a target language and answers with a list of dishes
//! whose nutrient fields are free text ("350 kcal", "12g", "N/A"). This
//! module owns the pieces on our side of that boundary:
//! - `Dish` and defensive parsing of its numeric text
//! - Decoding of the service response envelope
//! - `MenuVisionService`, the seam implementations plug into
//! - `spawn_analysis`, which runs a call off the owner's thread and hands the
//!   outcome back over a channel

use crate::{FoodItem, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

/// Failures reported by a vision service call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VisionError {
    #[error("Failed to process the image")]
    ImageProcessingFailed,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("No data received from the service")]
    NoDataReceived,

    #[error("Invalid response from the service: {0}")]
    InvalidResponse(String),

    #[error("Failed to parse dish data: {0}")]
    JsonParsingFailed(String),

    #[error("Vision service stopped before answering")]
    ServiceUnavailable,
}

// ============================================================================
// Dish records
// ============================================================================

/// One dish recognised on a menu
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub translated_name: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub calories: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub protein: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub carbs: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub fat: String,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
}

impl Dish {
    /// Translated name, or the original when no translation was given
    pub fn display_name(&self) -> &str {
        if self.translated_name.trim().is_empty() {
            &self.original_name
        } else {
            &self.translated_name
        }
    }

    pub fn calories_value(&self) -> u32 {
        parse_quantity(&self.calories)
    }

    pub fn protein_value(&self) -> u32 {
        parse_quantity(&self.protein)
    }

    pub fn carbs_value(&self) -> u32 {
        parse_quantity(&self.carbs)
    }

    pub fn fat_value(&self) -> u32 {
        parse_quantity(&self.fat)
    }
}

impl FoodItem {
    /// Build a loggable item from a scanned dish, stamped at `at`
    pub fn from_dish(dish: &Dish, at: DateTime<Local>) -> Self {
        FoodItem {
            id: Uuid::new_v4(),
            name: dish.display_name().to_string(),
            calories: dish.calories_value(),
            protein: dish.protein_value(),
            carbs: dish.carbs_value(),
            fat: dish.fat_value(),
            dietary_tags: dish.dietary_tags.iter().cloned().collect(),
            date_added: at,
        }
    }
}

/// Parse a free-text nutrient amount such as `"350 kcal"` or `"120g"`.
///
/// Trailing unit letters are stripped. Anything that is still not a
/// non-negative number (`"N/A"`, `"unknown"`, `"-5"`) yields 0.
pub fn parse_quantity(text: &str) -> u32 {
    let numeric = text
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace());

    if let Ok(value) = numeric.parse::<u32>() {
        return value;
    }

    match numeric.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value.round() as u32,
        _ => 0,
    }
}

/// Accept nutrient fields sent either as text or as bare JSON numbers
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

// ============================================================================
// Response decoding
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Decode a raw service response body into dishes.
///
/// Accepts the generative-model envelope, whose first candidate's first
/// text part holds a JSON array of dishes, or a bare dish array.
pub fn decode_response(body: &[u8]) -> std::result::Result<Vec<Dish>, VisionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(VisionError::NoDataReceived);
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

    if value.is_array() {
        return parse_dishes(value);
    }

    let envelope: GenerateResponse = serde_json::from_value(value)
        .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| VisionError::InvalidResponse("no candidate text".into()))?;

    let dishes: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| VisionError::JsonParsingFailed(e.to_string()))?;
    parse_dishes(dishes)
}

fn parse_dishes(value: serde_json::Value) -> std::result::Result<Vec<Dish>, VisionError> {
    serde_json::from_value(value).map_err(|e| VisionError::JsonParsingFailed(e.to_string()))
}

// ============================================================================
// Service seam and dispatch
// ============================================================================

/// A menu analysis backend
pub trait MenuVisionService: Send + Sync {
    fn analyze_menu(
        &self,
        image: &[u8],
        language: &str,
    ) -> std::result::Result<Vec<Dish>, VisionError>;
}

/// Answers every request with a response body recorded on disk
#[derive(Clone, Debug)]
pub struct ReplayVisionService {
    response_path: PathBuf,
}

impl ReplayVisionService {
    pub fn new(response_path: impl Into<PathBuf>) -> Self {
        Self {
            response_path: response_path.into(),
        }
    }
}

impl MenuVisionService for ReplayVisionService {
    fn analyze_menu(
        &self,
        image: &[u8],
        language: &str,
    ) -> std::result::Result<Vec<Dish>, VisionError> {
        if image.is_empty() {
            return Err(VisionError::ImageProcessingFailed);
        }

        let body = std::fs::read(&self.response_path).map_err(|e| {
            VisionError::RequestFailed(format!("{}: {}", self.response_path.display(), e))
        })?;

        let dishes = decode_response(&body)?;
        tracing::info!(
            "Replayed {} dishes for a {}-byte image ({})",
            dishes.len(),
            image.len(),
            language
        );
        Ok(dishes)
    }
}

/// Completion message for one analysis request
#[derive(Debug)]
pub struct VisionOutcome {
    pub language: String,
    pub result: std::result::Result<Vec<Dish>, VisionError>,
}

/// Run `service` on a worker thread and send the outcome through `reply`.
///
/// The owner of the store receives on its own thread and applies the dishes
/// there, so the store keeps a single writer.
pub fn spawn_analysis(
    service: Arc<dyn MenuVisionService>,
    image: Vec<u8>,
    language: String,
    reply: Sender<VisionOutcome>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("menu-vision".into())
        .spawn(move || {
            let result = service.analyze_menu(&image, &language);
            if let Err(e) = &result {
                tracing::warn!("Menu analysis failed: {}", e);
            }
            if reply.send(VisionOutcome { language, result }).is_err() {
                tracing::debug!("Menu analysis finished after the receiver went away");
            }
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    const DISHES_JSON: &str = r#"[
        {"originalName":"Pierogi ruskie","translatedName":"Potato dumplings","calories":"450 kcal","protein":"12g","carbs":"60g","fat":"18g","dietaryTags":["Vegetarian"]},
        {"originalName":"Żurek","translatedName":"","calories":"N/A","protein":"N/A","carbs":"20g","fat":"unknown","dietaryTags":[]}
    ]"#;

    fn envelope(text: &str) -> Vec<u8> {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
        .to_string()
        .into_bytes()
    }

    struct FailingService;

    impl MenuVisionService for FailingService {
        fn analyze_menu(
            &self,
            _image: &[u8],
            _language: &str,
        ) -> std::result::Result<Vec<Dish>, VisionError> {
            Err(VisionError::RequestFailed("connection reset".into()))
        }
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("N/A"), 0);
        assert_eq!(parse_quantity("120g"), 120);
        assert_eq!(parse_quantity("350 kcal"), 350);
        assert_eq!(parse_quantity(" 42 "), 42);
        assert_eq!(parse_quantity("12.6 g"), 13);
        assert_eq!(parse_quantity("-5g"), 0);
        assert_eq!(parse_quantity("about 300"), 0);
        assert_eq!(parse_quantity(""), 0);
    }

    #[test]
    fn test_parse_quantity_rejects_separators_and_punctuation() {
        // Only trailing unit letters are stripped; anything else leaves a
        // non-numeric remainder and the amount counts as unknown.
        assert_eq!(parse_quantity("1,200 kcal"), 0);
        assert_eq!(parse_quantity("350 kcal."), 0);
        assert_eq!(parse_quantity("~300 kcal"), 0);
        assert_eq!(parse_quantity("1200 kcal"), 1200);
    }

    #[test]
    fn test_dish_to_food_item() {
        let dishes: Vec<Dish> = serde_json::from_str(DISHES_JSON).unwrap();

        let at = Local::now();
        let first = FoodItem::from_dish(&dishes[0], at);
        assert_eq!(first.date_added, at);
        assert_eq!(first.name, "Potato dumplings");
        assert_eq!(first.calories, 450);
        assert_eq!(first.protein, 12);
        assert!(first.dietary_tags.contains("Vegetarian"));

        let second = FoodItem::from_dish(&dishes[1], at);
        assert_eq!(second.name, "Żurek");
        assert_eq!(second.calories, 0);
        assert_eq!(second.carbs, 20);
        assert_eq!(second.fat, 0);
    }

    #[test]
    fn test_numeric_fields_accept_numbers() {
        let dish: Dish =
            serde_json::from_str(r#"{"originalName":"Soup","calories":210,"protein":9.5}"#)
                .unwrap();
        assert_eq!(dish.calories_value(), 210);
        assert_eq!(dish.protein_value(), 10);
        assert_eq!(dish.fat_value(), 0);
    }

    #[test]
    fn test_decode_envelope() {
        let dishes = decode_response(&envelope(DISHES_JSON)).unwrap();
        assert_eq!(dishes.len(), 2);
        assert_eq!(dishes[0].original_name, "Pierogi ruskie");
    }

    #[test]
    fn test_decode_bare_array() {
        let dishes = decode_response(DISHES_JSON.as_bytes()).unwrap();
        assert_eq!(dishes.len(), 2);
    }

    #[test]
    fn test_decode_failures() {
        assert_eq!(decode_response(b"  "), Err(VisionError::NoDataReceived));
        assert!(matches!(
            decode_response(b"<html>"),
            Err(VisionError::InvalidResponse(_))
        ));
        assert!(matches!(
            decode_response(br#"{"candidates":[]}"#),
            Err(VisionError::InvalidResponse(_))
        ));
        assert!(matches!(
            decode_response(&envelope("Sorry, I cannot read this menu.")),
            Err(VisionError::JsonParsingFailed(_))
        ));
    }

    #[test]
    fn test_replay_service() {
        let temp_dir = tempfile::tempdir().unwrap();
        let response_path = temp_dir.path().join("response.json");
        std::fs::write(&response_path, envelope(DISHES_JSON)).unwrap();

        let service = ReplayVisionService::new(&response_path);
        let dishes = service.analyze_menu(&[0xFF, 0xD8, 0xFF], "English").unwrap();
        assert_eq!(dishes.len(), 2);

        assert_eq!(
            service.analyze_menu(&[], "English"),
            Err(VisionError::ImageProcessingFailed)
        );

        let missing = ReplayVisionService::new(temp_dir.path().join("missing.json"));
        assert!(matches!(
            missing.analyze_menu(&[1], "English"),
            Err(VisionError::RequestFailed(_))
        ));
    }

    #[test]
    fn test_spawn_analysis_delivers_outcome() {
        let temp_dir = tempfile::tempdir().unwrap();
        let response_path = temp_dir.path().join("response.json");
        std::fs::write(&response_path, DISHES_JSON).unwrap();

        let (tx, rx) = channel();
        let service: Arc<dyn MenuVisionService> = Arc::new(ReplayVisionService::new(&response_path));
        let handle = spawn_analysis(service, vec![1, 2, 3], "Polish".into(), tx).unwrap();

        let outcome = rx.recv().unwrap();
        handle.join().unwrap();
        assert_eq!(outcome.language, "Polish");
        assert_eq!(outcome.result.unwrap().len(), 2);
    }

    #[test]
    fn test_spawn_analysis_delivers_failure() {
        let (tx, rx) = channel();
        let handle =
            spawn_analysis(Arc::new(FailingService), vec![1], "English".into(), tx).unwrap();

        let outcome = rx.recv().unwrap();
        handle.join().unwrap();
        assert_eq!(
            outcome.result,
            Err(VisionError::RequestFailed("connection reset".into()))
        );
    }
}
