//! Normalization of heterogeneous detection responses
//!
//! Deployed detector backends disagree on the response shape. Three are
//! recognized, matched explicitly rather than duck-typed:
//!
//! 1. numeric class: `{"prediction": 2, "confidence": 0.91}`
//! 2. named class: `{"prediction_text": "hate", ...}` or `{"category": ...}`
//! 3. scores only: `{"probabilities": {"clean": 0.1, ...}}`
//!
//! A missing probability map is legal in shapes 1 and 2 and is synthesized
//! from the confidence; anything else is a `Malformed` failure.

use serde_json::{Map, Value};

use crate::classify::{Category, CategoryScores, ClassificationError, ClassificationResult};

/// Response shape variants the normalizer recognizes
#[derive(Debug, Clone, PartialEq)]
enum RawShape {
    /// Numeric class index into [`Category::INDEX_TABLE`]
    Indexed { index: u64 },
    /// Class named directly by the service
    Named { name: String },
    /// No class field at all; category is the dominant probability
    ScoresOnly,
}

/// Map one raw service response into the canonical result record
pub fn normalize_raw(raw: &Value) -> Result<ClassificationResult, ClassificationError> {
    let map = raw
        .as_object()
        .ok_or_else(|| ClassificationError::Malformed(format!("expected object, got {raw}")))?;

    let shape = detect_shape(map)?;
    let probabilities = parse_probabilities(map)?;
    let reported_confidence = parse_confidence(map)?;

    let category = match &shape {
        RawShape::Indexed { index } => Category::from_index(*index).unwrap_or_else(|| {
            tracing::warn!("prediction index {index} outside the class table");
            Category::Unknown
        }),
        RawShape::Named { name } => Category::from_name(name).unwrap_or_else(|| {
            tracing::warn!("unrecognized category name {name:?}");
            Category::Unknown
        }),
        RawShape::ScoresOnly => {
            // Guaranteed present by detect_shape
            let scores = probabilities.ok_or_else(|| {
                ClassificationError::Malformed("scores-only response without probabilities".into())
            })?;
            let (category, confidence) = scores.dominant();
            return Ok(finish(map, category, confidence, Some(scores)));
        }
    };

    let confidence = match reported_confidence {
        Some(c) => c,
        // Some deployments omit confidence when they include the full map
        None => match &probabilities {
            Some(scores) => scores.get(category),
            None => {
                return Err(ClassificationError::Malformed(
                    "response carries neither confidence nor probabilities".into(),
                ))
            }
        },
    };

    Ok(finish(map, category, confidence, probabilities))
}

fn finish(
    map: &Map<String, Value>,
    category: Category,
    confidence: f32,
    probabilities: Option<CategoryScores>,
) -> ClassificationResult {
    let confidence = confidence.clamp(0.0, 1.0);
    ClassificationResult {
        category,
        confidence,
        probabilities: probabilities
            .unwrap_or_else(|| CategoryScores::one_hot_ish(category, confidence)),
        keywords: parse_keywords(map),
    }
}

fn detect_shape(map: &Map<String, Value>) -> Result<RawShape, ClassificationError> {
    if let Some(value) = map.get("prediction") {
        let index = value.as_u64().ok_or_else(|| {
            ClassificationError::Malformed(format!("prediction must be an integer, got {value}"))
        })?;
        return Ok(RawShape::Indexed { index });
    }

    for key in ["prediction_text", "category"] {
        if let Some(value) = map.get(key) {
            let name = value.as_str().ok_or_else(|| {
                ClassificationError::Malformed(format!("{key} must be a string, got {value}"))
            })?;
            return Ok(RawShape::Named {
                name: name.to_string(),
            });
        }
    }

    if map.contains_key("probabilities") {
        return Ok(RawShape::ScoresOnly);
    }

    Err(ClassificationError::Malformed(
        "no prediction, prediction_text, category, or probabilities field".into(),
    ))
}

fn parse_confidence(map: &Map<String, Value>) -> Result<Option<f32>, ClassificationError> {
    match map.get("confidence") {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(|f| Some(f as f32))
            .ok_or_else(|| {
                ClassificationError::Malformed(format!("confidence must be a number, got {value}"))
            }),
    }
}

fn parse_probabilities(
    map: &Map<String, Value>,
) -> Result<Option<CategoryScores>, ClassificationError> {
    let Some(value) = map.get("probabilities") else {
        return Ok(None);
    };
    let entries = value.as_object().ok_or_else(|| {
        ClassificationError::Malformed(format!("probabilities must be an object, got {value}"))
    })?;

    let mut scores = CategoryScores::default();
    for (name, score) in entries {
        let score = score.as_f64().ok_or_else(|| {
            ClassificationError::Malformed(format!("probability {name:?} is not a number"))
        })? as f32;
        match Category::from_name(name) {
            Some(Category::Clean) => scores.clean = score,
            Some(Category::Offensive) => scores.offensive = score,
            Some(Category::Hate) => scores.hate = score,
            Some(Category::Spam) => scores.spam = score,
            // Extra classes some deployments report (e.g. "neutral") are dropped
            _ => tracing::debug!("ignoring unknown probability class {name:?}"),
        }
    }
    Ok(Some(scores))
}

fn parse_keywords(map: &Map<String, Value>) -> Vec<String> {
    match map.get("keywords").and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_prediction_shape() {
        let result = normalize_raw(&json!({"prediction": 2, "confidence": 0.91})).unwrap();
        assert_eq!(result.category, Category::Hate);
        assert!((result.confidence - 0.91).abs() < f32::EPSILON);
        // Missing probabilities synthesized roughly one-hot at hate
        assert!((result.probabilities.hate - 0.91).abs() < f32::EPSILON);
        assert!(result.probabilities.clean < 0.05);
    }

    #[test]
    fn test_named_category_shape() {
        let result =
            normalize_raw(&json!({"prediction_text": "offensive", "confidence": 0.6})).unwrap();
        assert_eq!(result.category, Category::Offensive);

        let result = normalize_raw(&json!({"category": "clean", "confidence": 0.99})).unwrap();
        assert_eq!(result.category, Category::Clean);
    }

    #[test]
    fn test_scores_only_shape() {
        let result = normalize_raw(&json!({
            "probabilities": {"clean": 0.1, "offensive": 0.2, "hate": 0.65, "spam": 0.05}
        }))
        .unwrap();
        assert_eq!(result.category, Category::Hate);
        assert!((result.confidence - 0.65).abs() < f32::EPSILON);
    }

    #[test]
    fn test_all_shapes_stay_in_enum() {
        let shapes = [
            json!({"prediction": 1, "confidence": 0.5}),
            json!({"prediction_text": "spam", "confidence": 0.5}),
            json!({"probabilities": {"clean": 0.9, "hate": 0.1}}),
        ];
        for raw in &shapes {
            let result = normalize_raw(raw).unwrap();
            assert!(Category::INDEX_TABLE.contains(&result.category));
        }
    }

    #[test]
    fn test_confidence_clamped() {
        let result = normalize_raw(&json!({"prediction": 0, "confidence": 1.7})).unwrap();
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_derived_from_probabilities() {
        let result = normalize_raw(&json!({
            "category": "spam",
            "probabilities": {"clean": 0.2, "spam": 0.8}
        }))
        .unwrap();
        assert!((result.confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_out_of_table_index_is_unknown() {
        let result = normalize_raw(&json!({"prediction": 9, "confidence": 0.4})).unwrap();
        assert_eq!(result.category, Category::Unknown);
    }

    #[test]
    fn test_keywords_preserve_order() {
        let result = normalize_raw(&json!({
            "prediction": 2,
            "confidence": 0.9,
            "keywords": ["ngu", "đồ"]
        }))
        .unwrap();
        assert_eq!(result.keywords, vec!["ngu", "đồ"]);
    }

    #[test]
    fn test_unsupported_shapes_rejected() {
        assert!(normalize_raw(&json!([1, 2, 3])).is_err());
        assert!(normalize_raw(&json!({"score": 0.4})).is_err());
        assert!(normalize_raw(&json!({"prediction": "two", "confidence": 0.4})).is_err());
        assert!(normalize_raw(&json!({"category": "hate"})).is_err());
    }
}
