use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A request parameter that failed to parse or validate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Parsed query of `GET /api/v1/dishes`
///
/// Built from raw key/value pairs so that multi-value parameters can be
/// given as repeated keys, `name[]` keys, comma-separated values or a JSON
/// array. A single value always becomes a one-element list.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct DiscoveryQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Miles
    #[validate(range(min = 1, max = 31))]
    pub restaurant_distance: Option<u32>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub restaurant_price: Option<f64>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub restaurant_rating: Option<f64>,
    pub sort_by_rating: Option<bool>,
    pub sort_by_distance: Option<bool>,
    pub cuisine_ids: Vec<Uuid>,
    pub food_ids: Vec<Uuid>,
}

impl DiscoveryQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, FieldError> {
        let query = Self {
            latitude: required_f64(pairs, "latitude")?,
            longitude: required_f64(pairs, "longitude")?,
            restaurant_distance: optional_parse(pairs, "restaurant_distance")?,
            restaurant_price: optional_parse(pairs, "restaurant_price")?,
            restaurant_rating: optional_parse(pairs, "restaurant_rating")?,
            sort_by_rating: optional_flag(pairs, "sort_by_rating")?,
            sort_by_distance: optional_flag(pairs, "sort_by_distance")?,
            cuisine_ids: uuid_list(pairs, "cuisineArray")?,
            food_ids: uuid_list(pairs, "foodArray")?,
        };

        if let Err(errors) = query.validate() {
            let field = errors
                .field_errors()
                .keys()
                .next()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "query".to_string());
            return Err(FieldError::new(field, errors.to_string()));
        }

        Ok(query)
    }
}

/// Last non-empty value of a single-valued parameter
fn single<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, v)| k == name && !v.trim().is_empty())
        .map(|(_, v)| v.trim())
}

fn required_f64(pairs: &[(String, String)], name: &str) -> Result<f64, FieldError> {
    let raw = single(pairs, name).ok_or_else(|| FieldError::new(name, "parameter is required"))?;
    parse_finite(raw, name)
}

fn parse_finite(raw: &str, name: &str) -> Result<f64, FieldError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FieldError::new(name, format!("'{}' is not a number", raw))),
    }
}

fn optional_parse<T: std::str::FromStr>(
    pairs: &[(String, String)],
    name: &str,
) -> Result<Option<T>, FieldError> {
    single(pairs, name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| FieldError::new(name, format!("'{}' is not a valid value", raw)))
        })
        .transpose()
}

fn optional_flag(pairs: &[(String, String)], name: &str) -> Result<Option<bool>, FieldError> {
    single(pairs, name)
        .map(|raw| match raw.to_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(FieldError::new(name, format!("'{}' is not a boolean flag", raw))),
        })
        .transpose()
}

/// Collect every value of a multi-value parameter
fn multi(pairs: &[(String, String)], name: &str) -> Result<Vec<String>, FieldError> {
    let bracketed = format!("{}[]", name);
    let mut values = Vec::new();

    for (_, raw) in pairs.iter().filter(|(k, _)| k == name || *k == bracketed) {
        let raw = raw.trim();
        if raw.starts_with('[') {
            let parsed: Vec<String> = serde_json::from_str(raw)
                .map_err(|e| FieldError::new(name, format!("malformed list: {}", e)))?;
            values.extend(parsed);
        } else {
            values.extend(raw.split(',').map(|s| s.trim().to_string()));
        }
    }

    values.retain(|v| !v.is_empty());
    Ok(values)
}

fn uuid_list(pairs: &[(String, String)], name: &str) -> Result<Vec<Uuid>, FieldError> {
    let mut ids = Vec::new();
    for raw in multi(pairs, name)? {
        let id = Uuid::parse_str(&raw)
            .map_err(|_| FieldError::new(name, format!("'{}' is not a valid id", raw)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Request to record a gesture on a dish
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordGestureRequest {
    pub restaurant_dish_id: Uuid,
    #[validate(length(min = 1))]
    pub gesture_type: String,
}
