use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AttributeError;

pub const YEAR_OF_MAKING: &str = "YearOfMaking";
pub const PRICE: &str = "Price";
pub const HORSEPOWER: &str = "Horsepower";
pub const MAKE: &str = "Make";
pub const MODEL: &str = "Model";
pub const TRIM: &str = "Trim";

/// Fields a content-based query must carry, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 4] = [YEAR_OF_MAKING, MAKE, MODEL, TRIM];

/// One row of the inventory snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub year_of_making: i32,
    pub price: Option<f64>,
    pub horsepower: Option<f64>,
    pub make: String,
    pub model: String,
    pub trim: String,
}

impl InventoryRecord {
    pub fn item_id(&self) -> String {
        derive_item_id(self.year_of_making, &self.make, &self.model, &self.trim)
    }
}

/// Raw attributes of a vehicle that may not exist in the trained model.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleAttributes {
    pub year_of_making: i32,
    pub make: String,
    pub model: String,
    pub trim: String,
    pub price: Option<f64>,
    pub horsepower: Option<f64>,
}

impl VehicleAttributes {
    /// Validates a loosely-typed JSON object against the query schema.
    ///
    /// Every absent required field is reported at once. Type problems are only
    /// reported when nothing is missing. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, AttributeError> {
        let object = value.as_object().ok_or(AttributeError::NotAnObject)?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| is_absent(object, field))
            .map(|field| (*field).to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(AttributeError::MissingFields(missing));
        }

        let mut invalid = Vec::new();
        let year_of_making = read_year(object, &mut invalid);
        let make = read_text(object, MAKE, &mut invalid);
        let model = read_text(object, MODEL, &mut invalid);
        let trim = read_text(object, TRIM, &mut invalid);
        let price = read_optional_number(object, PRICE, &mut invalid);
        let horsepower = read_optional_number(object, HORSEPOWER, &mut invalid);

        if !invalid.is_empty() {
            return Err(AttributeError::InvalidFields(invalid));
        }

        Ok(Self {
            year_of_making: year_of_making.unwrap_or_default(),
            make: make.unwrap_or_default(),
            model: model.unwrap_or_default(),
            trim: trim.unwrap_or_default(),
            price,
            horsepower,
        })
    }

    pub fn item_id(&self) -> String {
        derive_item_id(self.year_of_making, &self.make, &self.model, &self.trim)
    }
}

/// Public key for content-based results:
/// `{year}_{make}_{model}_{trim}`, lowercased, with spaces in model and trim
/// replaced by underscores.
pub fn derive_item_id(year_of_making: i32, make: &str, model: &str, trim: &str) -> String {
    format!(
        "{year_of_making}_{}_{}_{}",
        make.trim().to_lowercase(),
        underscored(model),
        underscored(trim)
    )
}

fn underscored(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "_")
}

fn is_absent(object: &Map<String, Value>, field: &str) -> bool {
    match object.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

fn read_year(object: &Map<String, Value>, invalid: &mut Vec<String>) -> Option<i32> {
    let parsed = match object.get(YEAR_OF_MAKING) {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|value| value.fract() == 0.0).map(|v| v as i64))
            .and_then(|value| i32::try_from(value).ok()),
        Some(Value::String(text)) => text.trim().parse::<i32>().ok(),
        _ => None,
    };

    if parsed.is_none() {
        invalid.push(YEAR_OF_MAKING.to_owned());
    }
    parsed
}

fn read_text(object: &Map<String, Value>, field: &str, invalid: &mut Vec<String>) -> Option<String> {
    match object.get(field) {
        Some(Value::String(text)) => Some(text.trim().to_owned()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => {
            invalid.push(field.to_owned());
            None
        }
    }
}

fn read_optional_number(
    object: &Map<String, Value>,
    field: &str,
    invalid: &mut Vec<String>,
) -> Option<f64> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                invalid.push(field.to_owned());
                None
            }
        },
        Some(_) => {
            invalid.push(field.to_owned());
            None
        }
    }
}
