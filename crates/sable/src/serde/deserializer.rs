//! Deserializer for converting serde_json::Value to script values
//!
//! Booleans become the numbers 1 and 0; objects become tables keyed by
//! string.

use serde_json::Value as JsonValue;

use crate::sable_value::{SableTable, Value};

pub fn from_value(json_value: &JsonValue) -> Result<Value, String> {
    match json_value {
        JsonValue::Null => Ok(Value::Nil),
        JsonValue::Bool(b) => Ok(Value::boolean(*b)),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Value::number)
            .ok_or_else(|| format!("Invalid number: {}", n)),
        JsonValue::String(s) => Ok(Value::string(s.as_str())),
        JsonValue::Array(items) => {
            let items = items.iter().map(from_value).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::new_array(items))
        }
        JsonValue::Object(map) => {
            let mut table = SableTable::with_capacity(map.len());
            for (key, item) in map {
                table.set(Value::string(key.as_str()), from_value(item)?);
            }
            Ok(Value::new_table(table))
        }
    }
}

pub fn from_str(json_str: &str) -> Result<Value, String> {
    let json_value: JsonValue =
        serde_json::from_str(json_str).map_err(|e| format!("Failed to parse JSON: {}", e))?;
    from_value(&json_value)
}
