//! Serializer for converting script values to serde_json::Value
//!
//! - Nil -> null
//! - Number -> number (integral values as integers)
//! - String -> string
//! - Array -> array
//! - Table with string keys -> object
//! - Functions, coroutines and host objects -> error

use std::collections::HashSet;

use serde_json::{Map, Number, Value as JsonValue};

use crate::sable_value::Value;

pub fn to_value(value: &Value) -> Result<JsonValue, String> {
    let mut visited = HashSet::new();
    to_value_internal(value, &mut visited)
}

pub fn to_string(value: &Value, pretty: bool) -> Result<String, String> {
    let json_value = to_value(value)?;

    if pretty {
        serde_json::to_string_pretty(&json_value)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e))
    } else {
        serde_json::to_string(&json_value).map_err(|e| format!("Failed to serialize to JSON: {}", e))
    }
}

fn number_to_json(n: f64) -> Result<JsonValue, String> {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
        Ok(JsonValue::Number(Number::from(n as i64)))
    } else {
        Number::from_f64(n)
            .map(JsonValue::Number)
            .ok_or_else(|| format!("Invalid number: {}", n))
    }
}

fn to_value_internal(value: &Value, visited: &mut HashSet<usize>) -> Result<JsonValue, String> {
    match value {
        Value::Nil => Ok(JsonValue::Null),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Ok(JsonValue::String(s.to_string())),
        Value::Array(items) => {
            let ptr = std::sync::Arc::as_ptr(items) as usize;
            if !visited.insert(ptr) {
                return Err("Circular reference detected in array".to_string());
            }
            let items = items.read().clone();
            let result = items
                .iter()
                .map(|item| to_value_internal(item, visited))
                .collect::<Result<Vec<_>, _>>()?;
            visited.remove(&ptr);
            Ok(JsonValue::Array(result))
        }
        Value::Table(table) => {
            let ptr = std::sync::Arc::as_ptr(table) as usize;
            if !visited.insert(ptr) {
                return Err("Circular reference detected in table".to_string());
            }
            let entries: Vec<(Value, Value)> = table
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut map = Map::new();
            for (key, item) in &entries {
                let Some(key) = key.as_str() else {
                    return Err(format!(
                        "Cannot serialize table key of type {} to JSON",
                        key.type_name()
                    ));
                };
                map.insert(key.to_string(), to_value_internal(item, visited)?);
            }
            visited.remove(&ptr);
            Ok(JsonValue::Object(map))
        }
        other => Err(format!("Cannot serialize {} to JSON", other.type_name())),
    }
}
