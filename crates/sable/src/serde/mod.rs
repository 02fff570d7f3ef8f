//! Serde support for script values
//!
//! Conversion between `Value` and `serde_json::Value`, for hosts that feed
//! JSON data into scripts or read results back out.

mod deserializer;
mod serializer;

pub use deserializer::{from_str as json_string_to_value, from_value as json_to_value};
pub use serializer::{to_string as value_to_json_string, to_value as value_to_json};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sable_value::{SableTable, Value};

    #[test]
    fn test_json_object_becomes_table() {
        let value = json_string_to_value(r#"{"name": "sable", "tags": [1, 2.5, true, null]}"#)
            .unwrap();
        let table = value.as_table().unwrap().read();
        assert_eq!(table.get_str("name").unwrap().as_str(), Some("sable"));
        let tags = table.get_str("tags").unwrap().as_array().unwrap().read();
        assert_eq!(tags.len(), 4);
        assert_eq!(tags[1].as_number(), Some(2.5));
        assert_eq!(tags[2].as_number(), Some(1.0));
        assert!(tags[3].is_nil());
    }

    #[test]
    fn test_integral_numbers_serialize_as_integers() {
        let value = Value::new_array(vec![Value::number(3.0), Value::number(0.5)]);
        assert_eq!(value_to_json_string(&value, false).unwrap(), "[3,0.5]");
    }

    #[test]
    fn test_table_with_non_string_key_is_rejected() {
        let mut table = SableTable::new();
        table.set(Value::number(1.0), Value::string("one"));
        assert!(value_to_json(&Value::new_table(table)).is_err());
    }

    #[test]
    fn test_self_referencing_array_is_rejected() {
        let array = Value::new_array(Vec::new());
        array
            .as_array()
            .unwrap()
            .write()
            .push(array.clone());
        let err = value_to_json(&array).unwrap_err();
        assert!(err.contains("Circular"));
    }
}
