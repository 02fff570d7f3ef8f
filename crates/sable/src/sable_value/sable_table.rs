// SableTable - unordered map from Value keys to Values
use ahash::AHashMap;

use super::Value;

#[derive(Debug, Clone, Default)]
pub struct SableTable {
    entries: AHashMap<Value, Value>,
}

impl SableTable {
    pub fn new() -> Self {
        SableTable {
            entries: AHashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SableTable {
            entries: AHashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Lookup that yields nil for absent keys.
    #[inline]
    pub fn get_or_nil(&self, key: &Value) -> Value {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Value::string(key))
    }

    #[inline]
    pub fn set(&mut self, key: Value, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter()
    }

    /// Right-biased merge: entries of `other` overwrite ours.
    pub fn merge_from(&mut self, other: &SableTable) {
        self.entries.reserve(other.len());
        for (key, value) in other.iter() {
            self.entries.insert(key.clone(), value.clone());
        }
    }
}

impl FromIterator<(Value, Value)> for SableTable {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        SableTable {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_right_biased() {
        let mut left: SableTable = [
            (Value::string("a"), Value::Number(1.0)),
            (Value::string("b"), Value::Number(2.0)),
        ]
        .into_iter()
        .collect();
        let right: SableTable = [(Value::string("b"), Value::Number(20.0))]
            .into_iter()
            .collect();
        left.merge_from(&right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get_str("b"), Some(&Value::Number(20.0)));
        assert_eq!(left.get_or_nil(&Value::string("zzz")), Value::Nil);
    }
}
