//! Ordered request arguments and their wire encodings.
//!
//! Values that are empty, zero or `false` are dropped on insertion so an
//! unset option never overwrites remote state. The flip side is that a
//! legitimate `0` or `false` cannot be sent either.

use url::form_urlencoded;

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl ArgValue {
    fn is_unset(&self) -> bool {
        match self {
            ArgValue::Text(s) => s.is_empty(),
            ArgValue::Int(n) => *n == 0,
            ArgValue::Bool(b) => !b,
        }
    }

    fn encode(&self) -> String {
        match self {
            ArgValue::Text(s) => s.clone(),
            ArgValue::Int(n) => n.to_string(),
            ArgValue::Bool(true) => "1".to_string(),
            ArgValue::Bool(false) => "0".to_string(),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Text(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Text(v)
    }
}

impl From<&String> for ArgValue {
    fn from(v: &String) -> Self {
        ArgValue::Text(v.clone())
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

/// Ordered name/value pairs attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    pairs: Vec<(String, ArgValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name = value` unless the value is empty, zero or `false`.
    /// A later insert with the same name replaces the earlier value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> &mut Self {
        let value = value.into();
        if value.is_unset() {
            return self;
        }
        let name = name.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((name, value)),
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `application/x-www-form-urlencoded` form, used for both the query
    /// string and request bodies.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.pairs {
            serializer.append_pair(name, &value.encode());
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Arguments
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Arguments::new();
        for (k, v) in iter {
            args.set(k, v);
        }
        args
    }
}
