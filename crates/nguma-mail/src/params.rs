use serde_json::{Map, Value};

/// Loose key/value parameters supplied by the caller of a template.
///
/// Callers send whatever JSON the producing system had at hand, so amounts
/// may arrive as numbers or numeric strings and ids as numbers or strings.
#[derive(Debug, Clone, Default)]
pub struct EmailParams(Map<String, Value>);

impl EmailParams {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// A field counts as present unless it is absent or `null`.
    pub fn is_present(&self, key: &str) -> bool {
        !matches!(self.0.get(key), None | Some(Value::Null))
    }

    /// String view of a scalar field. Numbers and booleans are stringified.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like `str`, but empty strings fall back to `default`.
    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.str(key)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// Empty string when the field is missing. Used for interpolation into
    /// subjects and plain-text bodies.
    pub fn text(&self, key: &str) -> String {
        self.str(key).unwrap_or_default()
    }

    pub fn amount(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for EmailParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
