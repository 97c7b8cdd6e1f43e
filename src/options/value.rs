//! Typed option values and their wire encodings.

use crate::errors::EncodingError;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::time::Duration;
use url::form_urlencoded;

/// A value that can be placed in a header, param or query bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean, encoded as `true` / `false`
    Bool(bool),
    /// Integer, encoded in decimal
    Int(i64),
    /// String, encoded verbatim
    Str(String),
    /// Ordered list of strings, one `key=value` pair per element
    List(Vec<String>),
    /// Duration, encoded in canonical form such as `1m30s`
    Duration(Duration),
    /// String map, encoded as a nested form-encoded fragment
    Map(BTreeMap<String, String>),
}

impl Value {
    /// Name of the value shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "string list",
            Value::Duration(_) => "duration",
            Value::Map(_) => "string map",
        }
    }

    /// Single-string form of the value, or `None` for multi-valued lists.
    pub fn as_single(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::List(_) => None,
            Value::Duration(d) => Some(format_duration(*d)),
            Value::Map(map) => {
                let mut nested = form_urlencoded::Serializer::new(String::new());
                nested.extend_pairs(map.iter());
                Some(nested.finish())
            }
        }
    }

    /// Encode the value for the header named `name`.
    pub fn to_header(&self, name: &str) -> Result<String, EncodingError> {
        self.as_single()
            .ok_or_else(|| EncodingError::UnencodableType {
                kind: self.kind(),
                name: name.to_string(),
            })
    }

    /// Append the value under `key` to a form serializer.
    pub(crate) fn append_to<T>(&self, key: &str, form: &mut form_urlencoded::Serializer<'_, T>)
    where
        T: form_urlencoded::Target,
    {
        match self {
            Value::List(items) => {
                for item in items {
                    form.append_pair(key, item);
                }
            }
            other => {
                if let Some(single) = other.as_single() {
                    form.append_pair(key, &single);
                }
            }
        }
    }
}

/// Form-encode a bucket, keys in sorted order.
pub(crate) fn encode_values(values: &BTreeMap<String, Value>) -> String {
    let mut form = form_urlencoded::Serializer::new(String::new());
    for (key, value) in values {
        value.append_to(key, &mut form);
    }
    form.finish()
}

/// Format a duration the way Go's `time.Duration` prints it.
///
/// Sub-second values use the largest fitting unit (`1.5ms`, `10µs`, `7ns`);
/// longer values use `h`, `m` and fractional `s` components (`1h0m2.5s`).
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();

    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000, 6));
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = u128::from(secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    let _ = write!(out, "{}s", decimal(seconds, 1_000_000_000, 9));
    out
}

fn decimal(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = digits);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::List(v.into_iter().map(String::from).collect())
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(v: BTreeMap<String, String>) -> Self {
        Value::Map(v)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(v: HashMap<String, String>) -> Self {
        Value::Map(v.into_iter().collect())
    }
}

/// Conversion of a field into an optional [`Value`].
///
/// `None` means the field is absent and contributes nothing to its bucket.
pub trait ToValue {
    /// Produce the value, or `None` when absent
    fn to_value(&self) -> Option<Value>;
}

macro_rules! impl_to_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Option<Value> {
                    Some(Value::from(self.clone()))
                }
            }
        )*
    };
}

impl_to_value!(
    bool,
    i64,
    i32,
    u32,
    u16,
    String,
    Vec<String>,
    Duration,
    BTreeMap<String, String>,
    HashMap<String, String>,
);

impl ToValue for Value {
    fn to_value(&self) -> Option<Value> {
        Some(self.clone())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Str(self.to_string()))
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Option<Value> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Option<Value> {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(ToValue::to_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Duration::ZERO, "0s" ; "zero")]
    #[test_case(Duration::from_nanos(7), "7ns" ; "nanos")]
    #[test_case(Duration::from_nanos(10_500), "10.5µs" ; "micros")]
    #[test_case(Duration::from_micros(1_500), "1.5ms" ; "millis")]
    #[test_case(Duration::from_millis(250), "250ms" ; "whole millis")]
    #[test_case(Duration::from_millis(1_500), "1.5s" ; "fractional seconds")]
    #[test_case(Duration::from_secs(90), "1m30s" ; "minutes")]
    #[test_case(Duration::from_secs(3600), "1h0m0s" ; "hour")]
    #[test_case(Duration::from_millis(3_602_500), "1h0m2.5s" ; "hour with fraction")]
    fn test_format_duration(d: Duration, expected: &str) {
        assert_eq!(format_duration(d), expected);
    }

    #[test]
    fn test_single_values() {
        assert_eq!(Value::Bool(true).as_single().as_deref(), Some("true"));
        assert_eq!(Value::Int(-42).as_single().as_deref(), Some("-42"));
        assert_eq!(Value::from("a b").as_single().as_deref(), Some("a b"));
        assert_eq!(Value::from(vec!["x"]).as_single(), None);
    }

    #[test]
    fn test_map_nests_sorted_fragment() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), "2 two".to_string());
        map.insert("a".to_string(), "1".to_string());

        assert_eq!(
            Value::from(map).as_single().as_deref(),
            Some("a=1&b=2+two")
        );
    }

    #[test]
    fn test_list_in_header_is_unencodable() {
        let err = Value::from(vec!["a", "b"]).to_header("X-Tags").unwrap_err();
        assert_eq!(
            err,
            EncodingError::UnencodableType {
                kind: "string list",
                name: "X-Tags".to_string()
            }
        );
    }

    #[test]
    fn test_encoded_values_parse_back() {
        let mut values = BTreeMap::new();
        values.insert("flag".to_string(), Value::Bool(false));
        values.insert("count".to_string(), Value::Int(3));
        values.insert("name".to_string(), Value::from("a&b=c d"));
        values.insert("wait".to_string(), Value::from(Duration::from_millis(1_500)));
        values.insert("tags".to_string(), Value::from(vec!["x", "y z"]));

        let encoded = encode_values(&values);
        let parsed: Vec<(String, String)> = form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();

        assert_eq!(
            parsed,
            vec![
                ("count".to_string(), "3".to_string()),
                ("flag".to_string(), "false".to_string()),
                ("name".to_string(), "a&b=c d".to_string()),
                ("tags".to_string(), "x".to_string()),
                ("tags".to_string(), "y z".to_string()),
                ("wait".to_string(), "1.5s".to_string()),
            ]
        );
    }

    #[test]
    fn test_option_absent() {
        let absent: Option<String> = None;
        assert_eq!(absent.to_value(), None);
        assert_eq!(Some(5i32).to_value(), Some(Value::Int(5)));
    }
}
