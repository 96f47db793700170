//! Option maps and permissive value coercion.
//!
//! Configuration arrives untyped. Readers never fail on a wrong type: a value
//! is coerced to the requested type the way loosely typed configuration is
//! usually read (`"30"` is `30`, `"0"` is `false`, `1` is `"1"`), and an
//! absent or `null` entry falls back to the default.

use serde_json::{Map, Value};

/// Untyped options of one adapter.
pub type Options = Map<String, Value>;

/// Whether a value counts as empty: `null`, `false`, `0`, `0.0`, `""`, `"0"`,
/// or an empty list or map.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f == 0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Coerce a value to a string.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => "Array".to_string(),
    }
}

/// Coerce a value to an integer.
///
/// Strings contribute their leading number, floats are truncated.
pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i,
            (None, Some(_), _) => i64::MAX,
            (None, None, Some(f)) => f as i64,
            _ => 0,
        },
        Value::String(s) => leading_int(s),
        Value::Array(a) => i64::from(!a.is_empty()),
        Value::Object(o) => i64::from(!o.is_empty()),
    }
}

/// Coerce a value to a boolean.
pub fn to_bool(value: &Value) -> bool {
    !is_empty(value)
}

/// Coerce a value to a map. Lists are keyed by index, scalars become `{"0": value}`.
pub fn to_map(value: &Value) -> Options {
    match value {
        Value::Null => Options::new(),
        Value::Object(o) => o.clone(),
        Value::Array(a) => a
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        scalar => {
            let mut map = Options::new();
            map.insert("0".to_string(), scalar.clone());
            map
        }
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = s.as_bytes();
    let len = bytes.len();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end - int_start;

    let mut is_float = false;
    let mut frac_digits = 0;
    if end < len && bytes[end] == b'.' {
        let mut cursor = end + 1;
        while cursor < len && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        frac_digits = cursor - end - 1;
        if int_digits + frac_digits > 0 {
            is_float = true;
            end = cursor;
        }
    }

    if int_digits + frac_digits == 0 {
        return 0;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < len && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exp_start = cursor;
        while cursor < len && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exp_start {
            is_float = true;
            end = cursor;
        }
    }

    let number = &s[..end];
    if is_float {
        return number.parse::<f64>().map(|f| f as i64).unwrap_or(0);
    }

    number.parse::<i64>().unwrap_or(if number.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Typed readers over [`Options`].
pub trait OptionsExt {
    /// The value under `key`, treating `null` as absent.
    fn value(&self, key: &str) -> Option<&Value>;

    /// The value under `key` unless it [is empty](is_empty).
    fn non_empty(&self, key: &str) -> Option<&Value> {
        self.value(key).filter(|v| !is_empty(v))
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.value(key)
            .map(to_string)
            .unwrap_or_else(|| default.to_string())
    }

    fn int_or(&self, key: &str, default: i64) -> i64 {
        self.value(key).map(to_int).unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.value(key).map(to_bool).unwrap_or(default)
    }

    fn map_or_empty(&self, key: &str) -> Options {
        self.value(key).map(to_map).unwrap_or_default()
    }

    /// A lifetime in seconds; negative values count as `0`.
    fn lifetime_or_zero(&self, key: &str) -> u64 {
        u64::try_from(self.int_or(key, 0)).unwrap_or(0)
    }
}

impl OptionsExt for Options {
    fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("options must be an object"),
        }
    }

    #[test]
    fn test_absent_and_null_use_defaults() {
        let opts = options(json!({"a": null}));
        assert_eq!(opts.string_or("a", "x"), "x");
        assert_eq!(opts.int_or("missing", 30), 30);
        assert!(opts.bool_or("a", true));
        assert!(opts.map_or_empty("a").is_empty());
    }

    #[test]
    fn test_int_coercion() {
        let opts = options(json!({
            "int": 42,
            "str": "42",
            "padded": "  7 seconds",
            "float": 2.9,
            "float_str": "2.9",
            "exp": "1e3",
            "neg": "-5",
            "garbage": "abc",
            "true": true,
            "list": [1],
            "huge": "99999999999999999999",
        }));

        assert_eq!(opts.int_or("int", 0), 42);
        assert_eq!(opts.int_or("str", 0), 42);
        assert_eq!(opts.int_or("padded", 0), 7);
        assert_eq!(opts.int_or("float", 0), 2);
        assert_eq!(opts.int_or("float_str", 0), 2);
        assert_eq!(opts.int_or("exp", 0), 1000);
        assert_eq!(opts.int_or("neg", 0), -5);
        assert_eq!(opts.int_or("garbage", 9), 0);
        assert_eq!(opts.int_or("true", 0), 1);
        assert_eq!(opts.int_or("list", 0), 1);
        assert_eq!(opts.int_or("huge", 0), i64::MAX);
    }

    #[test]
    fn test_bool_coercion() {
        let opts = options(json!({
            "zero_str": "0",
            "empty": "",
            "zero": 0,
            "one_str": "1",
            "false_str": "false",
            "empty_list": [],
        }));

        assert!(!opts.bool_or("zero_str", true));
        assert!(!opts.bool_or("empty", true));
        assert!(!opts.bool_or("zero", true));
        assert!(opts.bool_or("one_str", false));
        // Any other non-empty string is true.
        assert!(opts.bool_or("false_str", false));
        assert!(!opts.bool_or("empty_list", true));
    }

    #[test]
    fn test_string_coercion() {
        let opts = options(json!({"n": 5, "f": 1.0, "half": 0.5, "t": true, "f2": false}));
        assert_eq!(opts.string_or("n", ""), "5");
        assert_eq!(opts.string_or("f", ""), "1");
        assert_eq!(opts.string_or("half", ""), "0.5");
        assert_eq!(opts.string_or("t", ""), "1");
        assert_eq!(opts.string_or("f2", "x"), "");
    }

    #[test]
    fn test_loose_and_strict_inputs_agree() {
        let strict = options(json!({"timeout": 30, "lazy": true, "prefix_key": "p"}));
        let loose = options(json!({"timeout": "30", "lazy": "1", "prefix_key": "p"}));

        for opts in [&strict, &loose] {
            assert_eq!(opts.int_or("timeout", 0), 30);
            assert!(opts.bool_or("lazy", false));
            assert_eq!(opts.string_or("prefix_key", ""), "p");
        }
    }

    #[test]
    fn test_map_coercion() {
        let opts = options(json!({"list": ["a", "b"], "scalar": 3, "map": {"k": "v"}}));
        assert_eq!(opts.map_or_empty("list")["1"], json!("b"));
        assert_eq!(opts.map_or_empty("scalar")["0"], json!(3));
        assert_eq!(opts.map_or_empty("map")["k"], json!("v"));
    }

    #[test]
    fn test_empty_semantics() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!("0"), json!([]), json!({})] {
            assert!(is_empty(&v), "{} should be empty", v);
        }
        for v in [json!(true), json!(1), json!(" "), json!("00"), json!([0]), json!({"a": 1})] {
            assert!(!is_empty(&v), "{} should not be empty", v);
        }
    }
}
