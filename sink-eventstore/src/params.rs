//! Raw parameter handling
//!
//! Callers hand the connector a loosely typed mapping of named parameters
//! (from TOML, JSON, or built in code). This module canonicalizes parameter
//! names and turns individual loose values into strict Rust types:
//! - boolean-like flags (`true`, `"TRUE"`, `"false"`, ...)
//! - strictly positive integers
//! - key-column lists (list or comma-separated string)

use crate::error::{ConfigError, ConfigErrorReason, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// A parameter accepted by a builder, with the alternative spellings it may be given under
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl ParamSpec {
    pub const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }

    fn matches(&self, key: &str) -> bool {
        self.name == key || self.aliases.contains(&key)
    }
}

/// Find the spec of a canonical parameter name
pub fn find_spec<'a>(specs: &'a [ParamSpec], name: &str) -> Option<&'a ParamSpec> {
    specs.iter().find(|s| s.name == name)
}

/// Loosely typed mapping of named parameters as supplied by the caller
///
/// `null` values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawParams(Map<String, Value>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under the same key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Value of a parameter under any of its names
    pub fn lookup(&self, spec: &ParamSpec) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, v)| spec.matches(k) && !v.is_null())
            .map(|(_, v)| v)
    }

    pub fn lookup_mut(&mut self, spec: &ParamSpec) -> Option<&mut Value> {
        self.0
            .iter_mut()
            .find(|(k, v)| spec.matches(k) && !v.is_null())
            .map(|(_, v)| v)
    }

    /// Set a parameter under its canonical name, dropping any alias spellings
    pub fn replace(&mut self, spec: &ParamSpec, value: impl Into<Value>) {
        self.0.retain(|k, _| !spec.matches(k));
        self.0.insert(spec.name.to_string(), value.into());
    }

    /// Map every key onto its canonical name, rejecting unknown and repeated parameters
    pub fn canonicalize(&self, specs: &[ParamSpec]) -> ConnectorResult<CanonicalParams> {
        let mut values = BTreeMap::new();

        for (key, value) in &self.0 {
            let spec = specs.iter().find(|s| s.matches(key)).ok_or_else(|| {
                ConfigError::new(
                    ConfigErrorReason::UnknownParameter,
                    format!("'{}' is not a recognized parameter", key),
                )
            })?;

            if value.is_null() {
                continue;
            }

            if values.insert(spec.name, value.clone()).is_some() {
                return Err(ConfigError::new(
                    ConfigErrorReason::DuplicateParameter,
                    format!("'{}' was supplied more than once", spec.name),
                ));
            }
        }

        Ok(CanonicalParams { values })
    }
}

impl From<Map<String, Value>> for RawParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Parameters keyed by canonical name, with `null` entries removed
#[derive(Debug, Clone, Default)]
pub struct CanonicalParams {
    values: BTreeMap<&'static str, Value>,
}

impl CanonicalParams {
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn string(&self, name: &str) -> ConnectorResult<Option<String>> {
        self.value(name).map(|v| parse_string(name, v)).transpose()
    }

    /// String parameter that is trimmed and treated as absent when blank
    pub fn non_blank(&self, name: &str) -> ConnectorResult<Option<String>> {
        Ok(self
            .string(name)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    pub fn flag(&self, name: &str) -> ConnectorResult<Option<bool>> {
        self.value(name).map(|v| parse_flag(name, v)).transpose()
    }

    pub fn positive(&self, name: &str) -> ConnectorResult<Option<u64>> {
        self.value(name).map(|v| parse_positive(name, v)).transpose()
    }

    pub fn key_columns(&self, name: &str) -> ConnectorResult<Option<Vec<String>>> {
        self.value(name)
            .map(|v| parse_key_columns(name, v))
            .transpose()
    }
}

/// Parse a string parameter
pub fn parse_string(name: &str, value: &Value) -> ConnectorResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::invalid_type(name, "a string"))
}

/// Parse a boolean-like flag
///
/// Accepts native booleans and the strings "true"/"false" in any letter case.
pub fn parse_flag(name: &str, value: &Value) -> ConnectorResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(ConfigError::invalid_flag(format!(
                    "'{}' must be true or false, got \"{}\"",
                    name, s
                )))
            }
        }
        other => Err(ConfigError::invalid_flag(format!(
            "'{}' must be true or false, got {}",
            name, other
        ))),
    }
}

// Largest float that still represents every integer below it exactly
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Parse a strictly positive integer
///
/// Accepts integers, integral floats (`100.0`) and integer strings (`"100"`).
pub fn parse_positive(name: &str, value: &Value) -> ConnectorResult<u64> {
    let invalid = || {
        ConfigError::invalid_number(format!(
            "'{}' must be a positive integer, got {}",
            name, value
        ))
    };

    let n = match value {
        Value::Number(n) => {
            if let Some(n) = n.as_u64() {
                n
            } else if n.is_i64() {
                return Err(invalid());
            } else {
                let f = n.as_f64().ok_or_else(invalid)?;
                if !f.is_finite() || f.fract() != 0.0 || f < 1.0 || f > MAX_EXACT_FLOAT {
                    return Err(invalid());
                }
                f as u64
            }
        }
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if n == 0 {
        return Err(invalid());
    }

    Ok(n)
}

/// Parse an ordered list of distinct column names
///
/// Accepts a list of strings or a single comma-separated string. Column names
/// are compared case-insensitively when checking for duplicates.
pub fn parse_key_columns(name: &str, value: &Value) -> ConnectorResult<Vec<String>> {
    let columns: Vec<String> = match value {
        Value::String(s) => s.split(',').map(|c| c.trim().to_string()).collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(|c| c.trim().to_string()).ok_or_else(|| {
                    ConfigError::invalid_keys(format!(
                        "'{}' must contain only column names, got {}",
                        name, item
                    ))
                })
            })
            .collect::<ConnectorResult<_>>()?,
        other => {
            return Err(ConfigError::invalid_keys(format!(
                "'{}' must be a column name or a list of column names, got {}",
                name, other
            )))
        }
    };

    if columns.is_empty() {
        return Err(ConfigError::invalid_keys(format!(
            "'{}' must name at least one column",
            name
        )));
    }

    let mut seen = HashSet::new();
    for column in &columns {
        if column.is_empty() {
            return Err(ConfigError::invalid_keys(format!(
                "'{}' contains a blank column name",
                name
            )));
        }
        if !seen.insert(column.to_ascii_lowercase()) {
            return Err(ConfigError::invalid_keys(format!(
                "'{}' lists column '{}' more than once",
                name, column
            )));
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const SPECS: &[ParamSpec] = &[
        ParamSpec::new("batch_size", &["batchSize"]),
        ParamSpec::new("table", &[]),
    ];

    #[test]
    fn test_flag_literals() {
        for v in [json!(true), json!("true"), json!("TRUE"), json!(" True ")] {
            assert!(parse_flag("plugin_flag", &v).unwrap());
        }
        for v in [json!(false), json!("false"), json!("FALSE")] {
            assert!(!parse_flag("plugin_flag", &v).unwrap());
        }
    }

    #[test]
    fn test_flag_rejects_other_values() {
        for v in [json!("1"), json!("0"), json!("yes"), json!(1), json!(""), json!([true])] {
            let err = parse_flag("ssl_connection", &v).unwrap_err();
            assert_eq!(err.reason(), ConfigErrorReason::InvalidBooleanFlag);
        }
    }

    #[test]
    fn test_positive_coercions() {
        assert_eq!(parse_positive("batch_size", &json!(100)).unwrap(), 100);
        assert_eq!(parse_positive("batch_size", &json!(100.0)).unwrap(), 100);
        assert_eq!(parse_positive("batch_size", &json!(" 42 ")).unwrap(), 42);
    }

    #[test]
    fn test_positive_rejections() {
        for v in [
            json!(0),
            json!(-5),
            json!(2.5),
            json!("-1"),
            json!("ten"),
            json!(true),
            json!(null),
        ] {
            let err = parse_positive("batch_size", &v).unwrap_err();
            assert_eq!(err.reason(), ConfigErrorReason::InvalidNumericParameter);
        }
    }

    #[test]
    fn test_key_columns_from_string_and_list() {
        assert_eq!(
            parse_key_columns("primary_key", &json!("id, ts")).unwrap(),
            vec!["id", "ts"]
        );
        assert_eq!(
            parse_key_columns("primary_key", &json!(["id"])).unwrap(),
            vec!["id"]
        );
    }

    #[test]
    fn test_key_columns_rejections() {
        for v in [
            json!([]),
            json!(""),
            json!("id,,ts"),
            json!(["id", "ID"]),
            json!([1]),
            json!(3),
        ] {
            let err = parse_key_columns("partitioning_key", &v).unwrap_err();
            assert_eq!(err.reason(), ConfigErrorReason::InvalidKeyColumns);
        }
    }

    #[test]
    fn test_canonicalize_aliases_and_nulls() {
        let raw = RawParams::new()
            .with("batchSize", 10)
            .with("table", Value::Null);
        let params = raw.canonicalize(SPECS).unwrap();
        assert_eq!(params.positive("batch_size").unwrap(), Some(10));
        assert!(params.value("table").is_none());
    }

    #[test]
    fn test_replace_drops_alias_spellings() {
        let spec = &SPECS[0];
        let mut raw = RawParams::new().with("batchSize", 10);
        if let Some(value) = raw.lookup_mut(spec) {
            *value = json!(20);
        }
        assert_eq!(raw.lookup(spec), Some(&json!(20)));

        raw.replace(spec, 30);
        assert_eq!(raw, RawParams::new().with("batch_size", 30));
    }

    #[test]
    fn test_canonicalize_rejects_unknown_and_duplicates() {
        let err = RawParams::new()
            .with("bogus", 1)
            .canonicalize(SPECS)
            .unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::UnknownParameter);

        let err = RawParams::new()
            .with("batch_size", 1)
            .with("batchSize", 2)
            .canonicalize(SPECS)
            .unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::DuplicateParameter);
    }

    proptest! {
        #[test]
        fn prop_positive_integers_pass_through(n in 1u64..=u64::MAX) {
            prop_assert_eq!(parse_positive("batch_size", &json!(n)).unwrap(), n);
            prop_assert_eq!(parse_positive("batch_size", &json!(n.to_string())).unwrap(), n);
        }

        #[test]
        fn prop_non_positive_integers_rejected(n in i64::MIN..=0i64) {
            let err = parse_positive("max_num_active_batches", &json!(n)).unwrap_err();
            prop_assert_eq!(err.reason(), ConfigErrorReason::InvalidNumericParameter);
        }

        #[test]
        fn prop_flag_strings_other_than_true_false_rejected(s in "[a-zA-Z0-9 ]{0,8}") {
            let t = s.trim();
            prop_assume!(!t.eq_ignore_ascii_case("true") && !t.eq_ignore_ascii_case("false"));
            let err = parse_flag("plugin_flag", &json!(s)).unwrap_err();
            prop_assert_eq!(err.reason(), ConfigErrorReason::InvalidBooleanFlag);
        }
    }
}
