//! Row schema descriptions
//!
//! A row schema is an ordered list of `(name, type)` pairs describing the tuples
//! flowing into the sink. Schemas are written in SPL tuple notation,
//! e.g. `tuple<int32 id, rstring name>`, or as a list of `{ name, type }` tables.
//! Field types are kept as normalized opaque strings; only `boolean` is
//! interpreted, for the insert-indicator column of a result schema.

use crate::error::{ConfigError, ConfigErrorReason, ConnectorResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// SPL type name of the insert-indicator column
pub const BOOLEAN_TYPE: &str = "boolean";

/// A single named, typed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: normalize_type(&field_type.into()),
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.field_type == BOOLEAN_TYPE
    }
}

/// Ordered tuple schema with distinct field names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSchema {
    fields: Vec<SchemaField>,
}

impl RowSchema {
    pub fn new(fields: Vec<SchemaField>) -> ConnectorResult<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() || field.field_type.is_empty() {
                return Err(invalid_schema("field name and type cannot be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid_schema(format!(
                    "field '{}' is declared more than once",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a schema from a loose parameter value (SPL string or list of fields)
    pub fn from_value(value: &Value) -> ConnectorResult<Self> {
        let repr: SchemaRepr = serde_json::from_value(value.clone()).map_err(|e| {
            invalid_schema(format!(
                "expected an SPL tuple string or a list of fields: {}",
                e
            ))
        })?;
        repr.into_schema()
    }

    /// Check that `self` is a valid result schema for rows shaped like `input`
    ///
    /// The result schema must carry every input field with the same type and
    /// exactly one additional field, of type `boolean`. Returns the name of
    /// that indicator field.
    pub fn insert_indicator(&self, input: &RowSchema) -> ConnectorResult<String> {
        for field in &input.fields {
            match self.field(&field.name) {
                None => {
                    return Err(ConfigError::schema_mismatch(format!(
                        "result schema is missing input field '{}'",
                        field.name
                    )))
                }
                Some(found) if found.field_type != field.field_type => {
                    return Err(ConfigError::schema_mismatch(format!(
                        "field '{}' is {} in the result schema but {} in the input schema",
                        field.name, found.field_type, field.field_type
                    )))
                }
                Some(_) => {}
            }
        }

        let extra: Vec<&SchemaField> = self
            .fields
            .iter()
            .filter(|f| input.field(&f.name).is_none())
            .collect();

        match extra.as_slice() {
            [indicator] if indicator.is_boolean() => Ok(indicator.name.clone()),
            [other] => Err(ConfigError::schema_mismatch(format!(
                "indicator field '{}' must be boolean, got {}",
                other.name, other.field_type
            ))),
            fields => Err(ConfigError::schema_mismatch(format!(
                "result schema must add exactly one boolean field to the input schema, \
                 found {} extra",
                fields.len()
            ))),
        }
    }
}

impl FromStr for RowSchema {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let body = s
            .strip_prefix("tuple")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('<'))
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| invalid_schema(format!("'{}' is not of the form tuple<...>", s)))?;

        let fields = split_top_level(body)?
            .into_iter()
            .map(parse_field)
            .collect::<ConnectorResult<Vec<_>>>()?;

        Self::new(fields)
    }
}

impl fmt::Display for RowSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tuple<")?;
        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", field.field_type, field.name)?;
        }
        write!(f, ">")
    }
}

impl Serialize for RowSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RowSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SchemaRepr::deserialize(deserializer)?
            .into_schema()
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaRepr {
    Spl(String),
    Fields(Vec<SchemaField>),
}

impl SchemaRepr {
    fn into_schema(self) -> ConnectorResult<RowSchema> {
        match self {
            SchemaRepr::Spl(s) => s.parse(),
            SchemaRepr::Fields(fields) => RowSchema::new(
                fields
                    .into_iter()
                    .map(|f| SchemaField::new(f.name, f.field_type))
                    .collect(),
            ),
        }
    }
}

/// Split on commas that are not nested inside `<...>` or `[...]`
fn split_top_level(body: &str) -> ConnectorResult<Vec<&str>> {
    let mut items = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (idx, ch) in body.char_indices() {
        match ch {
            '<' | '[' => depth += 1,
            '>' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid_schema("unbalanced brackets in tuple schema"));
                }
            }
            ',' if depth == 0 => {
                items.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(invalid_schema("unbalanced brackets in tuple schema"));
    }

    let last = &body[start..];
    if !items.is_empty() || !last.trim().is_empty() {
        items.push(last);
    }
    Ok(items)
}

fn parse_field(item: &str) -> ConnectorResult<SchemaField> {
    let item = item.trim();
    let (field_type, name) = item
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| invalid_schema(format!("'{}' must be '<type> <name>'", item)))?;

    let name = name.trim();
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(invalid_schema(format!("'{}' is not a valid field name", name)));
    }

    Ok(SchemaField::new(name, field_type))
}

/// Collapse whitespace runs and drop whitespace around `<`, `>`, `,`, `[` and `]`
fn normalize_type(field_type: &str) -> String {
    let collapsed = field_type.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut normalized = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ' '
            && (normalized.ends_with(is_type_delimiter)
                || chars.peek().is_some_and(|next| is_type_delimiter(*next)))
        {
            continue;
        }
        normalized.push(ch);
    }
    normalized
}

fn is_type_delimiter(ch: char) -> bool {
    matches!(ch, '<' | '>' | ',' | '[' | ']')
}

fn invalid_schema(message: impl Into<String>) -> ConfigError {
    ConfigError::new(ConfigErrorReason::InvalidSchema, message)
}
