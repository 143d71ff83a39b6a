use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use super::content::{Content, FieldValue};

/// A document template, describing which fields documents based on it have.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Template {
    pub id: i32,
    /// Category whose documents may use this template.
    pub category: i32,
    pub name: String,
    pub description: String,
    pub schema: Schema,
    pub active: bool,
    /// Version of the form, as printed on the document.
    pub version: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewTemplate {
    pub category: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schema: Schema,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Fields making up a template.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    /// Calendar date in ISO 8601 format (`YYYY-MM-DD`).
    Date,
    List,
    Record,
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Text
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            FieldKind::Text => "text",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "a boolean",
            FieldKind::Date => "a date",
            FieldKind::List => "a list",
            FieldKind::Record => "a record",
        })
    }
}

impl FieldKind {
    /// Does `value` fit this kind? Null fits every kind.
    pub fn accepts(self, value: &FieldValue) -> bool {
        match (self, value) {
            (_, FieldValue::Null) => true,
            (FieldKind::Text, FieldValue::Text(_)) => true,
            (FieldKind::Number, FieldValue::Integer(_))
            | (FieldKind::Number, FieldValue::Unsigned(_))
            | (FieldKind::Number, FieldValue::Float(_)) => true,
            (FieldKind::Boolean, FieldValue::Bool(_)) => true,
            (FieldKind::Date, FieldValue::Text(ref v)) =>
                NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok(),
            (FieldKind::List, FieldValue::List(_)) => true,
            (FieldKind::Record, FieldValue::Record(_)) => true,
            _ => false,
        }
    }
}

impl Schema {
    /// Validate content against this schema.
    ///
    /// An empty schema places no constraints on content.
    pub fn validate(&self, content: &Content) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            return Ok(());
        }

        if let Some(name) = content.keys()
            .find(|name| self.field(name).is_none())
        {
            return Err(ValidationError::UnknownField(name.clone()));
        }

        for spec in &self.fields {
            match content.get(&spec.name) {
                Some(value) if !spec.kind.accepts(value) =>
                    return Err(ValidationError::InvalidType {
                        field: spec.name.clone(),
                        expected: spec.kind,
                    }),
                Some(value) if spec.required && value.is_blank() =>
                    return Err(ValidationError::MissingField(spec.name.clone())),
                None if spec.required =>
                    return Err(ValidationError::MissingField(spec.name.clone())),
                _ => (),
            }
        }

        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Template {
    /// Default title for a document based on this template.
    pub fn default_title(&self, category: &str) -> String {
        format!("{} - {}", category, self.name)
    }
}
