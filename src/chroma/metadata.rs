// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed metadata entry and validation of new documents.
//!
//! Metadata is entered as `key`, raw text value and declared type. Values
//! are checked against their type and converted to [`MetadataValue`]s
//! before a document is sent to the server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::{Metadata, MetadataValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
}

impl MetadataType {
    pub fn description(self) -> &'static str {
        match self {
            MetadataType::String => "Text value (e.g., \"hello\")",
            MetadataType::Integer => "Whole number (e.g., 42)",
            MetadataType::Float => "Decimal number (e.g., 3.14)",
            MetadataType::Boolean => "True or false value",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            MetadataType::String => "Enter text value",
            MetadataType::Integer => "Enter whole number",
            MetadataType::Float => "Enter decimal number",
            MetadataType::Boolean => "Select true or false",
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataType::String => "string",
            MetadataType::Integer => "integer",
            MetadataType::Float => "float",
            MetadataType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl FromStr for MetadataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(MetadataType::String),
            "integer" | "int" => Ok(MetadataType::Integer),
            "float" => Ok(MetadataType::Float),
            "boolean" | "bool" => Ok(MetadataType::Boolean),
            other => Err(format!("unknown metadata type {other:?}")),
        }
    }
}

/// One metadata row as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPair {
    pub key: String,
    pub value: String,
    pub kind: MetadataType,
}

impl MetadataPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>, kind: MetadataType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind,
        }
    }

    fn is_blank(&self) -> bool {
        self.key.trim().is_empty() && self.value.trim().is_empty()
    }
}

impl FromStr for MetadataPair {
    type Err = String;

    /// Parse `key=value` or `key:type=value`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value or key:type=value, got {s:?}"))?;
        let (key, kind) = match head.split_once(':') {
            Some((key, kind)) => (key, kind.parse()?),
            None => (head, MetadataType::String),
        };
        Ok(Self::new(key.trim(), value, kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Document content is required")]
    MissingContent,

    #[error("All metadata fields require a key")]
    MissingKey,

    #[error("Metadata field \"{0}\" must be an integer")]
    NotInteger(String),

    #[error("Metadata field \"{0}\" must be a float")]
    NotFloat(String),

    #[error("Metadata field \"{0}\" must be a boolean (true or false)")]
    NotBoolean(String),
}

fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    let v = value.parse::<f64>().ok()?;
    let in_range = v >= i64::MIN as f64 && v <= i64::MAX as f64;
    (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
}

fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Whether the pair's value is non-blank and matches its declared type.
pub fn is_valid_value(pair: &MetadataPair) -> bool {
    parse_metadata_value(pair).is_some()
}

/// Convert the pair's raw value to a typed value.
pub fn parse_metadata_value(pair: &MetadataPair) -> Option<MetadataValue> {
    let value = pair.value.trim();
    if value.is_empty() {
        return None;
    }
    match pair.kind {
        MetadataType::String => Some(MetadataValue::Str(value.to_string())),
        MetadataType::Integer => parse_integer(value).map(MetadataValue::Int),
        MetadataType::Float => parse_float(value).map(MetadataValue::Float),
        MetadataType::Boolean => parse_boolean(value).map(MetadataValue::Bool),
    }
}

pub fn validate_document(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::MissingContent);
    }
    Ok(())
}

/// Check every non-blank row. Stops at the first problem.
pub fn validate_metadata(pairs: &[MetadataPair]) -> Result<(), ValidationError> {
    for pair in pairs.iter().filter(|p| !p.is_blank()) {
        let key = pair.key.trim();
        if key.is_empty() {
            return Err(ValidationError::MissingKey);
        }
        if pair.kind != MetadataType::String && !is_valid_value(pair) {
            return Err(match pair.kind {
                MetadataType::Integer => ValidationError::NotInteger(key.to_string()),
                MetadataType::Float => ValidationError::NotFloat(key.to_string()),
                _ => ValidationError::NotBoolean(key.to_string()),
            });
        }
    }
    Ok(())
}

/// Validate rows and build the metadata map. Rows with neither key nor
/// value are skipped; later keys overwrite earlier ones.
pub fn metadata_from_pairs(pairs: &[MetadataPair]) -> Result<Metadata, ValidationError> {
    validate_metadata(pairs)?;
    Ok(pairs
        .iter()
        .filter(|p| !p.is_blank())
        .map(|pair| {
            let value = parse_metadata_value(pair)
                .unwrap_or_else(|| MetadataValue::Str(pair.value.trim().to_string()));
            (pair.key.trim().to_string(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str, kind: MetadataType) -> MetadataPair {
        MetadataPair::new(key, value, kind)
    }

    #[test]
    fn value_validity_by_type() {
        assert!(is_valid_value(&pair("k", "hello", MetadataType::String)));
        assert!(!is_valid_value(&pair("k", "   ", MetadataType::String)));

        assert!(is_valid_value(&pair("k", "42", MetadataType::Integer)));
        assert!(is_valid_value(&pair("k", "4.0", MetadataType::Integer)));
        assert!(!is_valid_value(&pair("k", "4.5", MetadataType::Integer)));
        assert!(!is_valid_value(&pair("k", "abc", MetadataType::Integer)));

        assert!(is_valid_value(&pair("k", "3.14", MetadataType::Float)));
        assert!(!is_valid_value(&pair("k", "NaN", MetadataType::Float)));

        assert!(is_valid_value(&pair("k", "true", MetadataType::Boolean)));
        assert!(!is_valid_value(&pair("k", "yes", MetadataType::Boolean)));
    }

    #[test]
    fn parses_typed_values() {
        assert_eq!(
            parse_metadata_value(&pair("k", " 7 ", MetadataType::Integer)),
            Some(MetadataValue::Int(7))
        );
        assert_eq!(
            parse_metadata_value(&pair("k", "false", MetadataType::Boolean)),
            Some(MetadataValue::Bool(false))
        );
        assert_eq!(
            parse_metadata_value(&pair("k", "2.5", MetadataType::Float)),
            Some(MetadataValue::Float(2.5))
        );
    }

    #[test]
    fn document_content_is_required() {
        assert_eq!(validate_document(""), Err(ValidationError::MissingContent));
        assert_eq!(
            ValidationError::MissingContent.to_string(),
            "Document content is required"
        );
        assert!(validate_document("hello").is_ok());
    }

    #[test]
    fn metadata_errors_name_the_field() {
        let err = validate_metadata(&[pair("count", "many", MetadataType::Integer)]).unwrap_err();
        assert_eq!(err.to_string(), "Metadata field \"count\" must be an integer");

        let err = validate_metadata(&[pair("on", "1", MetadataType::Boolean)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Metadata field \"on\" must be a boolean (true or false)"
        );

        let err = validate_metadata(&[pair(" ", "x", MetadataType::String)]).unwrap_err();
        assert_eq!(err, ValidationError::MissingKey);
    }

    #[test]
    fn builds_metadata_map() {
        let metadata = metadata_from_pairs(&[
            pair("source", "web", MetadataType::String),
            pair("", "", MetadataType::String),
            pair("rank", "3", MetadataType::Integer),
        ])
        .unwrap();

        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["rank"], MetadataValue::Int(3));
    }

    #[test]
    fn pair_from_cli_syntax() {
        let p: MetadataPair = "rank:int=3".parse().unwrap();
        assert_eq!(p, pair("rank", "3", MetadataType::Integer));

        let p: MetadataPair = "source=web".parse().unwrap();
        assert_eq!(p.kind, MetadataType::String);

        assert!("novalue".parse::<MetadataPair>().is_err());
        assert!("k:date=x".parse::<MetadataPair>().is_err());
    }
}
