// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collection and document types, plus the request and response bodies of
//! the Chroma v2 record endpoints.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A collection as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
}

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(v) => write!(f, "{v}"),
            MetadataValue::Int(v) => write!(f, "{v}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Str(v) => write!(f, "{v}"),
        }
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// A record in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
}

/// Input to [`super::ChromaStore::add_document`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    /// Generated locally when absent.
    pub id: Option<String>,
    pub document: String,
    pub metadata: Metadata,
}

impl NewDocument {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

// ========== Wire Bodies ==========

#[derive(Debug, Serialize)]
pub(crate) struct CreateCollectionBody<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct GetRecordsBody {
    pub include: [&'static str; 2],
}

impl Default for GetRecordsBody {
    fn default() -> Self {
        Self {
            include: ["documents", "metadatas"],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetRecordsResponse {
    pub ids: Vec<String>,
    #[serde(default)]
    pub documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

impl GetRecordsResponse {
    /// Zip the column arrays into documents. Missing cells read as empty.
    pub fn into_documents(self) -> Vec<Document> {
        let mut documents = self.documents.unwrap_or_default().into_iter();
        let mut metadatas = self.metadatas.unwrap_or_default().into_iter();

        self.ids
            .into_iter()
            .map(|id| Document {
                id,
                document: documents.next().flatten().unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AddRecordsBody {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Option<Metadata>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteRecordsBody {
    pub ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn metadata_values_keep_their_type() {
        let metadata: Metadata = serde_json::from_value(json!({
            "flag": true,
            "count": 3,
            "ratio": 0.5,
            "label": "x",
        }))
        .unwrap();

        assert_eq!(metadata["flag"], MetadataValue::Bool(true));
        assert_eq!(metadata["count"], MetadataValue::Int(3));
        assert_eq!(metadata["ratio"], MetadataValue::Float(0.5));
        assert_eq!(metadata["label"], MetadataValue::Str("x".into()));
    }

    #[test]
    fn get_response_tolerates_null_columns() {
        let response: GetRecordsResponse = serde_json::from_value(json!({
            "ids": ["a", "b"],
            "documents": ["first", null],
            "metadatas": null,
        }))
        .unwrap();

        let docs = response.into_documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].document, "first");
        assert_eq!(docs[1].document, "");
        assert!(docs[1].metadata.is_empty());
    }

    #[test]
    fn collection_ignores_extra_fields() {
        let info: CollectionInfo = serde_json::from_value(json!({
            "id": "c1",
            "name": "docs",
            "metadata": null,
            "tenant": "default_tenant",
        }))
        .unwrap();
        assert_eq!(info.name, "docs");
    }
}
