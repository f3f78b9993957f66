// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chroma Module
//!
//! Client for the Chroma v2 HTTP API.
//!
//! - [`store`]: [`ChromaStore`], the data-access layer with its local mirror
//! - [`models`]: collections, documents and wire bodies
//! - [`metadata`]: typed metadata entry and document validation
//! - [`paths`]: endpoint URLs

pub mod metadata;
pub mod models;
pub mod paths;
pub mod store;

pub use metadata::{MetadataPair, MetadataType, ValidationError};
pub use models::{CollectionInfo, Document, Metadata, MetadataValue, NewDocument};
pub use store::ChromaStore;
