//! Catalog discovery and stream selection
//!
//! The catalog describes every stream the tap can extract, with selection
//! metadata a pipeline operator may edit before a sync run. Streams are
//! selected by default; the sync run resolves the catalog back to the
//! static stream definitions filtered to the selected entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::streams::{all_streams, StreamDef, StreamError};

/// Catalog of available streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog entries, one per stream
    pub streams: Vec<CatalogEntry>,
}

/// Catalog entry for one stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream identifier
    pub tap_stream_id: String,
    /// Stream display name (same as the identifier here)
    pub stream: String,
    /// Record schema document
    pub schema: Value,
    /// Field names uniquely identifying a record
    pub key_properties: Vec<String>,
    /// Selection metadata entries
    pub metadata: Vec<MetadataEntry>,
}

/// One metadata entry, addressed by a breadcrumb path into the schema
/// (empty breadcrumb addresses the stream itself)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path into the schema this metadata applies to
    pub breadcrumb: Vec<String>,
    /// Metadata payload
    pub metadata: StreamMetadata,
}

/// Stream-level selection metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Whether the stream is selected for extraction
    #[serde(default)]
    pub selected: bool,
    /// Whether the stream is selected when the operator does not decide
    #[serde(rename = "selected-by-default", default)]
    pub selected_by_default: bool,
    /// Whether the stream can be selected at all
    #[serde(default)]
    pub inclusion: Option<String>,
    /// Key properties mirrored into metadata
    #[serde(rename = "table-key-properties", default)]
    pub table_key_properties: Vec<String>,
}

impl Catalog {
    /// Load a catalog from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Resolve the catalog to the active stream definitions: entries whose
    /// stream-level metadata (empty breadcrumb) is marked selected
    pub fn selected_streams(&self) -> Vec<&'static StreamDef> {
        let selected_ids: Vec<&str> = self
            .streams
            .iter()
            .filter(|entry| {
                entry
                    .metadata
                    .iter()
                    .any(|m| m.breadcrumb.is_empty() && m.metadata.selected)
            })
            .map(|entry| entry.tap_stream_id.as_str())
            .collect();

        all_streams()
            .iter()
            .filter(|stream| selected_ids.contains(&stream.stream_id()))
            .collect()
    }
}

/// Build a catalog covering every known stream, selected by default
pub fn discover() -> Result<Catalog, CatalogError> {
    let mut streams = Vec::new();
    for stream in all_streams() {
        let key_properties: Vec<String> = stream
            .key_properties()
            .iter()
            .map(|k| k.to_string())
            .collect();
        streams.push(CatalogEntry {
            tap_stream_id: stream.stream_id().to_string(),
            stream: stream.stream_id().to_string(),
            schema: stream.schema()?.clone(),
            key_properties: key_properties.clone(),
            metadata: vec![MetadataEntry {
                breadcrumb: Vec::new(),
                metadata: StreamMetadata {
                    selected: true,
                    selected_by_default: true,
                    inclusion: Some("available".to_string()),
                    table_key_properties: key_properties,
                },
            }],
        });
    }
    Ok(Catalog { streams })
}

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to read the catalog file
    #[error("failed to read catalog: {0}")]
    Io(String),

    /// Catalog file is not valid JSON
    #[error("failed to parse catalog: {0}")]
    Parse(String),

    /// A stream's schema document failed to load
    #[error(transparent)]
    Stream(#[from] StreamError),
}
