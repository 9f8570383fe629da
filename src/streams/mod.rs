//! Stream definitions and request parameter builders
//!
//! Each stream is an immutable descriptor created once at startup from the
//! static registry: identifier, key properties, embedded schema document,
//! incremental flag, and a parameter-builder function bound to that stream's
//! API semantics. Per-stream behavior is a function value with a fixed
//! signature, not a trait hierarchy.

use once_cell::sync::{Lazy, OnceCell};
use serde_json::Value;

use crate::client::{prepare_datetime, Params};
use crate::windows::Window;

/// Builds the query parameter sets for one unit of work.
///
/// Incremental streams receive the current time window; non-incremental
/// streams are called once with `None`. A stream may require several
/// parameter sets per window (see `shipments`).
pub type ParamsFn = fn(Option<&Window>) -> Vec<Params>;

/// Immutable descriptor for one logical data source
pub struct StreamDef {
    endpoint: &'static str,
    key_properties: &'static [&'static str],
    schema_json: &'static str,
    schema: OnceCell<Value>,
    incremental: bool,
    params_fn: ParamsFn,
}

impl StreamDef {
    /// Stream identifier; matches the API endpoint name and the key the
    /// records appear under in each page body
    pub fn stream_id(&self) -> &'static str {
        self.endpoint
    }

    /// API endpoint path for this stream
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// Field names that uniquely identify a record
    pub fn key_properties(&self) -> &'static [&'static str] {
        self.key_properties
    }

    /// Whether this stream supports time-windowed incremental extraction
    pub fn incremental(&self) -> bool {
        self.incremental
    }

    /// Build the parameter sets for a window (or for the single full-table
    /// fetch when `None`)
    pub fn parameters(&self, window: Option<&Window>) -> Vec<Params> {
        (self.params_fn)(window)
    }

    /// The stream's record schema, parsed on first access and cached for
    /// the definition's lifetime
    pub fn schema(&self) -> Result<&Value, StreamError> {
        self.schema.get_or_try_init(|| {
            serde_json::from_str(self.schema_json)
                .map_err(|e| StreamError::InvalidSchema(format!("{}: {e}", self.endpoint)))
        })
    }
}

/// Stream definition errors
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Embedded schema document failed to parse
    #[error("invalid schema document: {0}")]
    InvalidSchema(String),

    /// Requested stream is not in the registry
    #[error("unknown stream: {0}")]
    UnknownStream(String),
}

/// Single full-table fetch: one empty parameter set, window ignored
fn no_parameters(_window: Option<&Window>) -> Vec<Params> {
    vec![Vec::new()]
}

/// Orders are filtered on the single `modifyDate` axis
fn orders_parameters(window: Option<&Window>) -> Vec<Params> {
    let Some(window) = window else {
        return vec![Vec::new()];
    };
    vec![vec![
        ("modifyDateStart".to_string(), prepare_datetime(&window.start)),
        ("modifyDateEnd".to_string(), prepare_datetime(&window.end)),
    ]]
}

/// Shipments need both lifecycle axes per window: records become visible on
/// the `createDate` axis when created and on the `voidDate` axis when
/// voided, and a record visible on only one axis must not be missed. The
/// create-axis query filters `void=false`, so a shipment created and voided
/// inside the same window is only returned by the void-axis query.
fn shipments_parameters(window: Option<&Window>) -> Vec<Params> {
    let Some(window) = window else {
        return vec![Vec::new()];
    };
    vec![
        vec![
            ("createDateStart".to_string(), prepare_datetime(&window.start)),
            ("createDateEnd".to_string(), prepare_datetime(&window.end)),
            ("includeShipmentItems".to_string(), "true".to_string()),
            ("void".to_string(), "false".to_string()),
        ],
        vec![
            ("voidDateStart".to_string(), prepare_datetime(&window.start)),
            ("voidDateEnd".to_string(), prepare_datetime(&window.end)),
            ("includeShipmentItems".to_string(), "true".to_string()),
        ],
    ]
}

/// Static stream registry, built once
static STREAMS: Lazy<Vec<StreamDef>> = Lazy::new(|| {
    vec![
        StreamDef {
            endpoint: "shipments",
            key_properties: &["shipmentId"],
            schema_json: include_str!("schemas/shipments.json"),
            schema: OnceCell::new(),
            incremental: true,
            params_fn: shipments_parameters,
        },
        StreamDef {
            endpoint: "orders",
            key_properties: &["orderId"],
            schema_json: include_str!("schemas/orders.json"),
            schema: OnceCell::new(),
            incremental: true,
            params_fn: orders_parameters,
        },
        StreamDef {
            endpoint: "stores",
            key_properties: &["storeId"],
            schema_json: include_str!("schemas/stores.json"),
            schema: OnceCell::new(),
            incremental: false,
            params_fn: no_parameters,
        },
    ]
});

/// All streams this tap knows how to extract
pub fn all_streams() -> &'static [StreamDef] {
    &STREAMS
}

/// Look up a stream definition by identifier
pub fn get_stream(stream_id: &str) -> Result<&'static StreamDef, StreamError> {
    all_streams()
        .iter()
        .find(|s| s.stream_id() == stream_id)
        .ok_or_else(|| StreamError::UnknownStream(stream_id.to_string()))
}
