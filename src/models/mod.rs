//! Wire records of the ingestion service.
//!
//! Every record implements [`Contract`](crate::serializer::Contract) so it can be written by
//! the [`Serializer`](crate::serializer::Serializer).

pub(crate) mod context_tag_keys;
mod data;
mod data_point;
mod envelope;
mod event_data;
mod exception_data;
mod exception_details;
mod message_data;
mod metric_data;
mod page_view_data;
mod page_view_performance_data;
mod remote_dependency_data;
mod sanitize;

pub(crate) use data::*;
pub(crate) use data_point::*;
pub use envelope::*;
pub(crate) use event_data::*;
pub(crate) use exception_data::*;
pub(crate) use exception_details::*;
pub(crate) use message_data::*;
pub(crate) use metric_data::*;
pub(crate) use page_view_data::*;
pub(crate) use page_view_performance_data::*;
pub(crate) use remote_dependency_data::*;
pub(crate) use sanitize::*;

use serde_json::{Map, Value};

/// Custom properties. Values are written as strings.
pub type Properties = Map<String, Value>;

/// Custom measurements. Values are written as numbers.
pub type Measurements = Map<String, Value>;

/// Context tags of an envelope, keyed by `ai.*` tag name.
pub type Tags = Map<String, Value>;

/// Schema version of the domain payloads.
pub(crate) const DATA_VERSION: i64 = 2;
