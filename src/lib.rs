//! App store payload parser
//!
//! Extracts typed app metadata from the positional, array-of-arrays payloads
//! embedded in store pages:
//! - Index-path lookup that treats absence as an ordinary outcome
//! - Declarative field rules with transforms and fallback chains
//! - Recursive category discovery
//! - Field catalogs for detail pages, clusters and list entries
//! - Page and RPC envelope decoding

pub mod categories;
pub mod details;
pub mod errors;
pub mod listing;
pub mod lookup;
pub mod payload;
pub mod registry;
pub mod rule;
pub mod transform;

#[cfg(test)]
mod fixtures;

pub use categories::{categories_or_genre, classify, CategoryRecord};
pub use details::{app_details, app_details_from_page, details_url};
pub use errors::{ExtractError, PayloadError, RegistryError, TransformError};
pub use listing::{parse_cluster, parse_continuation, parse_permissions, ClusterPage};
pub use lookup::lookup;
pub use payload::{parse_batch_response, parse_page};
pub use registry::{ExtractionResult, FieldRegistry};
pub use rule::{partition_key, Fallback, FieldRule};
pub use transform::Transform;
