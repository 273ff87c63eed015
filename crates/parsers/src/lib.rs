//! Event Normalizer: heterogeneous origin event records -> canonical events.

pub mod incremental;
pub mod normalize;
pub mod record;

pub(crate) mod common;

pub use incremental::IncrementalNormalizer;
pub use normalize::{normalize_all, normalize_record, normalize_value};
pub use record::OriginRecord;
