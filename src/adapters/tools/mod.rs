//! Tool adapters.
//!
//! - `SequenceFeaturesAdapter` - Local sequence feature computation
//! - `MockToolAdapter` - Scriptable adapter for tests and demos

mod mock_tool;
mod sequence_features;

pub use mock_tool::{MockOutcome, MockToolAdapter};
pub use sequence_features::{SequenceFeaturesAdapter, SEQUENCE_FEATURES_TOOL};
