//! Error types in canopy
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading the serialized model bytes failed before any parsing took
    /// place. Never retried internally; the caller decides whether to supply
    /// a fresh byte source.
    #[error("failed to read model data")]
    Io(#[from] std::io::Error),
    /// The bytes were read but do not describe a valid forest: not UTF-8,
    /// not a JSON array of tree records, or a record violating the
    /// structural invariants of the encoding.
    #[error("malformed model: {0}")]
    MalformedModel(String),
    /// The model parsed to an array with zero tree records. An ensemble
    /// average over no trees has no defined value, so this is rejected at
    /// construction rather than at predict time.
    #[error("model contains no trees")]
    EmptyModel,
    /// A split node referenced a feature index beyond the end of the input
    /// vector. The tree encoding does not carry the expected input length,
    /// so this is detected per call.
    #[error("feature index {index} out of bounds for input of length {len}")]
    FeatureOutOfBounds { index: usize, len: usize },
    /// The reached leaf carries no positive-class score; only possible for
    /// models loaded with `Strictness::Lenient` from irregular `value` rows.
    #[error("leaf node {node} carries no positive-class score")]
    MissingLeafScore { node: usize },
}
