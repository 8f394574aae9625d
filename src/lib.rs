//!
//! # Random forest inference
//! `canopy` evaluates a pre-trained ensemble of binary decision trees
//! against a numeric feature vector and returns the ensemble's predicted
//! probability of the positive class.
//!
//! # The big picture
//!
//! Training happens elsewhere: a classifier (typically scikit-learn's
//! `RandomForestClassifier`) is fitted offline and exported as a JSON array
//! of flattened tree records. `canopy` is the runtime half — it
//! deserializes that array into an immutable [`Forest`] once, then answers
//! any number of [`predict`](Forest::predict) calls against it. There is no
//! training, pruning or serialization path in this crate.
//!
//! Each tree record flattens the binary tree into parallel arrays indexed
//! by node id, with `-2` in the `feature` array marking a leaf:
//!
//! ```json
//! [
//!   {
//!     "feature":   [0, -2, -2],
//!     "threshold": [0.5, 0.0, 0.0],
//!     "left":      [1, -1, -1],
//!     "right":     [2, -1, -1],
//!     "value":     [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
//!   }
//! ]
//! ```
//!
//! # Current state
//!
//! `canopy` currently provides:
//!
//! * [`Forest`] — the loaded ensemble, with single-row and batched
//!   prediction and a few introspection helpers
//! * [`ModelReader`] — configurable deserialization, with a
//!   [`Strictness`] switch deciding whether malformed numeric slots are
//!   coerced to defaults or rejected
//!

mod error;
mod forest;

pub use error::{Error, Result};
pub use forest::*;
