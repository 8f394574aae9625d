//! Random forest ensemble
//!
use std::collections::HashSet;
use std::io::Read;

use ndarray::{Array1, ArrayBase, Data, Ix1, Ix2};

use super::reader::ModelReader;
use super::tree::DecisionTree;
use crate::error::Result;

/// A loaded random forest classifier.
///
/// ### Structure
///
/// A forest owns an ordered collection of [`DecisionTree`]s, in the order
/// they appeared in the serialized model. Order does not influence the
/// prediction (the aggregate is a mean) but is kept deterministic for
/// reproducibility.
///
/// ### Predictions
///
/// Each member tree routes the feature vector to one of its leaves and
/// reports that leaf's positive-class score; the forest's prediction is the
/// unweighted arithmetic mean of those scores. Under the usual training
/// convention the leaf scores are class probabilities, so the mean is the
/// ensemble's predicted probability of the positive class — the runtime does
/// not clamp or renormalize it.
///
/// Prediction is a pure function of the frozen tree collection and the
/// input: no randomness, no interior mutability. A successfully constructed
/// forest can be shared freely between threads and the same input always
/// yields the bit-identical output.
///
/// ### Example
///
/// ```rust
/// use canopy::Forest;
/// use ndarray::array;
///
/// let json = r#"[{
///     "feature": [0, -2, -2],
///     "threshold": [0.5, 0.0, 0.0],
///     "left": [1, -1, -1],
///     "right": [2, -1, -1],
///     "value": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
/// }]"#;
///
/// let forest = Forest::from_json(json).unwrap();
/// let probability = forest.predict(&array![0.8]).unwrap();
///
/// assert_eq!(probability, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<DecisionTree>,
}

impl Forest {
    /// Invariant: `trees` is non-empty; upheld by [`ModelReader`], the only
    /// constructor path.
    pub(crate) fn new(trees: Vec<DecisionTree>) -> Self {
        debug_assert!(!trees.is_empty());
        Forest { trees }
    }

    /// Consumes a byte source end-to-end and deserializes it with the
    /// default (lenient) [`ModelReader`].
    pub fn from_reader(source: impl Read) -> Result<Self> {
        ModelReader::new().read(source)
    }

    /// Deserializes a forest from JSON text with the default (lenient)
    /// [`ModelReader`].
    pub fn from_json(text: &str) -> Result<Self> {
        ModelReader::new().read_str(text)
    }

    /// Returns a [`ModelReader`] for configuring deserialization:
    ///
    /// * `strictness = Strictness::Lenient`
    pub fn reader() -> ModelReader {
        ModelReader::new()
    }

    /// Returns the ensemble's positive-class probability for the feature
    /// vector `x`.
    ///
    /// Fails if a tree tests a feature index past the end of `x` or reaches
    /// a scoreless leaf; either failure leaves the forest untouched and
    /// reusable.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Result<f64> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(x)?;
        }

        Ok(sum / self.trees.len() as f64)
    }

    /// Makes a prediction for each row of a matrix of features `x`,
    /// failing on the first row that cannot be scored.
    pub fn predict_batch(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Array1<f64>> {
        let mut predictions = Vec::with_capacity(x.nrows());
        for row in x.rows() {
            predictions.push(self.predict(&row)?);
        }

        Ok(Array1::from(predictions))
    }

    /// Return the number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the member trees in serialization order
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Minimum feature-vector length accepted by every possible traversal:
    /// one past the largest feature index any split in any tree tests.
    ///
    /// The serialized encoding does not carry the trained input width, so
    /// this is the tightest bound the runtime can offer callers sizing
    /// their vectors.
    pub fn num_features(&self) -> usize {
        self.trees
            .iter()
            .map(|tree| tree.min_input_len())
            .max()
            .unwrap_or(0)
    }

    /// Return the feature indices tested anywhere in the ensemble,
    /// sorted and deduplicated
    pub fn features(&self) -> Vec<usize> {
        let mut fitted_features = HashSet::new();

        for tree in &self.trees {
            fitted_features.extend(tree.features());
        }

        let mut features: Vec<_> = fitted_features.into_iter().collect();
        features.sort_unstable();
        features
    }

    /// Return max depth over all member trees
    pub fn max_depth(&self) -> usize {
        self.trees
            .iter()
            .map(|tree| tree.max_depth())
            .max()
            .unwrap_or(0)
    }

    /// Return the total number of leaves in the ensemble
    pub fn num_leaves(&self) -> usize {
        self.trees.iter().map(|tree| tree.num_leaves()).sum()
    }
}
