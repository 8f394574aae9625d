//! Model deserialization
//!
use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

use super::algorithm::Forest;
use super::tree::DecisionTree;
use crate::error::{Error, Result};

/// How numeric slots inside tree records are treated when they are missing
/// or not numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// Coerce: integer slots fall back to 0, float slots to 0.0, and a
    /// `value` row that is not an array decodes as an empty row. This is
    /// what consumers of the format have historically done, preferring to
    /// load a malformed-but-parseable model over rejecting it.
    Lenient,
    /// Reject the model with [`Error::MalformedModel`] instead.
    Strict,
}

/// Configurable deserializer turning serialized model bytes into a
/// [`Forest`].
///
/// The serialized form is a UTF-8 JSON array of tree records, each record
/// flattening one binary tree into parallel arrays indexed by node id:
///
/// ```json
/// {
///   "feature":   [0, -2, -2],
///   "threshold": [0.5, 0.0, 0.0],
///   "left":      [1, -1, -1],
///   "right":     [2, -1, -1],
///   "value":     [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
/// }
/// ```
///
/// Reading is all-or-nothing: the byte source is consumed to the end, and
/// either every record builds a valid tree or no forest is returned at all.
/// Failures to *read* surface as [`Error::Io`]; content that was read but
/// cannot be understood surfaces as [`Error::MalformedModel`], so callers
/// can tell a broken transport from a broken export.
///
/// ### Example
///
/// ```rust
/// use canopy::{Forest, ModelReader, Strictness};
///
/// let json = r#"[{
///     "feature": [-2], "threshold": [0.0],
///     "left": [-1], "right": [-1],
///     "value": [[0.3, 0.7]]
/// }]"#;
///
/// let forest = ModelReader::new()
///     .strictness(Strictness::Strict)
///     .read_str(json)
///     .unwrap();
/// assert_eq!(forest.num_trees(), 1);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ModelReader {
    strictness: Strictness,
}

impl ModelReader {
    /// Defaults to [`Strictness::Lenient`].
    pub fn new() -> Self {
        ModelReader {
            strictness: Strictness::Lenient,
        }
    }

    /// Sets how malformed numeric slots are treated
    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Consumes `source` end-to-end and builds the forest.
    ///
    /// The source does not need to be seekable; it is read to completion
    /// exactly once and the bytes are dropped after parsing.
    pub fn read(&self, mut source: impl Read) -> Result<Forest> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;

        let text = String::from_utf8(bytes)
            .map_err(|err| Error::MalformedModel(err.to_string()))?;
        self.read_str(&text)
    }

    /// Parses a forest from already-decoded JSON text.
    pub fn read_str(&self, text: &str) -> Result<Forest> {
        let records: Vec<TreeRecord> = serde_json::from_str(text.trim())
            .map_err(|err| Error::MalformedModel(err.to_string()))?;

        if records.is_empty() {
            return Err(Error::EmptyModel);
        }

        let trees = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                self.build_tree(record).map_err(|err| match err {
                    Error::MalformedModel(msg) => {
                        Error::MalformedModel(format!("tree {}: {}", idx, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Forest::new(trees))
    }

    fn build_tree(&self, record: &TreeRecord) -> Result<DecisionTree> {
        let feature = self.int_slots(&record.feature)?;
        let threshold = self.float_slots(&record.threshold)?;
        let left = self.int_slots(&record.left)?;
        let right = self.int_slots(&record.right)?;
        let value = record
            .value
            .iter()
            .map(|row| self.value_row(row))
            .collect::<Result<Vec<_>>>()?;

        DecisionTree::from_arrays(&feature, &threshold, &left, &right, value)
    }

    fn int_slots(&self, slots: &[Value]) -> Result<Vec<i64>> {
        slots.iter().map(|slot| self.int_slot(slot)).collect()
    }

    fn float_slots(&self, slots: &[Value]) -> Result<Vec<f64>> {
        slots.iter().map(|slot| self.float_slot(slot)).collect()
    }

    fn int_slot(&self, slot: &Value) -> Result<i64> {
        match slot.as_i64().or_else(|| slot.as_f64().map(|f| f as i64)) {
            Some(n) => Ok(n),
            None => match self.strictness {
                Strictness::Lenient => Ok(0),
                Strictness::Strict => Err(Error::MalformedModel(format!(
                    "expected an integer slot, found {}",
                    slot
                ))),
            },
        }
    }

    fn float_slot(&self, slot: &Value) -> Result<f64> {
        match slot.as_f64() {
            Some(f) => Ok(f),
            None => match self.strictness {
                Strictness::Lenient => Ok(0.0),
                Strictness::Strict => Err(Error::MalformedModel(format!(
                    "expected a float slot, found {}",
                    slot
                ))),
            },
        }
    }

    fn value_row(&self, row: &Value) -> Result<Vec<f64>> {
        match row.as_array() {
            Some(slots) => self.float_slots(slots),
            None => match self.strictness {
                Strictness::Lenient => Ok(vec![]),
                Strictness::Strict => Err(Error::MalformedModel(format!(
                    "expected a value row, found {}",
                    row
                ))),
            },
        }
    }
}

impl Default for ModelReader {
    fn default() -> Self {
        Self::new()
    }
}

/// One serialized tree. The required keys must be present and must be
/// arrays; everything below that level is subject to the configured
/// [`Strictness`].
#[derive(Debug, Deserialize)]
struct TreeRecord {
    feature: Vec<Value>,
    threshold: Vec<Value>,
    left: Vec<Value>,
    right: Vec<Value>,
    value: Vec<Value>,
}
