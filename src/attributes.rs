//! The fixed attribute registry and the in-memory attribute table.
//!
//! Every example carries 40 binary attributes with a stable name → position
//! mapping ([`ATTRIBUTE_NAMES`]). The [`AttributeTable`] holds one row per
//! example and is built exactly once; all partitioning reads it immutably.
//!
//! # Loading
//!
//! [`AttributeTable::load`] parses the CelebA text-table pair: an attribute
//! file (count line, header line, then `filename v1..v40` rows with values
//! in {-1, 1}) and a partition file (`filename k` rows). Only rows whose
//! partition value is `0` (the canonical subset) are kept, and values are
//! mapped from {-1, 1} to {0, 1}. The header must match [`ATTRIBUTE_NAMES`]
//! exactly; any mismatch is fatal.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::OnceLock;

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

use crate::selectors::Selector;

/// Number of attribute columns in the table.
pub const N_ATTRIBUTES: usize = 40;

/// Partition value that marks a row as part of the canonical subset.
const CANONICAL_PARTITION: u8 = 0;

/// The fixed, ordered attribute names.
///
/// Order is significant: it defines the column positions of every
/// [`AttributeTable`] and the index space of attribute references.
pub const ATTRIBUTE_NAMES: [&str; N_ATTRIBUTES] = [
    "5_o_Clock_Shadow",
    "Arched_Eyebrows",
    "Attractive",
    "Bags_Under_Eyes",
    "Bald",
    "Bangs",
    "Big_Lips",
    "Big_Nose",
    "Black_Hair",
    "Blond_Hair",
    "Blurry",
    "Brown_Hair",
    "Bushy_Eyebrows",
    "Chubby",
    "Double_Chin",
    "Eyeglasses",
    "Goatee",
    "Gray_Hair",
    "Heavy_Makeup",
    "High_Cheekbones",
    "Male",
    "Mouth_Slightly_Open",
    "Mustache",
    "Narrow_Eyes",
    "No_Beard",
    "Oval_Face",
    "Pale_Skin",
    "Pointy_Nose",
    "Receding_Hairline",
    "Rosy_Cheeks",
    "Sideburns",
    "Smiling",
    "Straight_Hair",
    "Wavy_Hair",
    "Wearing_Earrings",
    "Wearing_Hat",
    "Wearing_Lipstick",
    "Wearing_Necklace",
    "Wearing_Necktie",
    "Young",
];

/// Look up an attribute's column index by name.
///
/// The name → index map is built once on first use and shared thereafter.
pub fn attribute_index(name: &str) -> Option<usize> {
    static INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();
    let index = INDEX.get_or_init(|| {
        ATTRIBUTE_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, i))
            .collect()
    });
    index.get(name).copied()
}

/// Errors that can occur when loading or constructing an attribute table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("header validation failed: {0}")]
    Header(String),

    #[error("expected {expected} attribute columns, got {got}")]
    ColumnCount { expected: usize, got: usize },

    #[error("invalid attribute value {value:?} on line {line}")]
    BadValue { line: usize, value: String },

    #[error("attribute and partition tables disagree: {0}")]
    RowMismatch(String),

    #[error("table contains no rows")]
    Empty,
}

/// Immutable table of per-example binary attributes.
///
/// Shape is `[n_rows, 40]`, one row per example, values in {0, 1}.
/// All intermediate collections produced by partitioning are row indices
/// into this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTable {
    values: Array2<u8>,
}

impl AttributeTable {
    /// Create a table from pre-built values.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the column count is not 40, the table is
    /// empty, or any value is outside {0, 1}.
    pub fn from_values(values: Array2<u8>) -> Result<Self, TableError> {
        if values.ncols() != N_ATTRIBUTES {
            return Err(TableError::ColumnCount {
                expected: N_ATTRIBUTES,
                got: values.ncols(),
            });
        }
        if values.nrows() == 0 {
            return Err(TableError::Empty);
        }
        if let Some(bad) = values.iter().find(|v| **v > 1) {
            return Err(TableError::BadValue {
                line: 0,
                value: bad.to_string(),
            });
        }
        Ok(Self { values })
    }

    /// Load the canonical subset from a CelebA-style attribute/partition pair.
    ///
    /// Returns the table together with the filenames of the kept rows, in
    /// row order, for payload lookup by row index.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] on I/O failure, a header that does not match
    /// [`ATTRIBUTE_NAMES`] exactly, malformed values, or disagreement
    /// between the two files (row count or filename order).
    pub fn load<A: BufRead, P: BufRead>(
        attributes: A,
        partitions: P,
    ) -> Result<(Self, Vec<String>), TableError> {
        let splits = read_partitions(partitions)?;

        let mut lines = attributes.lines().enumerate();

        // Line 1: row count (informational), line 2: header.
        let (_, count_line) = lines
            .next()
            .ok_or_else(|| TableError::Header("missing count line".into()))?;
        let _ = count_line?;
        let (line_no, header_line) = lines
            .next()
            .ok_or_else(|| TableError::Header("missing header line".into()))?;
        let header_line = header_line?;
        validate_header(&header_line, line_no + 1)?;

        let mut kept = Vec::new();
        let mut filenames = Vec::new();
        let mut n_rows = 0usize;
        for (line_no, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let filename = fields
                .next()
                .ok_or_else(|| TableError::RowMismatch(format!("empty row on line {}", line_no + 1)))?;

            let (expected_name, partition) = splits.get(n_rows).ok_or_else(|| {
                TableError::RowMismatch(format!(
                    "attribute table has more rows than the partition table ({})",
                    splits.len()
                ))
            })?;
            if expected_name != filename {
                return Err(TableError::RowMismatch(format!(
                    "row {}: attribute table names {:?}, partition table names {:?}",
                    n_rows, filename, expected_name
                )));
            }
            n_rows += 1;

            if *partition != CANONICAL_PARTITION {
                continue;
            }

            let mut row = Vec::with_capacity(N_ATTRIBUTES);
            for field in fields {
                // Values on disk are -1/1; stored as 0/1.
                match field {
                    "1" => row.push(1u8),
                    "-1" => row.push(0u8),
                    other => {
                        return Err(TableError::BadValue {
                            line: line_no + 1,
                            value: other.to_string(),
                        })
                    }
                }
            }
            if row.len() != N_ATTRIBUTES {
                return Err(TableError::ColumnCount {
                    expected: N_ATTRIBUTES,
                    got: row.len(),
                });
            }
            kept.extend_from_slice(&row);
            filenames.push(filename.to_string());
        }

        if n_rows != splits.len() {
            return Err(TableError::RowMismatch(format!(
                "attribute table has {} rows, partition table has {}",
                n_rows,
                splits.len()
            )));
        }

        let n_kept = filenames.len();
        if n_kept == 0 {
            return Err(TableError::Empty);
        }
        let values = Array2::from_shape_vec((n_kept, N_ATTRIBUTES), kept)
            .expect("row length validated per line");
        Ok((Self { values }, filenames))
    }

    /// Number of rows (examples) in the table.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Attribute value for one example.
    #[inline]
    pub fn value(&self, row: usize, attr: usize) -> u8 {
        self.values[[row, attr]]
    }

    /// All 40 attribute values of one example.
    #[inline]
    pub fn row(&self, row: usize) -> ArrayView1<'_, u8> {
        self.values.row(row)
    }

    /// The values of a subset of attributes for one example, as floats.
    ///
    /// This is the meta-attribute vector handed to consumers as side
    /// information.
    pub fn meta_vector(&self, row: usize, attrs: &[usize]) -> Array1<f32> {
        attrs.iter().map(|&a| self.values[[row, a]] as f32).collect()
    }

    /// Target values for a set of row indices, aligned positionally.
    pub fn targets_for(&self, indices: &[u32], attr: usize) -> Vec<u8> {
        indices
            .iter()
            .map(|&row| self.values[[row as usize, attr]])
            .collect()
    }

    /// Row indices where the selector holds, in ascending order.
    ///
    /// The mask is evaluated in parallel; the returned order is always the
    /// table's row order so downstream sampling stays reproducible.
    pub fn select(&self, selector: &Selector) -> Vec<u32> {
        let mask: Vec<bool> = (0..self.n_rows())
            .into_par_iter()
            .map(|row| selector.matches(self.values.row(row)))
            .collect();
        mask.iter()
            .enumerate()
            .filter(|(_, hit)| **hit)
            .map(|(row, _)| row as u32)
            .collect()
    }
}

fn read_partitions<P: BufRead>(partitions: P) -> Result<Vec<(String, u8)>, TableError> {
    let mut splits = Vec::new();
    for (line_no, line) in partitions.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let filename = fields.next().ok_or_else(|| {
            TableError::RowMismatch(format!("empty partition row on line {}", line_no + 1))
        })?;
        let value = fields.next().and_then(|v| v.parse::<u8>().ok()).ok_or_else(|| {
            TableError::BadValue {
                line: line_no + 1,
                value: line.clone(),
            }
        })?;
        splits.push((filename.to_string(), value));
    }
    Ok(splits)
}

fn validate_header(header_line: &str, line: usize) -> Result<(), TableError> {
    let names: Vec<&str> = header_line.split_whitespace().collect();
    if names.len() != N_ATTRIBUTES {
        return Err(TableError::Header(format!(
            "line {}: expected {} attribute names, got {}",
            line,
            N_ATTRIBUTES,
            names.len()
        )));
    }
    for (i, (got, expected)) in names.iter().zip(ATTRIBUTE_NAMES.iter()).enumerate() {
        if got != expected {
            return Err(TableError::Header(format!(
                "column {}: expected {:?}, got {:?}",
                i, expected, got
            )));
        }
    }
    Ok(())
}
