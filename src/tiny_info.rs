//! Flat encoding of Gauss localizations, read by the Gauss post-processing
//! filters.
//!
//! Layout: `[nbTypes, (len, cellType, dim, refCoo.., gaussCoo..) * nbTypes]`
//! where `len` counts everything after itself in the entry.

use crate::vtk::CellType;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// No entry for the cell type.
    NotFound(CellType),

    /// An entry doesn't have the size its cell type and Gauss point count
    /// require.
    SizeMismatch {
        cell_type: CellType,
        expected: usize,
        actual: usize,
    },

    /// The payload ends in the middle of an entry.
    Truncated,

    /// A count, length or dimension is not a small non-negative integer.
    InvalidCount(f64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(ct) => write!(f, "Not found cell type {ct} in advanced Gauss info"),
            Error::SizeMismatch {
                cell_type,
                expected,
                actual,
            } => write!(
                f,
                "advanced Gauss info of cell type {cell_type}: expected {expected} values, got {actual}"
            ),
            Error::Truncated => write!(f, "advanced Gauss info is truncated"),
            Error::InvalidCount(v) => write!(f, "advanced Gauss info: invalid count {v}"),
        }
    }
}

impl std::error::Error for Error {}

/// Gauss localizations accumulated while building a dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportedTinyInfo {
    entries: Vec<(CellType, usize, Vec<f64>, Vec<f64>)>,
}

impl ExportedTinyInfo {
    /// Records the localization of a cell type. A cell type already present
    /// is not recorded twice.
    pub fn push_gauss_additional_info(
        &mut self,
        cell_type: CellType,
        dim: usize,
        ref_coords: Vec<f64>,
        gauss_coords: Vec<f64>,
    ) {
        if self.entries.iter().any(|(ct, ..)| *ct == cell_type) {
            return;
        }
        self.entries.push((cell_type, dim, ref_coords, gauss_coords));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode(&self) -> Vec<f64> {
        let mut out = vec![self.entries.len() as f64];
        for (ct, dim, ref_coords, gauss_coords) in &self.entries {
            out.push((2 + ref_coords.len() + gauss_coords.len()) as f64);
            out.push(f64::from(ct.0));
            out.push(*dim as f64);
            out.extend_from_slice(ref_coords);
            out.extend_from_slice(gauss_coords);
        }
        out
    }
}

/// Localization of one cell type, decoded from the flat payload.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussInfo {
    pub dim: usize,
    pub ref_coords: Vec<f64>,
    pub gauss_coords: Vec<f64>,
}

/// Largest count accepted in a payload.
const MAX_COUNT: f64 = u32::MAX as f64;

fn count(value: f64) -> Result<usize, Error> {
    if !(0.0..=MAX_COUNT).contains(&value) || value.fract() != 0.0 {
        return Err(Error::InvalidCount(value));
    }
    Ok(value as usize)
}

/// Finds the entry of `cell_type`, checking it holds `nodes` reference
/// nodes and `gauss_points` Gauss points.
pub fn fill_adv_info_from(
    payload: &[f64],
    cell_type: CellType,
    nodes: usize,
    gauss_points: usize,
) -> Result<GaussInfo, Error> {
    let entries = count(*payload.first().ok_or(Error::Truncated)?)?;
    let mut pos: usize = 1;
    for _ in 0..entries {
        let len = count(*payload.get(pos).ok_or(Error::Truncated)?)?;
        let end = (pos + 1).checked_add(len).ok_or(Error::Truncated)?;
        let entry = payload.get(pos + 1..end).ok_or(Error::Truncated)?;
        if entry.len() < 2 {
            return Err(Error::Truncated);
        }
        if entry[0] == f64::from(cell_type.0) {
            let dim = count(entry[1])?;
            let expected = nodes
                .checked_add(gauss_points)
                .and_then(|n| n.checked_mul(dim))
                .and_then(|n| n.checked_add(2))
                .ok_or(Error::InvalidCount(entry[1]))?;
            if len != expected || (dim == 0 && nodes != 1) {
                return Err(Error::SizeMismatch {
                    cell_type,
                    expected,
                    actual: len,
                });
            }
            let split = 2 + nodes * dim;
            return Ok(GaussInfo {
                dim,
                ref_coords: entry[2..split].to_vec(),
                gauss_coords: entry[split..].to_vec(),
            });
        }
        pos = end;
    }
    Err(Error::NotFound(cell_type))
}
