//! Conversion between the pipeline datasets and the MED document model.
//!
//! [`write_med_from_vtk`] turns any supported data object into meshes and
//! fields; [`umesh_to_vtk`] goes the other way for unstructured meshes. Node
//! numbering is shared by both sides, so connectivities are copied as is.

use crate::array;
use crate::med;
use crate::vtk::CellType;
use crate::ZE_SEP;
use std::fmt;

mod to_med;
mod to_vtk;

pub use to_med::put_fam_grp_info_if_any;
pub use to_med::write_med_from_vtk;
pub use to_med::WriteOptions;
pub use to_vtk::points_3d;
pub use to_vtk::umesh_to_vtk;
pub(crate) use to_vtk::CellSink;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An array element type with no MED counterpart.
    UnrecognizedArrayType {
        array: String,
        type_name: &'static str,
    },

    /// A cell type with no MED counterpart.
    UnrecognizedCellType { pos: usize, cell_type: CellType },

    /// A poly-vertex or vertex cell holding more than one point.
    NonSinglePolyVertex { pos: usize },

    /// A poly-line cell, which MED cannot store.
    PolyLine { pos: usize },

    /// A triangle strip with less than three points.
    BadTriangleStrip { pos: usize },

    /// A polyhedron without a usable face stream.
    MalformedPolyhedron { pos: usize },

    /// A multi-block holds an empty block.
    NullBlock { context: Vec<usize>, pos: usize },

    /// The dataset kind can't be converted.
    UnsupportedDataSet(&'static str),

    /// An attribute array doesn't have one tuple per point or cell.
    BadArrayLength {
        array: String,
        expected: usize,
        actual: usize,
    },

    /// An integer value doesn't fit the MED integer type.
    IdOverflow { array: String, value: i64 },

    /// A family name lacks its `@@][@@id` suffix.
    BadFamily(String),

    Array(array::Error),
    Med(med::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnrecognizedArrayType { array, type_name } => {
                write!(f, "unrecognized array \"{type_name}\" type for array {array:?}")
            }
            Error::UnrecognizedCellType { pos, cell_type } => write!(
                f,
                "at pos #{pos} unrecognized VTK cell with type = {cell_type}"
            ),
            Error::NonSinglePolyVertex { pos } => write!(
                f,
                "at pos #{pos} non single poly vertex not managed by MED"
            ),
            Error::PolyLine { pos } => write!(
                f,
                "at pos #{pos} poly line found, MED file format does not support it"
            ),
            Error::BadTriangleStrip { pos } => {
                write!(f, "on cell #{pos} the triangle strip looks bad")
            }
            Error::MalformedPolyhedron { pos } => {
                write!(f, "polyhedron #{pos} has no valid face stream")
            }
            Error::NullBlock { context, pos } => {
                write!(f, "in context {context:?} at pos #{pos} elt is empty")
            }
            Error::UnsupportedDataSet(class) => write!(
                f,
                "unrecognized dataset {class}, convert it to an unstructured grid first"
            ),
            Error::BadArrayLength {
                array,
                expected,
                actual,
            } => write!(
                f,
                "array {array:?} has {actual} tuples, expected {expected}"
            ),
            Error::IdOverflow { array, value } => {
                write!(f, "value {value} of array {array:?} overflows a 32-bit integer")
            }
            Error::BadFamily(name) => write!(
                f,
                "family {name:?} is not of the form name{ZE_SEP}id"
            ),
            Error::Array(err) => write!(f, "{err}"),
            Error::Med(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Array(err) => Some(err),
            Error::Med(err) => Some(err),
            _ => None,
        }
    }
}

impl From<array::Error> for Error {
    fn from(err: array::Error) -> Self {
        Error::Array(err)
    }
}

impl From<med::Error> for Error {
    fn from(err: med::Error) -> Self {
        Error::Med(err)
    }
}

/// A family to attach to a converted mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Family {
    pub name: String,
    pub id: i64,
}

impl Family {
    /// Parses `name@@][@@id`.
    pub fn parse(encoded: &str) -> Result<Family, Error> {
        let (name, id) = encoded
            .split_once(ZE_SEP)
            .ok_or_else(|| Error::BadFamily(encoded.to_string()))?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| Error::BadFamily(encoded.to_string()))?;
        Ok(Family {
            name: name.to_string(),
            id,
        })
    }
}

/// A group to attach to a converted mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub families: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parse() {
        assert_eq!(
            Family::parse("FAM_-3_bottom@@][@@-3").unwrap(),
            Family {
                name: "FAM_-3_bottom".to_string(),
                id: -3
            }
        );
        assert!(matches!(Family::parse("bottom"), Err(Error::BadFamily(_))));
        assert!(matches!(Family::parse("bottom@@][@@x"), Err(Error::BadFamily(_))));
    }
}
