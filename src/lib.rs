//! Core of a reader for MED finite-element result files.
//!
//! # Crate Layout
//!
//! A [`MedDocument`] holds the meshes, fields and Gauss localizations read
//! from a file. The [`RepresentationTree`] groups its fields into
//! selectable leaves (same time steps, same mesh, same support) and builds
//! the visualization dataset of the active one, see [`vtk`]. The
//! [`MedReader`] puts a selection state and a time axis on top of it.
//!
//! Datasets can also go the other way: [`convert::write_med_from_vtk`] turns
//! a dataset back into a MED document.
//!
//! # Gauss-point post-processing
//!
//! - [`VoroGauss`] splits every cell into one Voronoi cell per Gauss point,
//! - [`GaussToCell`] reduces Gauss-point values to cell values,
//! - [`generate_vectors`] adds 3-component companions for display.
//!
//! Both Gauss filters read the localizations the reader published into a
//! [`Registry`].

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    rust_2018_idioms
)]

#[cfg(test)]
#[macro_use]
extern crate approx;
#[cfg(not(test))]
extern crate approx;

pub mod array;
pub mod convert;
pub mod gauss_to_cell;
pub mod med;
pub mod reader;
pub mod registry;
pub mod shape;
pub mod sil;
pub mod time_keeper;
pub mod tiny_info;
pub mod tree;
pub mod vectors;
pub mod voro_gauss;
pub mod voronoi;
pub mod vtk;

pub use crate::array::DataArray;
pub use crate::array::Values;
pub use crate::gauss_to_cell::GaussToCell;
pub use crate::med::MedDocument;
pub use crate::reader::MedReader;
pub use crate::reader::ReaderSettings;
pub use crate::registry::Registry;
pub use crate::sil::GroupSelection;
pub use crate::sil::Sil;
pub use crate::time_keeper::TimeKeeper;
pub use crate::tree::RepresentationTree;
pub use crate::vectors::generate_vectors;
pub use crate::voro_gauss::VoroGauss;
pub use crate::voronoi::Point3D;
pub use crate::vtk::DataObject;
pub use crate::vtk::DataSet;

pub use nalgebra;
pub use num_traits;
pub use rayon;

use std::fmt;

/// Separates a field name from its discretization in array names.
pub const ZE_SEP: &str = "@@][@@";

/// Prefix of time series names.
pub const TS_STR: &str = "TS";

/// Prefix of common support names.
pub const COM_SUP_STR: &str = "ComSup";

/// Single component name of mesh pseudo-fields.
pub const COMPO_STR_TO_LOCATE_MESH_DA: &str = "-@?|*_";

pub const ROOT_OF_GRPS_IN_TREE: &str = "zeGrps";
pub const ROOT_OF_FAM_IDS_IN_TREE: &str = "zeFamIds";

pub const FAMILY_ID_CELL_NAME: &str = "FamilyIdCell";
pub const NUM_ID_CELL_NAME: &str = "NumIdCell";
pub const FAMILY_ID_NODE_NAME: &str = "FamilyIdNode";
pub const NUM_ID_NODE_NAME: &str = "NumIdNode";
pub const GLOBAL_NODE_ID_NAME: &str = "GlobalNodeIds";

/// Any error of the crate.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    Array(array::Error),
    Convert(convert::Error),
    GaussToCell(gauss_to_cell::Error),
    Med(med::Error),
    Reader(reader::Error),
    Shape(shape::Error),
    Sil(sil::Error),
    TimeKeeper(time_keeper::Error),
    TinyInfo(tiny_info::Error),
    Tree(tree::Error),
    VoroGauss(voro_gauss::Error),
    Voronoi(voronoi::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Array(err) => write!(f, "{err}"),
            Error::Convert(err) => write!(f, "conversion failed: {err}"),
            Error::GaussToCell(err) => write!(f, "GaussToCell: {err}"),
            Error::Med(err) => write!(f, "{err}"),
            Error::Reader(err) => write!(f, "{err}"),
            Error::Shape(err) => write!(f, "{err}"),
            Error::Sil(err) => write!(f, "{err}"),
            Error::TimeKeeper(err) => write!(f, "{err}"),
            Error::TinyInfo(err) => write!(f, "{err}"),
            Error::Tree(err) => write!(f, "{err}"),
            Error::VoroGauss(err) => write!(f, "VoroGauss: {err}"),
            Error::Voronoi(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(match self {
            Error::Array(err) => err,
            Error::Convert(err) => err,
            Error::GaussToCell(err) => err,
            Error::Med(err) => err,
            Error::Reader(err) => err,
            Error::Shape(err) => err,
            Error::Sil(err) => err,
            Error::TimeKeeper(err) => err,
            Error::TinyInfo(err) => err,
            Error::Tree(err) => err,
            Error::VoroGauss(err) => err,
            Error::Voronoi(err) => err,
        })
    }
}

macro_rules! impl_from_error {
    ($($module:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$module::Error> for Error {
                fn from(err: $module::Error) -> Self {
                    Error::$variant(err)
                }
            }
        )*
    };
}

impl_from_error! {
    array => Array,
    convert => Convert,
    gauss_to_cell => GaussToCell,
    med => Med,
    reader => Reader,
    shape => Shape,
    sil => Sil,
    time_keeper => TimeKeeper,
    tiny_info => TinyInfo,
    tree => Tree,
    voro_gauss => VoroGauss,
    voronoi => Voronoi,
}

pub type Result<T> = std::result::Result<T, Error>;
