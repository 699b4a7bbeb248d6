//! In-memory MED document: meshes, fields and Gauss localizations, as handed
//! over by the file loading layer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod field;
mod geo;
mod mesh;

pub use field::FieldMultiTs;
pub use field::FieldPart;
pub use field::FieldValues;
pub use field::TimeStep;
pub use field::TypeOfField;
pub use geo::GeoType;
pub use geo::ALL as ALL_GEO_TYPES;
pub use mesh::structured_cell_count;
pub use mesh::structured_geo_type;
pub use mesh::CMesh;
pub use mesh::CurveLinearMesh;
pub use mesh::FamilyInfo;
pub use mesh::Level;
pub use mesh::Mesh;
pub use mesh::UMesh;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A mesh doesn't have the expected structure.
    MeshStructMismatch(String),

    /// A field doesn't have the expected structure.
    FieldStructMismatch(String),

    /// No mesh with this name in the document.
    NoSuchMesh(String),

    /// No Gauss localization with this name in the document.
    NoSuchLocalization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MeshStructMismatch(msg) => write!(f, "mesh struct mismatch: {msg}"),
            Error::FieldStructMismatch(msg) => write!(f, "field struct mismatch: {msg}"),
            Error::NoSuchMesh(name) => write!(f, "no mesh named {name:?}"),
            Error::NoSuchLocalization(name) => write!(f, "no Gauss localization named {name:?}"),
        }
    }
}

impl std::error::Error for Error {}

/// Gauss integration scheme of a geometric type.
#[derive(Clone, Debug, PartialEq)]
pub struct Localization {
    pub name: String,
    pub geo: GeoType,
    /// Reference coordinates of the nodes of the element.
    pub ref_coords: Vec<f64>,
    /// Gauss points, in reference coordinates.
    pub gauss_coords: Vec<f64>,
    pub weights: Vec<f64>,
}

impl Localization {
    pub fn num_gauss_points(&self) -> usize {
        self.weights.len()
    }

    /// Dimension of the coordinates stored in this localization.
    pub fn dimension(&self) -> usize {
        match self.geo.node_count() {
            Some(n) if n > 0 => self.ref_coords.len() / n,
            _ => self.geo.dimension(),
        }
    }

    /// Reference and Gauss coordinates with exactly `geo.dimension()`
    /// components, truncating or zero-padding as needed.
    pub fn normalized_coords(&self) -> (Vec<f64>, Vec<f64>) {
        let from = self.dimension();
        let to = self.geo.dimension().max(1);
        (
            change_dimension(&self.ref_coords, from, to),
            change_dimension(&self.gauss_coords, from, to),
        )
    }
}

fn change_dimension(coords: &[f64], from: usize, to: usize) -> Vec<f64> {
    if from == to || from == 0 {
        return coords.to_vec();
    }
    coords
        .chunks(from)
        .flat_map(|point| (0..to).map(move |i| point.get(i).copied().unwrap_or(0.0)))
        .collect()
}

/// Everything read from a MED file.
#[derive(Clone, Debug, Default)]
pub struct MedDocument {
    pub meshes: Vec<Arc<Mesh>>,
    pub fields: Vec<FieldMultiTs>,
    pub localizations: BTreeMap<String, Localization>,
}

impl MedDocument {
    pub fn mesh(&self, name: &str) -> Result<&Arc<Mesh>, Error> {
        self.meshes
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| Error::NoSuchMesh(name.to_string()))
    }

    pub fn localization(&self, name: &str) -> Result<&Localization, Error> {
        self.localizations
            .get(name)
            .ok_or_else(|| Error::NoSuchLocalization(name.to_string()))
    }

    pub fn mesh_names(&self) -> Vec<&str> {
        self.meshes.iter().map(|m| m.name()).collect()
    }
}

/// Cells selected by one piece of a support.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SupportPiece {
    pub geo: GeoType,
    /// `None` selects every cell of the type.
    pub profile: Option<Vec<usize>>,
}

/// What a field time step needs from its mesh: the cells it lives on, per
/// geometric type. Node fields span the whole mesh. Two steps have the same
/// support iff their signatures are equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SupportSignature {
    pub pieces: Vec<SupportPiece>,
}

impl SupportSignature {
    /// Every cell of the mesh.
    pub fn whole_mesh(mesh: &Mesh) -> SupportSignature {
        let mut pieces: Vec<SupportPiece> = mesh
            .geo_types_per_level()
            .into_iter()
            .flat_map(|(_, types)| types)
            .map(|geo| SupportPiece { geo, profile: None })
            .collect();
        pieces.sort();
        SupportSignature { pieces }
    }

    pub fn of_step(mesh: &Mesh, step: &TimeStep) -> SupportSignature {
        if step.parts.iter().any(|p| p.disc == TypeOfField::OnNodes) {
            return SupportSignature::whole_mesh(mesh);
        }
        let mut pieces: Vec<SupportPiece> = step
            .parts
            .iter()
            .filter_map(|part| {
                let geo = part.geo?;
                // A profile selecting all cells in order is no profile.
                let profile = part.profile.as_ref().filter(|ids| {
                    ids.len() != mesh.cell_count(geo) || ids.iter().enumerate().any(|(i, id)| i != *id)
                });
                Some(SupportPiece {
                    geo,
                    profile: profile.cloned(),
                })
            })
            .collect();
        pieces.sort();
        pieces.dedup();
        SupportSignature { pieces }
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Per-step support signatures of a field, used to group fields that can be
/// shown on the same dataset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SupportComparator {
    pub steps: Vec<SupportSignature>,
}

impl SupportComparator {
    pub fn new(mesh: &Mesh, field: &FieldMultiTs) -> SupportComparator {
        SupportComparator {
            steps: field
                .steps
                .iter()
                .map(|step| SupportSignature::of_step(mesh, step))
                .collect(),
        }
    }

    pub fn is_compatible_with(&self, other: &SupportComparator) -> bool {
        self == other
    }
}
