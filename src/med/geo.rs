use crate::vtk::CellType;
use std::fmt;

/// Geometric cell types, declared in the order cells are stored in a MED
/// file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeoType {
    Point1,
    Seg2,
    Seg3,
    Seg4,
    Tri3,
    Quad4,
    Tri6,
    Tri7,
    Quad8,
    Quad9,
    Polygon,
    QPolyg,
    Tetra4,
    Pyra5,
    Penta6,
    Hexa8,
    HexGp12,
    Tetra10,
    Pyra13,
    Penta15,
    Penta18,
    Hexa20,
    Hexa27,
    Polyhed,
}

pub const ALL: [GeoType; 24] = [
    GeoType::Point1,
    GeoType::Seg2,
    GeoType::Seg3,
    GeoType::Seg4,
    GeoType::Tri3,
    GeoType::Quad4,
    GeoType::Tri6,
    GeoType::Tri7,
    GeoType::Quad8,
    GeoType::Quad9,
    GeoType::Polygon,
    GeoType::QPolyg,
    GeoType::Tetra4,
    GeoType::Pyra5,
    GeoType::Penta6,
    GeoType::Hexa8,
    GeoType::HexGp12,
    GeoType::Tetra10,
    GeoType::Pyra13,
    GeoType::Penta15,
    GeoType::Penta18,
    GeoType::Hexa20,
    GeoType::Hexa27,
    GeoType::Polyhed,
];

const TETRA_FACES: &[&[usize]] = &[&[0, 1, 2], &[0, 3, 1], &[1, 3, 2], &[2, 3, 0]];
const PYRA_FACES: &[&[usize]] = &[
    &[0, 1, 2, 3],
    &[0, 4, 1],
    &[1, 4, 2],
    &[2, 4, 3],
    &[3, 4, 0],
];
const PENTA_FACES: &[&[usize]] = &[
    &[0, 1, 2],
    &[3, 5, 4],
    &[0, 3, 4, 1],
    &[1, 4, 5, 2],
    &[2, 5, 3, 0],
];
const HEXA_FACES: &[&[usize]] = &[
    &[0, 1, 2, 3],
    &[4, 7, 6, 5],
    &[0, 4, 5, 1],
    &[1, 5, 6, 2],
    &[2, 6, 7, 3],
    &[3, 7, 4, 0],
];
const HEXGP_FACES: &[&[usize]] = &[
    &[0, 1, 2, 3, 4, 5],
    &[6, 11, 10, 9, 8, 7],
    &[0, 6, 7, 1],
    &[1, 7, 8, 2],
    &[2, 8, 9, 3],
    &[3, 9, 10, 4],
    &[4, 10, 11, 5],
    &[5, 11, 6, 0],
];

impl GeoType {
    /// Dimension of the reference element.
    pub fn dimension(self) -> usize {
        match self {
            GeoType::Point1 => 0,
            GeoType::Seg2 | GeoType::Seg3 | GeoType::Seg4 => 1,
            GeoType::Tri3
            | GeoType::Quad4
            | GeoType::Tri6
            | GeoType::Tri7
            | GeoType::Quad8
            | GeoType::Quad9
            | GeoType::Polygon
            | GeoType::QPolyg => 2,
            _ => 3,
        }
    }

    /// Node count, `None` for polygons and polyhedra.
    pub fn node_count(self) -> Option<usize> {
        Some(match self {
            GeoType::Point1 => 1,
            GeoType::Seg2 => 2,
            GeoType::Seg3 => 3,
            GeoType::Seg4 => 4,
            GeoType::Tri3 => 3,
            GeoType::Quad4 => 4,
            GeoType::Tri6 => 6,
            GeoType::Tri7 => 7,
            GeoType::Quad8 => 8,
            GeoType::Quad9 => 9,
            GeoType::Tetra4 => 4,
            GeoType::Pyra5 => 5,
            GeoType::Penta6 => 6,
            GeoType::Hexa8 => 8,
            GeoType::HexGp12 => 12,
            GeoType::Tetra10 => 10,
            GeoType::Pyra13 => 13,
            GeoType::Penta15 => 15,
            GeoType::Penta18 => 18,
            GeoType::Hexa20 => 20,
            GeoType::Hexa27 => 27,
            GeoType::Polygon | GeoType::QPolyg | GeoType::Polyhed => return None,
        })
    }

    pub fn is_dynamic(self) -> bool {
        self.node_count().is_none()
    }

    /// The linear type sharing the same corners.
    pub fn linear(self) -> GeoType {
        match self {
            GeoType::Seg3 | GeoType::Seg4 => GeoType::Seg2,
            GeoType::Tri6 | GeoType::Tri7 => GeoType::Tri3,
            GeoType::Quad8 | GeoType::Quad9 => GeoType::Quad4,
            GeoType::QPolyg => GeoType::Polygon,
            GeoType::Tetra10 => GeoType::Tetra4,
            GeoType::Pyra13 => GeoType::Pyra5,
            GeoType::Penta15 | GeoType::Penta18 => GeoType::Penta6,
            GeoType::Hexa20 | GeoType::Hexa27 => GeoType::Hexa8,
            other => other,
        }
    }

    /// Number of leading nodes that are corners, for static types.
    pub fn corner_count(self) -> Option<usize> {
        self.linear().node_count()
    }

    /// Faces of the linear counterpart, as local corner indices.
    pub fn faces(self) -> Option<&'static [&'static [usize]]> {
        match self.linear() {
            GeoType::Tetra4 => Some(TETRA_FACES),
            GeoType::Pyra5 => Some(PYRA_FACES),
            GeoType::Penta6 => Some(PENTA_FACES),
            GeoType::Hexa8 => Some(HEXA_FACES),
            GeoType::HexGp12 => Some(HEXGP_FACES),
            _ => None,
        }
    }

    /// Measure of the reference element.
    pub fn reference_measure(self) -> f64 {
        match self.linear() {
            GeoType::Seg2 => 2.0,
            GeoType::Tri3 => 0.5,
            GeoType::Quad4 => 4.0,
            GeoType::Tetra4 => 1.0 / 6.0,
            GeoType::Pyra5 => 2.0 / 3.0,
            GeoType::Penta6 => 1.0,
            GeoType::Hexa8 => 8.0,
            _ => 1.0,
        }
    }

    pub fn repr(self) -> &'static str {
        match self {
            GeoType::Point1 => "NORM_POINT1",
            GeoType::Seg2 => "NORM_SEG2",
            GeoType::Seg3 => "NORM_SEG3",
            GeoType::Seg4 => "NORM_SEG4",
            GeoType::Tri3 => "NORM_TRI3",
            GeoType::Quad4 => "NORM_QUAD4",
            GeoType::Tri6 => "NORM_TRI6",
            GeoType::Tri7 => "NORM_TRI7",
            GeoType::Quad8 => "NORM_QUAD8",
            GeoType::Quad9 => "NORM_QUAD9",
            GeoType::Polygon => "NORM_POLYGON",
            GeoType::QPolyg => "NORM_QPOLYG",
            GeoType::Tetra4 => "NORM_TETRA4",
            GeoType::Pyra5 => "NORM_PYRA5",
            GeoType::Penta6 => "NORM_PENTA6",
            GeoType::Hexa8 => "NORM_HEXA8",
            GeoType::HexGp12 => "NORM_HEXGP12",
            GeoType::Tetra10 => "NORM_TETRA10",
            GeoType::Pyra13 => "NORM_PYRA13",
            GeoType::Penta15 => "NORM_PENTA15",
            GeoType::Penta18 => "NORM_PENTA18",
            GeoType::Hexa20 => "NORM_HEXA20",
            GeoType::Hexa27 => "NORM_HEXA27",
            GeoType::Polyhed => "NORM_POLYHED",
        }
    }

    pub fn vtk(self) -> CellType {
        match self {
            GeoType::Point1 => CellType::VERTEX,
            GeoType::Seg2 => CellType::LINE,
            GeoType::Seg3 => CellType::QUADRATIC_EDGE,
            GeoType::Seg4 => CellType::CUBIC_LINE,
            GeoType::Tri3 => CellType::TRIANGLE,
            GeoType::Quad4 => CellType::QUAD,
            GeoType::Tri6 => CellType::QUADRATIC_TRIANGLE,
            GeoType::Tri7 => CellType::BIQUADRATIC_TRIANGLE,
            GeoType::Quad8 => CellType::QUADRATIC_QUAD,
            GeoType::Quad9 => CellType::BIQUADRATIC_QUAD,
            GeoType::Polygon => CellType::POLYGON,
            GeoType::QPolyg => CellType::QUADRATIC_POLYGON,
            GeoType::Tetra4 => CellType::TETRA,
            GeoType::Pyra5 => CellType::PYRAMID,
            GeoType::Penta6 => CellType::WEDGE,
            GeoType::Hexa8 => CellType::HEXAHEDRON,
            GeoType::HexGp12 => CellType::HEXAGONAL_PRISM,
            GeoType::Tetra10 => CellType::QUADRATIC_TETRA,
            GeoType::Pyra13 => CellType::QUADRATIC_PYRAMID,
            GeoType::Penta15 => CellType::QUADRATIC_WEDGE,
            GeoType::Penta18 => CellType::BIQUADRATIC_QUADRATIC_WEDGE,
            GeoType::Hexa20 => CellType::QUADRATIC_HEXAHEDRON,
            GeoType::Hexa27 => CellType::TRIQUADRATIC_HEXAHEDRON,
            GeoType::Polyhed => CellType::POLYHEDRON,
        }
    }

    /// Inverse of [`GeoType::vtk`]. Poly-vertices map to points; callers
    /// check they hold a single point.
    pub fn from_vtk(cell_type: CellType) -> Option<GeoType> {
        if cell_type == CellType::POLY_VERTEX {
            return Some(GeoType::Point1);
        }
        ALL.iter().copied().find(|geo| geo.vtk() == cell_type)
    }
}

impl fmt::Display for GeoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.repr())
    }
}
