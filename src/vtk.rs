//! In-memory model of the visualization-side datasets.

use crate::array::Attributes;
use crate::array::DataArray;
use crate::array::Values;
use std::fmt;

/// Cell type id, with the same numeric values as the pipeline uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellType(pub u8);

impl CellType {
    pub const EMPTY: CellType = CellType(0);
    pub const VERTEX: CellType = CellType(1);
    pub const POLY_VERTEX: CellType = CellType(2);
    pub const LINE: CellType = CellType(3);
    pub const POLY_LINE: CellType = CellType(4);
    pub const TRIANGLE: CellType = CellType(5);
    pub const TRIANGLE_STRIP: CellType = CellType(6);
    pub const POLYGON: CellType = CellType(7);
    pub const PIXEL: CellType = CellType(8);
    pub const QUAD: CellType = CellType(9);
    pub const TETRA: CellType = CellType(10);
    pub const VOXEL: CellType = CellType(11);
    pub const HEXAHEDRON: CellType = CellType(12);
    pub const WEDGE: CellType = CellType(13);
    pub const PYRAMID: CellType = CellType(14);
    pub const PENTAGONAL_PRISM: CellType = CellType(15);
    pub const HEXAGONAL_PRISM: CellType = CellType(16);
    pub const QUADRATIC_EDGE: CellType = CellType(21);
    pub const QUADRATIC_TRIANGLE: CellType = CellType(22);
    pub const QUADRATIC_QUAD: CellType = CellType(23);
    pub const QUADRATIC_TETRA: CellType = CellType(24);
    pub const QUADRATIC_HEXAHEDRON: CellType = CellType(25);
    pub const QUADRATIC_WEDGE: CellType = CellType(26);
    pub const QUADRATIC_PYRAMID: CellType = CellType(27);
    pub const BIQUADRATIC_QUAD: CellType = CellType(28);
    pub const TRIQUADRATIC_HEXAHEDRON: CellType = CellType(29);
    pub const QUADRATIC_LINEAR_WEDGE: CellType = CellType(31);
    pub const BIQUADRATIC_QUADRATIC_WEDGE: CellType = CellType(32);
    pub const BIQUADRATIC_TRIANGLE: CellType = CellType(34);
    pub const CUBIC_LINE: CellType = CellType(35);
    pub const QUADRATIC_POLYGON: CellType = CellType(36);
    pub const POLYHEDRON: CellType = CellType(42);
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compressed cell-to-point connectivity.
#[derive(Clone, Debug, PartialEq)]
pub struct CellArray {
    /// `offsets[i]..offsets[i + 1]` is the range of cell `i` in
    /// `connectivity`. Always holds at least one element.
    pub offsets: Vec<usize>,
    pub connectivity: Vec<i64>,
}

impl Default for CellArray {
    fn default() -> Self {
        CellArray {
            offsets: vec![0],
            connectivity: Vec::new(),
        }
    }
}

impl CellArray {
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, i: usize) -> &[i64] {
        &self.connectivity[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[i64]> + '_ {
        self.offsets
            .windows(2)
            .map(|w| &self.connectivity[w[0]..w[1]])
    }

    pub fn push<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = i64>,
    {
        self.connectivity.extend(points);
        self.offsets.push(self.connectivity.len());
    }

    /// Builds a cell array from the legacy `[n, p0, .., pn-1, n, ..]` layout.
    pub fn from_legacy(legacy: &[i64]) -> Option<CellArray> {
        let mut cells = CellArray::default();
        let mut pos = 0;
        while pos < legacy.len() {
            let n = usize::try_from(legacy[pos]).ok()?;
            let cell = legacy.get(pos + 1..pos + 1 + n)?;
            cells.push(cell.iter().copied());
            pos += n + 1;
        }
        Some(cells)
    }
}

/// Polyhedron faces, stored next to the cell array of an unstructured grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyhedronFaces {
    /// Start of the face stream of each cell in `stream`, `None` for cells
    /// that are not polyhedra.
    pub locations: Vec<Option<usize>>,
    /// Concatenated `[nbFaces, n0, ids.., n1, ids.., ..]` streams.
    pub stream: Vec<i64>,
}

impl PolyhedronFaces {
    /// The faces of cell `i`, if it is a polyhedron.
    pub fn faces(&self, i: usize) -> Option<Vec<&[i64]>> {
        let start = (*self.locations.get(i)?)?;
        let face_count = usize::try_from(*self.stream.get(start)?).ok()?;
        let mut faces = Vec::with_capacity(face_count);
        let mut pos = start + 1;
        for _ in 0..face_count {
            let n = usize::try_from(*self.stream.get(pos)?).ok()?;
            faces.push(self.stream.get(pos + 1..pos + 1 + n)?);
            pos += n + 1;
        }
        Some(faces)
    }
}

#[derive(Clone, Debug)]
pub struct UnstructuredGrid {
    /// 3-component coordinates, `F32` or `F64`.
    pub points: DataArray,
    pub cells: CellArray,
    pub types: Vec<CellType>,
    pub faces: Option<PolyhedronFaces>,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub field_data: Attributes,
}

impl Default for UnstructuredGrid {
    fn default() -> Self {
        UnstructuredGrid {
            points: DataArray::new("Points", 3, Values::F64(Vec::new())),
            cells: CellArray::default(),
            types: Vec::new(),
            faces: None,
            point_data: Attributes::default(),
            cell_data: Attributes::default(),
            field_data: Attributes::default(),
        }
    }
}

impl UnstructuredGrid {
    pub fn num_points(&self) -> usize {
        self.points.tuples()
    }

    pub fn num_cells(&self) -> usize {
        self.types.len()
    }
}

/// Surface dataset. Cell data is ordered verts, then lines, then polys, then
/// strips.
#[derive(Clone, Debug)]
pub struct PolyData {
    pub points: DataArray,
    pub verts: CellArray,
    pub lines: CellArray,
    pub polys: CellArray,
    pub strips: CellArray,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub field_data: Attributes,
}

impl Default for PolyData {
    fn default() -> Self {
        PolyData {
            points: DataArray::new("Points", 3, Values::F64(Vec::new())),
            verts: CellArray::default(),
            lines: CellArray::default(),
            polys: CellArray::default(),
            strips: CellArray::default(),
            point_data: Attributes::default(),
            cell_data: Attributes::default(),
            field_data: Attributes::default(),
        }
    }
}

impl PolyData {
    pub fn num_cells(&self) -> usize {
        self.verts.len() + self.lines.len() + self.polys.len() + self.strips.len()
    }
}

/// Axis-aligned grid given by one coordinate array per axis.
#[derive(Clone, Debug)]
pub struct RectilinearGrid {
    pub x: DataArray,
    pub y: DataArray,
    pub z: DataArray,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub field_data: Attributes,
}

impl RectilinearGrid {
    pub fn dimensions(&self) -> [usize; 3] {
        [self.x.tuples(), self.y.tuples(), self.z.tuples()]
    }
}

/// Curvilinear grid: structured topology with explicit points.
#[derive(Clone, Debug)]
pub struct StructuredGrid {
    pub dimensions: [usize; 3],
    pub points: DataArray,
    pub point_data: Attributes,
    pub cell_data: Attributes,
    pub field_data: Attributes,
}

#[derive(Clone, Debug)]
pub enum DataSet {
    Unstructured(UnstructuredGrid),
    Poly(PolyData),
    Rectilinear(RectilinearGrid),
    Structured(StructuredGrid),
}

impl DataSet {
    pub fn class_name(&self) -> &'static str {
        match self {
            DataSet::Unstructured(_) => "vtkUnstructuredGrid",
            DataSet::Poly(_) => "vtkPolyData",
            DataSet::Rectilinear(_) => "vtkRectilinearGrid",
            DataSet::Structured(_) => "vtkStructuredGrid",
        }
    }

    pub fn point_data(&self) -> &Attributes {
        match self {
            DataSet::Unstructured(ds) => &ds.point_data,
            DataSet::Poly(ds) => &ds.point_data,
            DataSet::Rectilinear(ds) => &ds.point_data,
            DataSet::Structured(ds) => &ds.point_data,
        }
    }

    pub fn point_data_mut(&mut self) -> &mut Attributes {
        match self {
            DataSet::Unstructured(ds) => &mut ds.point_data,
            DataSet::Poly(ds) => &mut ds.point_data,
            DataSet::Rectilinear(ds) => &mut ds.point_data,
            DataSet::Structured(ds) => &mut ds.point_data,
        }
    }

    pub fn cell_data(&self) -> &Attributes {
        match self {
            DataSet::Unstructured(ds) => &ds.cell_data,
            DataSet::Poly(ds) => &ds.cell_data,
            DataSet::Rectilinear(ds) => &ds.cell_data,
            DataSet::Structured(ds) => &ds.cell_data,
        }
    }

    pub fn cell_data_mut(&mut self) -> &mut Attributes {
        match self {
            DataSet::Unstructured(ds) => &mut ds.cell_data,
            DataSet::Poly(ds) => &mut ds.cell_data,
            DataSet::Rectilinear(ds) => &mut ds.cell_data,
            DataSet::Structured(ds) => &mut ds.cell_data,
        }
    }

    pub fn field_data(&self) -> &Attributes {
        match self {
            DataSet::Unstructured(ds) => &ds.field_data,
            DataSet::Poly(ds) => &ds.field_data,
            DataSet::Rectilinear(ds) => &ds.field_data,
            DataSet::Structured(ds) => &ds.field_data,
        }
    }

    pub fn field_data_mut(&mut self) -> &mut Attributes {
        match self {
            DataSet::Unstructured(ds) => &mut ds.field_data,
            DataSet::Poly(ds) => &mut ds.field_data,
            DataSet::Rectilinear(ds) => &mut ds.field_data,
            DataSet::Structured(ds) => &mut ds.field_data,
        }
    }

    pub fn num_points(&self) -> usize {
        match self {
            DataSet::Unstructured(ds) => ds.num_points(),
            DataSet::Poly(ds) => ds.points.tuples(),
            DataSet::Rectilinear(ds) => ds.dimensions().iter().product(),
            DataSet::Structured(ds) => ds.points.tuples(),
        }
    }

    pub fn num_cells(&self) -> usize {
        match self {
            DataSet::Unstructured(ds) => ds.num_cells(),
            DataSet::Poly(ds) => ds.num_cells(),
            DataSet::Rectilinear(ds) => structured_cell_count(ds.dimensions()),
            DataSet::Structured(ds) => structured_cell_count(ds.dimensions),
        }
    }

    /// Type of cell `i`, following the pipeline conventions for implicit
    /// topologies.
    pub fn cell_type(&self, i: usize) -> Option<CellType> {
        match self {
            DataSet::Unstructured(ds) => ds.types.get(i).copied(),
            DataSet::Poly(ds) => {
                let mut i = i;
                for (cells, ty) in [
                    (&ds.verts, CellType::VERTEX),
                    (&ds.lines, CellType::LINE),
                    (&ds.polys, CellType::POLYGON),
                    (&ds.strips, CellType::TRIANGLE_STRIP),
                ] {
                    if i < cells.len() {
                        return Some(ty);
                    }
                    i -= cells.len();
                }
                None
            }
            DataSet::Rectilinear(ds) => structured_cell_type(ds.dimensions()),
            DataSet::Structured(ds) => structured_cell_type(ds.dimensions),
        }
    }
}

fn structured_cell_count(dims: [usize; 3]) -> usize {
    let non_flat: Vec<usize> = dims.iter().filter(|d| **d > 1).map(|d| d - 1).collect();
    if non_flat.is_empty() {
        return 0;
    }
    non_flat.iter().product()
}

fn structured_cell_type(dims: [usize; 3]) -> Option<CellType> {
    match dims.iter().filter(|d| **d > 1).count() {
        1 => Some(CellType::LINE),
        2 => Some(CellType::QUAD),
        3 => Some(CellType::HEXAHEDRON),
        _ => None,
    }
}

/// Composite dataset. Blocks may be empty.
#[derive(Clone, Debug, Default)]
pub struct MultiBlock {
    pub blocks: Vec<Option<DataObject>>,
}

#[derive(Clone, Debug)]
pub enum DataObject {
    DataSet(DataSet),
    MultiBlock(MultiBlock),
}

impl DataObject {
    pub fn class_name(&self) -> &'static str {
        match self {
            DataObject::DataSet(ds) => ds.class_name(),
            DataObject::MultiBlock(_) => "vtkMultiBlockDataSet",
        }
    }
}

impl From<DataSet> for DataObject {
    fn from(ds: DataSet) -> Self {
        DataObject::DataSet(ds)
    }
}

impl From<UnstructuredGrid> for DataSet {
    fn from(ds: UnstructuredGrid) -> Self {
        DataSet::Unstructured(ds)
    }
}

impl From<UnstructuredGrid> for DataObject {
    fn from(ds: UnstructuredGrid) -> Self {
        DataObject::DataSet(DataSet::Unstructured(ds))
    }
}
