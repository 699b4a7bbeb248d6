//! Legacy VTK files.
//!
//! Unstructured grids and poly data are supported, one dataset per piece.
//! Field data and Gauss-point metadata have no legacy representation and
//! are neither read nor written.

use itertools::Itertools as _;
use medreader::array::Attributes;
use medreader::vtk::CellArray;
use medreader::vtk::PolyData;
use medreader::vtk::UnstructuredGrid;
use medreader::DataArray;
use medreader::DataObject;
use medreader::DataSet;
use medreader::Values;
use std::fmt;
use std::io;
use vtkio::model::Attribute;
use vtkio::model::ByteOrder;
use vtkio::model::CellType;
use vtkio::model::Cells;
use vtkio::model::ElementType;
use vtkio::model::FieldArray;
use vtkio::model::IOBuffer;
use vtkio::model::Piece;
use vtkio::model::PolyDataPiece;
use vtkio::model::UnstructuredGridPiece;
use vtkio::model::Version;
use vtkio::model::VertexNumbers;
use vtkio::Vtk;

/// Legacy `SCALARS` hold at most this many components. Wider arrays are
/// written as field arrays.
const MAX_SCALAR_COMPONENTS: usize = 4;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Vtkio(vtkio::Error),

    /// The file holds a dataset kind with no counterpart.
    UnsupportedDataSet(&'static str),

    /// Pieces stored in other files.
    ExternalPiece,

    /// Points are not 3-component reals.
    BadPoints,

    UnsupportedCellType(u8),

    BadConnectivity,

    /// Indices do not fit the legacy 32-bit layout.
    TooLarge,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Vtkio(err) => write!(f, "vtkio: {err}"),
            Error::UnsupportedDataSet(kind) => write!(f, "unsupported dataset kind {kind}"),
            Error::ExternalPiece => write!(f, "pieces stored in external files are not supported"),
            Error::BadPoints => write!(f, "points must be 3-component float or double values"),
            Error::UnsupportedCellType(ct) => write!(f, "unsupported cell type {ct}"),
            Error::BadConnectivity => write!(f, "malformed cell connectivity"),
            Error::TooLarge => write!(f, "dataset too large for the legacy format"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Vtkio(err) => Some(err),
            _ => None,
        }
    }
}

impl From<vtkio::Error> for Error {
    fn from(err: vtkio::Error) -> Error {
        Error::Vtkio(err)
    }
}

pub fn test_format_legacy(header: &[u8]) -> bool {
    let header_start = match header.iter().position(|b| *b == b'#') {
        Some(v) => v,
        None => return false,
    };
    if !header[..header_start].iter().all(u8::is_ascii_whitespace) {
        return false;
    }
    let header = &header[header_start..];
    let header_end = header.iter().position(|b| *b == b'\n').unwrap_or(header.len());
    match std::str::from_utf8(&header[..header_end]) {
        Ok(header) => header.starts_with("# vtk DataFile"),
        Err(_) => false,
    }
}

/// Parses a legacy file. A single piece gives a dataset, several pieces a
/// multi-block with one block each.
pub fn parse_legacy<R: io::Read>(input: R) -> Result<DataObject, Error> {
    let vtk = Vtk::parse_legacy_be(input)?;
    from_vtk(vtk)
}

pub fn from_vtk(vtk: Vtk) -> Result<DataObject, Error> {
    let mut datasets: Vec<DataSet> = match vtk.data {
        vtkio::model::DataSet::UnstructuredGrid { pieces, .. } => pieces
            .into_iter()
            .map(|piece| Ok(DataSet::Unstructured(unstructured_grid(*inline(piece)?)?)))
            .collect::<Result<_, Error>>()?,
        vtkio::model::DataSet::PolyData { pieces, .. } => pieces
            .into_iter()
            .map(|piece| Ok(DataSet::Poly(poly_data(*inline(piece)?)?)))
            .collect::<Result<_, Error>>()?,
        vtkio::model::DataSet::ImageData { .. } => return Err(Error::UnsupportedDataSet("ImageData")),
        vtkio::model::DataSet::StructuredGrid { .. } => {
            return Err(Error::UnsupportedDataSet("StructuredGrid"))
        }
        vtkio::model::DataSet::RectilinearGrid { .. } => {
            return Err(Error::UnsupportedDataSet("RectilinearGrid"))
        }
        vtkio::model::DataSet::Field { .. } => return Err(Error::UnsupportedDataSet("Field")),
    };
    if datasets.len() == 1 {
        if let Some(dataset) = datasets.pop() {
            return Ok(DataObject::DataSet(dataset));
        }
    }
    Ok(DataObject::MultiBlock(medreader::vtk::MultiBlock {
        blocks: datasets.into_iter().map(|ds| Some(DataObject::DataSet(ds))).collect(),
    }))
}

/// Writes a dataset in the big-endian binary legacy format.
pub fn write_legacy<W: io::Write>(dataset: &DataSet, title: &str, output: W) -> Result<(), Error> {
    let data = match dataset {
        DataSet::Unstructured(grid) => vtkio::model::DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(unstructured_piece(grid)?))],
        },
        DataSet::Poly(poly) => vtkio::model::DataSet::PolyData {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(poly_piece(poly)?))],
        },
        other => return Err(Error::UnsupportedDataSet(other.class_name())),
    };
    let vtk = Vtk {
        version: Version::new((4, 2)),
        title: title.to_string(),
        byte_order: ByteOrder::BigEndian,
        file_path: None,
        data,
    };
    vtk.write_legacy(output)?;
    Ok(())
}

fn inline<P>(piece: Piece<P>) -> Result<Box<P>, Error> {
    match piece {
        Piece::Inline(piece) => Ok(piece),
        _ => Err(Error::ExternalPiece),
    }
}

fn unstructured_grid(piece: UnstructuredGridPiece) -> Result<UnstructuredGrid, Error> {
    let points = points(piece.points)?;
    let cells = cell_array(piece.cells.cell_verts)?;
    if cells.len() != piece.cells.types.len() {
        return Err(Error::BadConnectivity);
    }
    Ok(UnstructuredGrid {
        points,
        cells,
        types: piece
            .cells
            .types
            .iter()
            .map(|ct| medreader::vtk::CellType(*ct as u8))
            .collect(),
        faces: None,
        point_data: attributes(piece.data.point),
        cell_data: attributes(piece.data.cell),
        field_data: Attributes::default(),
    })
}

fn poly_data(piece: PolyDataPiece) -> Result<PolyData, Error> {
    let topology = |numbers: Option<VertexNumbers>| match numbers {
        Some(numbers) => cell_array(numbers),
        None => Ok(CellArray::default()),
    };
    Ok(PolyData {
        points: points(piece.points)?,
        verts: topology(piece.verts)?,
        lines: topology(piece.lines)?,
        polys: topology(piece.polys)?,
        strips: topology(piece.strips)?,
        point_data: attributes(piece.data.point),
        cell_data: attributes(piece.data.cell),
        field_data: Attributes::default(),
    })
}

fn points(buffer: IOBuffer) -> Result<DataArray, Error> {
    let values = match buffer {
        IOBuffer::F32(v) => Values::F32(v),
        IOBuffer::F64(v) => Values::F64(v),
        _ => return Err(Error::BadPoints),
    };
    if values.len() % 3 != 0 {
        return Err(Error::BadPoints);
    }
    Ok(DataArray::new("Points", 3, values))
}

fn cell_array(numbers: VertexNumbers) -> Result<CellArray, Error> {
    let (_, legacy) = numbers.into_legacy();
    let legacy = legacy.into_iter().map(i64::from).collect_vec();
    CellArray::from_legacy(&legacy).ok_or(Error::BadConnectivity)
}

fn values(buffer: IOBuffer) -> Values {
    match buffer {
        IOBuffer::Bit(v) | IOBuffer::U8(v) => Values::U8(v),
        IOBuffer::I8(v) => Values::I8(v),
        IOBuffer::U16(v) => Values::U16(v),
        IOBuffer::I16(v) => Values::I16(v),
        IOBuffer::U32(v) => Values::U32(v),
        IOBuffer::I32(v) => Values::I32(v),
        IOBuffer::U64(v) => Values::U64(v),
        IOBuffer::I64(v) => Values::I64(v),
        IOBuffer::F32(v) => Values::F32(v),
        IOBuffer::F64(v) => Values::F64(v),
    }
}

fn io_buffer(values: &Values) -> IOBuffer {
    match values {
        Values::U8(v) => IOBuffer::U8(v.clone()),
        Values::I8(v) => IOBuffer::I8(v.clone()),
        Values::U16(v) => IOBuffer::U16(v.clone()),
        Values::I16(v) => IOBuffer::I16(v.clone()),
        Values::U32(v) => IOBuffer::U32(v.clone()),
        Values::I32(v) => IOBuffer::I32(v.clone()),
        Values::U64(v) => IOBuffer::U64(v.clone()),
        Values::I64(v) | Values::Id(v) => IOBuffer::I64(v.clone()),
        Values::F32(v) => IOBuffer::F32(v.clone()),
        Values::F64(v) => IOBuffer::F64(v.clone()),
    }
}

fn attributes(attributes: Vec<Attribute>) -> Attributes {
    let mut out = Attributes::default();
    for attribute in attributes {
        match attribute {
            Attribute::DataArray(array) => {
                let components = array.num_comp();
                out.add(DataArray::new(array.name, components, values(array.data)));
            }
            Attribute::Field { data_array, .. } => {
                for array in data_array {
                    let components = array.num_comp();
                    out.add(DataArray::new(array.name, components, values(array.data)));
                }
            }
        }
    }
    out
}

fn vtk_attributes(attributes: &Attributes) -> Vec<Attribute> {
    let (scalars, wide): (Vec<_>, Vec<_>) = attributes
        .iter()
        .filter(|array| !array.info.hidden)
        .partition(|array| array.components <= MAX_SCALAR_COMPONENTS);
    let mut out = scalars
        .into_iter()
        .map(|array| {
            Attribute::DataArray(vtkio::model::DataArray {
                name: array.name.clone(),
                elem: ElementType::Scalars {
                    num_comp: array.components as u32,
                    lookup_table: None,
                },
                data: io_buffer(&array.values),
            })
        })
        .collect_vec();
    if !wide.is_empty() {
        out.push(Attribute::Field {
            name: "FieldData".to_string(),
            data_array: wide
                .into_iter()
                .map(|array| FieldArray {
                    name: array.name.clone(),
                    elem: array.components as u32,
                    data: io_buffer(&array.values),
                })
                .collect(),
        });
    }
    out
}

fn vertex_numbers(cells: &CellArray) -> Result<VertexNumbers, Error> {
    let num_cells = u32::try_from(cells.len()).map_err(|_| Error::TooLarge)?;
    let mut vertices = Vec::with_capacity(cells.connectivity.len() + cells.len());
    for cell in cells.iter() {
        vertices.push(u32::try_from(cell.len()).map_err(|_| Error::TooLarge)?);
        for point in cell {
            vertices.push(u32::try_from(*point).map_err(|_| Error::TooLarge)?);
        }
    }
    Ok(VertexNumbers::Legacy {
        num_cells,
        vertices,
    })
}

fn vtk_cell_type(ct: medreader::vtk::CellType) -> Result<CellType, Error> {
    const KNOWN: [CellType; 23] = [
        CellType::Vertex,
        CellType::PolyVertex,
        CellType::Line,
        CellType::PolyLine,
        CellType::Triangle,
        CellType::TriangleStrip,
        CellType::Polygon,
        CellType::Pixel,
        CellType::Quad,
        CellType::Tetra,
        CellType::Voxel,
        CellType::Hexahedron,
        CellType::Wedge,
        CellType::Pyramid,
        CellType::QuadraticEdge,
        CellType::QuadraticTriangle,
        CellType::QuadraticQuad,
        CellType::QuadraticTetra,
        CellType::QuadraticHexahedron,
        CellType::QuadraticWedge,
        CellType::QuadraticPyramid,
        CellType::BiquadraticQuad,
        CellType::TriquadraticHexahedron,
    ];
    KNOWN
        .iter()
        .copied()
        .find(|known| *known as u8 == ct.0)
        .ok_or(Error::UnsupportedCellType(ct.0))
}

fn unstructured_piece(grid: &UnstructuredGrid) -> Result<UnstructuredGridPiece, Error> {
    let types = grid
        .types
        .iter()
        .map(|ct| vtk_cell_type(*ct))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(UnstructuredGridPiece {
        points: io_buffer(&grid.points.values),
        cells: Cells {
            cell_verts: vertex_numbers(&grid.cells)?,
            types,
        },
        data: vtkio::model::Attributes {
            point: vtk_attributes(&grid.point_data),
            cell: vtk_attributes(&grid.cell_data),
        },
    })
}

fn poly_piece(poly: &PolyData) -> Result<PolyDataPiece, Error> {
    let topology = |cells: &CellArray| -> Result<Option<VertexNumbers>, Error> {
        if cells.is_empty() {
            Ok(None)
        } else {
            vertex_numbers(cells).map(Some)
        }
    };
    Ok(PolyDataPiece {
        points: io_buffer(&poly.points.values),
        verts: topology(&poly.verts)?,
        lines: topology(&poly.lines)?,
        polys: topology(&poly.polys)?,
        strips: topology(&poly.strips)?,
        data: vtkio::model::Attributes {
            point: vtk_attributes(&poly.point_data),
            cell: vtk_attributes(&poly.cell_data),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "# vtk DataFile Version 2.0
tetra
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 4 double
0 0 0
1 0 0
0 1 0
0 0 1
CELLS 1 5
4 0 1 2 3
CELL_TYPES 1
10
POINT_DATA 4
SCALARS temp double 1
LOOKUP_TABLE default
1 2 3 4
";

    fn tetra() -> UnstructuredGrid {
        match parse_legacy(TETRA.as_bytes()).unwrap() {
            DataObject::DataSet(DataSet::Unstructured(grid)) => grid,
            other => panic!("unexpected {}", other.class_name()),
        }
    }

    #[test]
    fn test_format_detection() {
        assert!(test_format_legacy(TETRA.as_bytes()));
        assert!(test_format_legacy(b"  \n# vtk DataFile Version 3.0"));
        assert!(!test_format_legacy(b"MeshVersionFormatted 2"));
        assert!(!test_format_legacy(b"junk # vtk DataFile"));
    }

    #[test]
    fn test_parse_tetra() {
        let grid = tetra();
        assert_eq!(grid.num_points(), 4);
        assert_eq!(grid.types, vec![medreader::vtk::CellType::TETRA]);
        assert_eq!(grid.cells.cell(0), &[0, 1, 2, 3]);
        let temp = grid.point_data.get("temp").unwrap();
        assert_eq!(temp.values, Values::F64(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_write_then_parse() {
        let grid = tetra();
        let mut buffer = Vec::new();
        write_legacy(&DataSet::Unstructured(grid.clone()), "tetra", &mut buffer).unwrap();
        let parsed = match parse_legacy(buffer.as_slice()).unwrap() {
            DataObject::DataSet(DataSet::Unstructured(grid)) => grid,
            other => panic!("unexpected {}", other.class_name()),
        };
        assert_eq!(parsed.points.values, grid.points.values);
        assert_eq!(parsed.cells, grid.cells);
        assert_eq!(parsed.types, grid.types);
    }

    #[test]
    fn test_unsupported_cell_type() {
        let mut grid = tetra();
        grid.types[0] = medreader::vtk::CellType::POLYHEDRON;
        let err = write_legacy(&DataSet::Unstructured(grid), "poly", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCellType(42)));
    }
}
