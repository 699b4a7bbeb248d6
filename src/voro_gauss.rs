//! Gauss point fields as cell fields on the Voronoi cells of the Gauss
//! points.
//!
//! Every cell of the input is split into one Voronoi cell per Gauss point.
//! The value of a Gauss point field on Gauss point `k` of a cell becomes the
//! value on the `k`-th cell the input cell was split into. Plain cell fields
//! are copied onto every piece of their cell.

use crate::array;
use crate::array::DataArray;
use crate::array::QuadratureDictionary;
use crate::convert;
use crate::convert::CellSink;
use crate::med::GeoType;
use crate::registry::GaussData;
use crate::registry::Registry;
use crate::shape;
use crate::shape::ShapeFunctions;
use crate::tiny_info;
use crate::tiny_info::fill_adv_info_from;
use crate::voronoi;
use crate::voronoi::voronoize;
use crate::voronoi::Point3D;
use crate::voronoi::Region;
use crate::vtk::CellType;
use crate::vtk::DataObject;
use crate::vtk::DataSet;
use crate::vtk::UnstructuredGrid;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Marker of the offsets arrays of Gauss point fields.
const ELGA_PREFIX: &str = "ELGA@";

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The input is neither an unstructured grid nor a multi-block holding
    /// exactly one.
    UnsupportedInput(&'static str),

    /// No Gauss localization was published.
    NoAdvancedGaussInfo,

    /// No field data array refers to Gauss point offsets.
    NoGaussField,

    /// Gauss point fields refer to different offsets arrays.
    SeveralOffsetsArrays(Vec<String>),

    /// The offsets array is not among the cell arrays.
    MissingOffsets(String),

    /// The offsets array is not id-typed or has no quadrature definitions.
    BadOffsets(String),

    /// No quadrature definition for the type of a cell.
    NoGaussInfoForCell { cell: usize, cell_type: CellType },

    /// Gauss point fields sharing offsets must have the same tuple count.
    TupleCountMismatch {
        array: String,
        expected: usize,
        actual: usize,
    },

    /// The Gauss points of a cell lie past the end of a field.
    OffsetOutOfRange { cell: usize },

    /// A cell refers to a point that doesn't exist.
    BadConnectivity { cell: usize },

    /// The number of nodes of a cell doesn't match its localization.
    NodeCountMismatch { cell: usize, expected: usize, actual: usize },

    Array(array::Error),
    Convert(convert::Error),
    Shape(shape::Error),
    TinyInfo(tiny_info::Error),
    Voronoi { cell: usize, source: voronoi::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedInput(class) => write!(
                f,
                "input of type {class} not supported, expected an unstructured grid"
            ),
            Error::NoAdvancedGaussInfo => write!(f, "no advanced gauss info found"),
            Error::NoGaussField => write!(f, "no Gauss points fields found"),
            Error::SeveralOffsetsArrays(names) => write!(
                f,
                "Gauss point fields refer to several offsets arrays: {}",
                names.join(", ")
            ),
            Error::MissingOffsets(name) => write!(f, "no cell array named {name:?}"),
            Error::BadOffsets(name) => {
                write!(f, "cell array {name:?} is not a Gauss points offsets array")
            }
            Error::NoGaussInfoForCell { cell, cell_type } => write!(
                f,
                "For cell {cell} of type {cell_type} no Gauss info attached"
            ),
            Error::TupleCountMismatch {
                array,
                expected,
                actual,
            } => write!(
                f,
                "array {array:?} has {actual} tuples, other Gauss point fields have {expected}"
            ),
            Error::OffsetOutOfRange { cell } => {
                write!(f, "Gauss points of cell {cell} are out of the fields range")
            }
            Error::BadConnectivity { cell } => write!(f, "cell {cell} refers to a missing point"),
            Error::NodeCountMismatch {
                cell,
                expected,
                actual,
            } => write!(
                f,
                "cell {cell} has {actual} nodes, its localization has {expected}"
            ),
            Error::Array(err) => write!(f, "{err}"),
            Error::Convert(err) => write!(f, "{err}"),
            Error::Shape(err) => write!(f, "{err}"),
            Error::TinyInfo(err) => write!(f, "{err}"),
            Error::Voronoi { cell, source } => write!(f, "cell {cell}: {source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Array(err) => Some(err),
            Error::Convert(err) => Some(err),
            Error::Shape(err) => Some(err),
            Error::TinyInfo(err) => Some(err),
            Error::Voronoi { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<array::Error> for Error {
    fn from(err: array::Error) -> Self {
        Error::Array(err)
    }
}

impl From<convert::Error> for Error {
    fn from(err: convert::Error) -> Self {
        Error::Convert(err)
    }
}

impl From<shape::Error> for Error {
    fn from(err: shape::Error) -> Self {
        Error::Shape(err)
    }
}

impl From<tiny_info::Error> for Error {
    fn from(err: tiny_info::Error) -> Self {
        Error::TinyInfo(err)
    }
}

/// Splits cells around their Gauss points.
///
/// # Example
///
/// ```rust,no_run
/// # fn main() -> Result<(), medreader::voro_gauss::Error> {
/// # let input: medreader::vtk::DataObject = unimplemented!();
/// # let registry = medreader::registry::Registry::default();
/// use medreader::voro_gauss::VoroGauss;
///
/// let output = VoroGauss::default().run(&input, &registry)?;
/// println!("{} Voronoi cells", output.num_cells());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct VoroGauss {
    /// Distance under which two points are merged.
    pub tolerance: f64,
}

impl Default for VoroGauss {
    fn default() -> Self {
        VoroGauss { tolerance: 1e-12 }
    }
}

/// Localization of a cell type in physical terms.
struct Scheme {
    shape: ShapeFunctions,
    dim: usize,
    gauss_coords: Vec<f64>,
    points: usize,
}

impl VoroGauss {
    pub fn run(&self, input: &DataObject, registry: &Registry) -> Result<UnstructuredGrid, Error> {
        let _enter = tracing::info_span!("voro_gauss").entered();

        let grid = single_grid(input)?;
        let payload = registry
            .get::<GaussData>()
            .ok_or(Error::NoAdvancedGaussInfo)?;

        let gauss_arrays: Vec<&Arc<DataArray>> = grid
            .field_data
            .iter()
            .filter(|a| is_gauss_array(a))
            .collect();
        let offsets_names: BTreeSet<&str> = gauss_arrays
            .iter()
            .filter_map(|a| a.info.offsets_name.as_deref())
            .collect();
        let offsets_name = match offsets_names.len() {
            0 => return Err(Error::NoGaussField),
            1 => offsets_names.iter().next().copied().unwrap_or_default(),
            _ => {
                return Err(Error::SeveralOffsetsArrays(
                    offsets_names.iter().map(|s| s.to_string()).collect(),
                ))
            }
        };
        let offsets_array = grid
            .cell_data
            .get(offsets_name)
            .ok_or_else(|| Error::MissingOffsets(offsets_name.to_string()))?;
        let offsets = offsets_array
            .values
            .as_id()
            .ok_or_else(|| Error::BadOffsets(offsets_name.to_string()))?;
        let dictionary = offsets_array
            .info
            .quadrature
            .as_deref()
            .ok_or_else(|| Error::BadOffsets(offsets_name.to_string()))?;
        if offsets.len() != grid.num_cells() {
            return Err(Error::BadOffsets(offsets_name.to_string()));
        }

        let schemes = schemes(grid, dictionary, payload)?;
        let coords = grid
            .points
            .values
            .to_f64()
            .ok_or(Error::UnsupportedInput("non numeric points"))?;

        // Cells by dimension, lower first, input order within a dimension.
        let mut order: Vec<(usize, usize)> = Vec::with_capacity(grid.num_cells());
        for (cell, ct) in grid.types.iter().enumerate() {
            let geo = GeoType::from_vtk(*ct).ok_or(Error::Convert(
                convert::Error::UnrecognizedCellType {
                    pos: cell,
                    cell_type: *ct,
                },
            ))?;
            order.push((geo.dimension(), cell));
        }
        order.sort_by_key(|(dim, _)| *dim);

        let pieces: Vec<Vec<Region>> = order
            .par_iter()
            .map(|(_, cell)| {
                let cell = *cell;
                let ct = grid.types[cell];
                let scheme = schemes
                    .get(&ct)
                    .ok_or(Error::NoGaussInfoForCell { cell, cell_type: ct })?;
                self.split_cell(grid, &coords, cell, scheme)
            })
            .collect::<Result<_, Error>>()?;

        // Output cell -> (source cell, Gauss point tuple).
        let mut sources = Vec::new();
        let mut gauss_tuples = Vec::new();
        let mut sink = CellSink::default();
        let mut points: Vec<f64> = Vec::new();
        for ((_, cell), regions) in order.iter().zip(&pieces) {
            let first = usize::try_from(offsets[*cell])
                .map_err(|_| Error::BadOffsets(offsets_name.to_string()))?;
            for (k, region) in regions.iter().enumerate() {
                self.push_region(&mut sink, &mut points, region)?;
                sources.push(*cell);
                gauss_tuples.push(first + k);
            }
        }
        tracing::debug!(
            input_cells = grid.num_cells(),
            output_cells = sink.len(),
            "voronoized"
        );

        let mut output = sink.into_grid(points);
        let mut expected_tuples = None;
        for array in &gauss_arrays {
            let tuples = array.tuples();
            match expected_tuples {
                None => expected_tuples = Some(tuples),
                Some(expected) if expected != tuples => {
                    return Err(Error::TupleCountMismatch {
                        array: array.name.clone(),
                        expected,
                        actual: tuples,
                    })
                }
                Some(_) => {}
            }
            if let Some(pos) = gauss_tuples.iter().position(|t| *t >= tuples) {
                return Err(Error::OffsetOutOfRange { cell: sources[pos] });
            }
            let mut cell_array = array.select_tuples(&gauss_tuples)?;
            cell_array.info = Default::default();
            output.cell_data.add(cell_array);
        }
        for array in grid.cell_data.iter() {
            if array.name == offsets_name || array.info.elga {
                continue;
            }
            output.cell_data.add(array.select_tuples(&sources)?);
        }
        for array in grid.field_data.iter().filter(|a| !is_gauss_array(a)) {
            output.field_data.add(Arc::clone(array));
        }
        Ok(output)
    }

    fn split_cell(
        &self,
        grid: &UnstructuredGrid,
        coords: &[f64],
        cell: usize,
        scheme: &Scheme,
    ) -> Result<Vec<Region>, Error> {
        let ct = grid.types[cell];
        let geo = GeoType::from_vtk(ct).ok_or(Error::NoGaussInfoForCell { cell, cell_type: ct })?;
        let nodes: Vec<Point3D> = grid
            .cells
            .cell(cell)
            .iter()
            .map(|&n| {
                let n = usize::try_from(n).map_err(|_| Error::BadConnectivity { cell })?;
                let p = coords
                    .get(3 * n..3 * n + 3)
                    .ok_or(Error::BadConnectivity { cell })?;
                Ok(Point3D::new(p[0], p[1], p[2]))
            })
            .collect::<Result<_, Error>>()?;
        if nodes.len() != scheme.shape.node_count() {
            return Err(Error::NodeCountMismatch {
                cell,
                expected: scheme.shape.node_count(),
                actual: nodes.len(),
            });
        }
        let seeds: Vec<Point3D> = (0..scheme.points)
            .map(|g| {
                let point = match scheme.dim {
                    0 => &[][..],
                    dim => &scheme.gauss_coords[g * dim..(g + 1) * dim],
                };
                scheme
                    .shape
                    .eval(point)
                    .iter()
                    .zip(&nodes)
                    .map(|(weight, node)| node * *weight)
                    .sum::<Point3D>()
            })
            .collect();
        let region =
            Region::from_cell(geo, &nodes).map_err(|source| Error::Voronoi { cell, source })?;
        voronoize(&region, &seeds, self.tolerance).map_err(|source| Error::Voronoi { cell, source })
    }

    fn push_region(
        &self,
        sink: &mut CellSink,
        points: &mut Vec<f64>,
        region: &Region,
    ) -> Result<(), Error> {
        let first = (points.len() / 3) as i64;
        let tolerance = self.tolerance;
        // Ids are given while merging coincident vertices of the region.
        let mut vertices: Vec<Point3D> = Vec::new();
        let mut id_of = |p: &Point3D| -> i64 {
            let local = match vertices.iter().position(|v| (v - p).norm() <= tolerance) {
                Some(local) => local,
                None => {
                    vertices.push(*p);
                    vertices.len() - 1
                }
            };
            first + local as i64
        };
        match region {
            Region::Segment(a, b) => {
                let ids = [id_of(a), id_of(b)];
                sink.push(GeoType::Seg2, &ids)?;
            }
            Region::Polygon(corners) => {
                let ids: Vec<i64> = corners.iter().map(&mut id_of).collect();
                sink.push(GeoType::Polygon, &ids)?;
            }
            Region::Polyhedron(faces) => {
                let mut ids = Vec::new();
                for (i, face) in faces.iter().enumerate() {
                    if i > 0 {
                        ids.push(-1);
                    }
                    ids.extend(face.iter().map(&mut id_of));
                }
                sink.push(GeoType::Polyhed, &ids)?;
            }
        }
        points.extend(vertices.iter().flat_map(|p| [p.x, p.y, p.z]));
        Ok(())
    }
}

fn is_gauss_array(array: &DataArray) -> bool {
    array
        .info
        .offsets_name
        .as_deref()
        .map_or(false, |name| name.contains(ELGA_PREFIX))
}

pub(crate) fn single_grid(input: &DataObject) -> Result<&UnstructuredGrid, Error> {
    match input {
        DataObject::DataSet(DataSet::Unstructured(grid)) => Ok(grid),
        DataObject::MultiBlock(mb) if mb.blocks.len() == 1 => match &mb.blocks[0] {
            Some(block) => single_grid(block),
            None => Err(Error::UnsupportedInput("empty block")),
        },
        other => Err(Error::UnsupportedInput(other.class_name())),
    }
}

/// Localizations of the cell types of `grid`, from the quadrature
/// definitions and the published Gauss info.
fn schemes(
    grid: &UnstructuredGrid,
    dictionary: &QuadratureDictionary,
    payload: &[f64],
) -> Result<BTreeMap<CellType, Scheme>, Error> {
    let mut schemes = BTreeMap::new();
    for (cell, ct) in grid.types.iter().enumerate() {
        if schemes.contains_key(ct) {
            continue;
        }
        let definition = dictionary
            .get(*ct)
            .ok_or(Error::NoGaussInfoForCell { cell, cell_type: *ct })?;
        let geo = GeoType::from_vtk(*ct).ok_or(Error::NoGaussInfoForCell { cell, cell_type: *ct })?;
        let info = fill_adv_info_from(payload, *ct, definition.nodes_per_cell, definition.points)?;
        let shape = ShapeFunctions::new(geo, &info.ref_coords, info.dim)?;
        schemes.insert(
            *ct,
            Scheme {
                shape,
                dim: info.dim,
                gauss_coords: info.gauss_coords,
                points: definition.points,
            },
        );
    }
    Ok(schemes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::QuadratureDefinition;
    use crate::array::Values;
    use crate::tiny_info::ExportedTinyInfo;
    use crate::vtk::CellArray;
    use crate::vtk::MultiBlock;

    const TRI_REF: [f64; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    const TRI_GAUSS: [f64; 6] = [1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0];

    fn definition(cell_type: CellType, nodes: usize, points: usize) -> QuadratureDefinition {
        QuadratureDefinition {
            cell_type,
            nodes_per_cell: nodes,
            points,
            shape_functions: Vec::new(),
            weights: vec![1.0; points],
        }
    }

    /// Two triangles and a segment, 3 Gauss points per triangle and 2 on the
    /// segment.
    fn input() -> (UnstructuredGrid, Registry) {
        let mut grid = UnstructuredGrid {
            points: DataArray::new(
                "Points",
                3,
                Values::F64(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
                ]),
            ),
            cells: CellArray::from_legacy(&[3, 0, 1, 2, 2, 0, 3, 3, 0, 2, 3]).unwrap(),
            types: vec![CellType::TRIANGLE, CellType::LINE, CellType::TRIANGLE],
            ..UnstructuredGrid::default()
        };
        let mut dictionary = QuadratureDictionary::default();
        dictionary.insert(definition(CellType::TRIANGLE, 3, 3));
        dictionary.insert(definition(CellType::LINE, 2, 2));
        let mut offsets = DataArray::new("ELGA@0", 1, Values::Id(vec![0, 3, 5]));
        offsets.info.elga = true;
        offsets.info.hidden = true;
        offsets.info.quadrature = Some(Arc::new(dictionary));
        grid.cell_data.add(offsets);
        grid.cell_data
            .add(DataArray::new("mat", 1, Values::I32(vec![7, 8, 9])));

        let mut field = DataArray::new("f", 1, Values::F64((0..8).map(f64::from).collect()));
        field.info.offsets_name = Some("ELGA@0".to_string());
        grid.field_data.add(field);

        let mut tiny = ExportedTinyInfo::default();
        tiny.push_gauss_additional_info(CellType::TRIANGLE, 2, TRI_REF.to_vec(), TRI_GAUSS.to_vec());
        tiny.push_gauss_additional_info(
            CellType::LINE,
            1,
            vec![-1.0, 1.0],
            vec![-0.5, 0.5],
        );
        let mut registry = Registry::default();
        registry.set::<GaussData>(tiny.encode());
        (grid, registry)
    }

    fn polygon_area(grid: &UnstructuredGrid, cell: usize) -> f64 {
        let coords = grid.points.values.as_f64().unwrap();
        let pts: Vec<Point3D> = grid
            .cells
            .cell(cell)
            .iter()
            .map(|&n| {
                let n = n as usize * 3;
                Point3D::new(coords[n], coords[n + 1], coords[n + 2])
            })
            .collect();
        Region::Polygon(pts).measure()
    }

    #[test]
    fn test_one_cell_per_gauss_point() {
        let (grid, registry) = input();
        let output = VoroGauss::default()
            .run(&grid.into(), &registry)
            .unwrap();
        assert_eq!(output.num_cells(), 8);
        // Segment first, then the triangles in input order.
        assert_eq!(output.types[..2], [CellType::LINE, CellType::LINE]);
        assert!(output.types[2..].iter().all(|ct| *ct == CellType::POLYGON));

        let f = output.cell_data.get("f").unwrap();
        assert_eq!(
            f.values,
            Values::F64(vec![3.0, 4.0, 0.0, 1.0, 2.0, 5.0, 6.0, 7.0])
        );
        assert!(f.info.offsets_name.is_none());
        let mat = output.cell_data.get("mat").unwrap();
        assert_eq!(mat.values, Values::I32(vec![8, 8, 7, 7, 7, 9, 9, 9]));
        assert!(!output.cell_data.contains("ELGA@0"));

        let area: f64 = (2..8).map(|c| polygon_area(&output, c)).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-12);
        // Symmetric Gauss points of the first triangle get equal shares.
        assert_relative_eq!(
            polygon_area(&output, 2),
            polygon_area(&output, 4),
            epsilon = 1e-12
        );
    }

    /// The unit tetrahedron with the 4-point Gauss rule.
    fn tetra_input() -> (UnstructuredGrid, Registry, Vec<Point3D>) {
        let corners = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let (a, b) = (0.585_410_196_624_968_5, 0.138_196_601_125_010_5);
        let seeds = vec![
            Point3D::new(b, b, b),
            Point3D::new(a, b, b),
            Point3D::new(b, a, b),
            Point3D::new(b, b, a),
        ];
        let mut grid = UnstructuredGrid {
            points: DataArray::new("Points", 3, Values::F64(corners.to_vec())),
            cells: CellArray::from_legacy(&[4, 0, 1, 2, 3]).unwrap(),
            types: vec![CellType::TETRA],
            ..UnstructuredGrid::default()
        };
        let mut dictionary = QuadratureDictionary::default();
        dictionary.insert(definition(CellType::TETRA, 4, 4));
        let mut offsets = DataArray::new("ELGA@0", 1, Values::Id(vec![0]));
        offsets.info.elga = true;
        offsets.info.quadrature = Some(Arc::new(dictionary));
        grid.cell_data.add(offsets);
        let mut field = DataArray::new("f", 1, Values::F64(vec![10.0, 11.0, 12.0, 13.0]));
        field.info.offsets_name = Some("ELGA@0".to_string());
        grid.field_data.add(field);

        let mut tiny = ExportedTinyInfo::default();
        tiny.push_gauss_additional_info(
            CellType::TETRA,
            3,
            corners.to_vec(),
            seeds.iter().flat_map(|p| [p.x, p.y, p.z]).collect(),
        );
        let mut registry = Registry::default();
        registry.set::<GaussData>(tiny.encode());
        (grid, registry, seeds)
    }

    fn point(grid: &UnstructuredGrid, n: i64) -> Point3D {
        let coords = grid.points.values.as_f64().unwrap();
        let n = n as usize * 3;
        Point3D::new(coords[n], coords[n + 1], coords[n + 2])
    }

    #[test]
    fn test_tetra_split_in_polyhedra() {
        let (grid, registry, seeds) = tetra_input();
        let output = VoroGauss::default()
            .run(&grid.into(), &registry)
            .unwrap();
        assert_eq!(output.num_cells(), 4);
        assert_eq!(output.types, vec![CellType::POLYHEDRON; 4]);
        let f = output.cell_data.get("f").unwrap();
        assert_eq!(f.values, Values::F64(vec![10.0, 11.0, 12.0, 13.0]));

        let faces = output.faces.as_ref().unwrap();
        let mut volume = 0.0;
        for cell in 0..4 {
            let region = Region::Polyhedron(
                faces
                    .faces(cell)
                    .unwrap()
                    .iter()
                    .map(|face| face.iter().map(|&n| point(&output, n)).collect())
                    .collect(),
            );
            volume += region.measure();

            // The vertex average lies inside the cell, hence closest to its
            // own Gauss point.
            let nodes = output.cells.cell(cell);
            let center = nodes.iter().map(|&n| point(&output, n)).sum::<Point3D>()
                / nodes.len() as f64;
            let nearest = (0..4)
                .min_by(|i, j| {
                    let di = (seeds[*i] - center).norm();
                    let dj = (seeds[*j] - center).norm();
                    di.total_cmp(&dj)
                })
                .unwrap();
            assert_eq!(nearest, cell);
        }
        assert_relative_eq!(volume, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_block_input() {
        let (grid, registry) = input();
        let mb = MultiBlock {
            blocks: vec![Some(grid.into())],
        };
        let output = VoroGauss::default()
            .run(&DataObject::MultiBlock(mb), &registry)
            .unwrap();
        assert_eq!(output.num_cells(), 8);

        let mb = MultiBlock {
            blocks: vec![None, None],
        };
        assert_eq!(
            VoroGauss::default()
                .run(&DataObject::MultiBlock(mb), &registry)
                .unwrap_err(),
            Error::UnsupportedInput("vtkMultiBlockDataSet")
        );
    }

    #[test]
    fn test_missing_metadata() {
        let (grid, registry) = input();
        assert_eq!(
            VoroGauss::default()
                .run(&grid.clone().into(), &Registry::default())
                .unwrap_err(),
            Error::NoAdvancedGaussInfo
        );

        let mut plain = grid.clone();
        plain.field_data.remove("f");
        assert_eq!(
            VoroGauss::default()
                .run(&plain.into(), &registry)
                .unwrap_err(),
            Error::NoGaussField
        );

        let mut unknown = grid;
        unknown.types[0] = CellType::QUAD;
        unknown.cells = CellArray::from_legacy(&[4, 0, 1, 2, 3, 2, 0, 3, 3, 0, 2, 3]).unwrap();
        assert_eq!(
            VoroGauss::default()
                .run(&unknown.into(), &registry)
                .unwrap_err(),
            Error::NoGaussInfoForCell {
                cell: 0,
                cell_type: CellType::QUAD
            }
        );
    }

    #[test]
    fn test_tuple_count_mismatch() {
        let (mut grid, registry) = input();
        let mut short = DataArray::new("g", 1, Values::F64(vec![0.0; 5]));
        short.info.offsets_name = Some("ELGA@0".to_string());
        grid.field_data.add(short);
        assert!(matches!(
            VoroGauss::default().run(&grid.into(), &registry),
            Err(Error::TupleCountMismatch { .. })
        ));
    }
}
