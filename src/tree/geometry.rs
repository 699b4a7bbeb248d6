//! Datasets built from a mesh support, and the gathering of field values on
//! them.

use super::Error;
use crate::array::Attributes;
use crate::array::DataArray;
use crate::array::Values;
use crate::convert::points_3d;
use crate::convert::CellSink;
use crate::med::structured_cell_count;
use crate::med::structured_geo_type;
use crate::med::FieldPart;
use crate::med::FieldValues;
use crate::med::GeoType;
use crate::med::Mesh;
use crate::med::SupportPiece;
use crate::med::SupportSignature;
use crate::med::TimeStep;
use crate::med::TypeOfField;
use crate::vtk::CellType;
use crate::vtk::DataSet;
use crate::vtk::RectilinearGrid;
use crate::vtk::StructuredGrid;
use crate::FAMILY_ID_CELL_NAME;
use crate::FAMILY_ID_NODE_NAME;
use crate::GLOBAL_NODE_ID_NAME;
use crate::NUM_ID_CELL_NAME;
use crate::NUM_ID_NODE_NAME;
use std::ops::Range;

/// A dataset holding the cells of a support, without any field data.
#[derive(Clone, Debug)]
pub struct Geometry {
    pub dataset: DataSet,
    pub signature: SupportSignature,
    /// Cell range of each piece of the signature in the dataset.
    pub pieces: Vec<(SupportPiece, Range<usize>)>,
    /// Level and index in that level of every dataset cell.
    origins: Vec<(i32, usize)>,
}

impl Geometry {
    pub fn build(mesh: &Mesh, signature: &SupportSignature) -> Result<Geometry, Error> {
        let _span = tracing::debug_span!("build_geometry", mesh = mesh.name()).entered();
        let has_profile = signature.pieces.iter().any(|p| p.profile.is_some());
        match mesh {
            Mesh::Unstructured(m) => {
                let mut sink = CellSink::default();
                let mut pieces = Vec::with_capacity(signature.pieces.len());
                let mut origins = Vec::new();
                for piece in &signature.pieces {
                    let l = m.level_of(piece.geo).ok_or_else(|| Error::NoSuchGeoType {
                        mesh: m.name.clone(),
                        geo: piece.geo,
                    })?;
                    let level = m.level(l)?;
                    let block = level
                        .blocks()?
                        .into_iter()
                        .find(|(geo, _)| *geo == piece.geo)
                        .map(|(_, range)| range)
                        .unwrap_or(0..0);
                    let ids = piece_cells(piece, block.start, block.len(), &m.name)?;
                    let start = sink.len();
                    sink.push_level(level, ids.iter().copied())?;
                    origins.extend(ids.into_iter().map(|i| (l, i)));
                    pieces.push((piece.clone(), start..sink.len()));
                }
                let grid = sink.into_grid(points_3d(&m.coords, m.space_dimension));
                Ok(Geometry {
                    dataset: DataSet::Unstructured(grid),
                    signature: signature.clone(),
                    pieces,
                    origins,
                })
            }
            Mesh::Cartesian(m) if !has_profile => {
                let axis = |i: usize, name: &str| {
                    let coords = m.axes.get(i).cloned().unwrap_or_else(|| vec![0.0]);
                    DataArray::new(name, 1, Values::F64(coords))
                };
                let grid = RectilinearGrid {
                    x: axis(0, "X"),
                    y: axis(1, "Y"),
                    z: axis(2, "Z"),
                    point_data: Attributes::default(),
                    cell_data: Attributes::default(),
                    field_data: Attributes::default(),
                };
                Ok(Geometry::structured(
                    DataSet::Rectilinear(grid),
                    &m.node_dims(),
                    signature,
                ))
            }
            Mesh::CurveLinear(m) if !has_profile => {
                let grid = StructuredGrid {
                    dimensions: dims_3d(&m.node_dims),
                    points: DataArray::new(
                        "Points",
                        3,
                        Values::F64(points_3d(&m.coords, m.space_dimension)),
                    ),
                    point_data: Attributes::default(),
                    cell_data: Attributes::default(),
                    field_data: Attributes::default(),
                };
                Ok(Geometry::structured(
                    DataSet::Structured(grid),
                    &m.node_dims,
                    signature,
                ))
            }
            Mesh::Cartesian(m) => {
                let dims = m.node_dims();
                let coords = cartesian_points(&m.axes);
                Geometry::explicit_structured(&m.name, &coords, &dims, signature)
            }
            Mesh::CurveLinear(m) => {
                let coords = points_3d(&m.coords, m.space_dimension);
                Geometry::explicit_structured(&m.name, &coords, &m.node_dims, signature)
            }
        }
    }

    fn structured(dataset: DataSet, node_dims: &[usize], signature: &SupportSignature) -> Geometry {
        let n = structured_cell_count(node_dims);
        let pieces = signature
            .pieces
            .iter()
            .map(|piece| (piece.clone(), 0..n))
            .collect();
        Geometry {
            dataset,
            signature: signature.clone(),
            pieces,
            origins: (0..n).map(|i| (0, i)).collect(),
        }
    }

    /// A profile on a structured mesh selects arbitrary cells, which only an
    /// unstructured grid can hold.
    fn explicit_structured(
        name: &str,
        points: &[f64],
        node_dims: &[usize],
        signature: &SupportSignature,
    ) -> Result<Geometry, Error> {
        let mut sink = CellSink::default();
        let mut pieces = Vec::new();
        let mut origins = Vec::new();
        let count = structured_cell_count(node_dims);
        for piece in &signature.pieces {
            let geo = structured_geo_type(node_dims).ok_or_else(|| Error::NoSuchGeoType {
                mesh: name.to_string(),
                geo: piece.geo,
            })?;
            let ids = piece_cells(piece, 0, count, name)?;
            let start = sink.len();
            for &c in &ids {
                sink.push(geo, &structured_cell_nodes(node_dims, c))?;
            }
            origins.extend(ids.into_iter().map(|i| (0, i)));
            pieces.push((piece.clone(), start..sink.len()));
        }
        tracing::debug!(mesh = name, cells = sink.len(), "structured support with profile");
        Ok(Geometry {
            dataset: DataSet::Unstructured(sink.into_grid(points.to_vec())),
            signature: signature.clone(),
            pieces,
            origins,
        })
    }

    pub fn num_cells(&self) -> usize {
        self.origins.len()
    }

    /// Family and number arrays of the cells and nodes of the support.
    pub fn aux_arrays(&self, mesh: &Mesh) -> Result<(Vec<DataArray>, Vec<DataArray>), Error> {
        let mut cell_arrays = Vec::new();
        let mut node_arrays = Vec::new();
        let (cell_families, cell_numbers) = match mesh {
            Mesh::Unstructured(m) => {
                let any_families = self
                    .origins
                    .iter()
                    .any(|(l, _)| m.levels.get(l).map_or(false, |lvl| lvl.families.is_some()));
                let families = any_families.then(|| {
                    self.origins
                        .iter()
                        .map(|(l, i)| {
                            m.levels
                                .get(l)
                                .and_then(|lvl| lvl.families.as_ref())
                                .map_or(0, |f| f[*i])
                        })
                        .collect::<Vec<i64>>()
                });
                let numbers = self
                    .origins
                    .iter()
                    .map(|(l, i)| {
                        m.levels
                            .get(l)
                            .and_then(|lvl| lvl.numbers.as_ref())
                            .map(|n| n[*i])
                    })
                    .collect::<Option<Vec<i64>>>()
                    .filter(|n| !n.is_empty());
                (families, numbers)
            }
            Mesh::Cartesian(m) => (
                self.select_structured(m.cell_families.as_deref()),
                self.select_structured(m.cell_numbers.as_deref()),
            ),
            Mesh::CurveLinear(m) => (
                self.select_structured(m.cell_families.as_deref()),
                self.select_structured(m.cell_numbers.as_deref()),
            ),
        };
        if let Some(ids) = cell_families {
            cell_arrays.push(int_array(FAMILY_ID_CELL_NAME, &ids)?);
        }
        if let Some(ids) = cell_numbers {
            cell_arrays.push(int_array(NUM_ID_CELL_NAME, &ids)?);
        }
        let (node_families, node_numbers, global_ids) = match mesh {
            Mesh::Unstructured(m) => (&m.node_families, &m.node_numbers, &m.global_node_ids),
            Mesh::Cartesian(m) => (&m.node_families, &m.node_numbers, &None),
            Mesh::CurveLinear(m) => (&m.node_families, &m.node_numbers, &None),
        };
        for (name, ids) in [
            (FAMILY_ID_NODE_NAME, node_families),
            (NUM_ID_NODE_NAME, node_numbers),
            (GLOBAL_NODE_ID_NAME, global_ids),
        ] {
            if let Some(ids) = ids {
                node_arrays.push(int_array(name, ids)?);
            }
        }
        Ok((cell_arrays, node_arrays))
    }

    fn select_structured(&self, ids: Option<&[i64]>) -> Option<Vec<i64>> {
        let ids = ids?;
        self.origins
            .iter()
            .map(|(_, i)| ids.get(*i).copied())
            .collect()
    }

    /// Values of `step` laid out along the cells (or points) of this
    /// geometry.
    pub fn gather(
        &self,
        field: &str,
        num_components: usize,
        step: &TimeStep,
    ) -> Result<Values, Error> {
        let mut ranges: Vec<Range<usize>> = Vec::new();
        if step.parts.iter().any(|p| p.disc == TypeOfField::OnNodes) {
            ranges.extend(step.parts.iter().map(|p| p.range.clone()));
        } else {
            for (piece, _) in &self.pieces {
                let part = matching_part(&step.parts, piece.geo).ok_or_else(|| {
                    Error::MissingPart {
                        field: field.to_string(),
                        geo: piece.geo,
                    }
                })?;
                ranges.push(part.range.clone());
            }
        }
        let out_of_range = || Error::ValuesOutOfRange {
            field: field.to_string(),
        };
        match &step.values {
            FieldValues::Float64(v) => Ok(Values::F64(
                gather(v, num_components, &ranges).ok_or_else(out_of_range)?,
            )),
            FieldValues::Int32(v) => Ok(Values::I32(
                gather(v, num_components, &ranges).ok_or_else(out_of_range)?,
            )),
            other => Err(Error::UnsupportedFieldType {
                field: field.to_string(),
                type_name: other.type_name(),
            }),
        }
    }

    /// Localizations used by `step`, in the order of the pieces.
    pub fn localizations(&self, step: &TimeStep) -> Vec<String> {
        self.pieces
            .iter()
            .filter_map(|(piece, _)| matching_part(&step.parts, piece.geo))
            .filter_map(|part| part.localization.clone())
            .collect()
    }
}

fn matching_part(parts: &[FieldPart], geo: GeoType) -> Option<&FieldPart> {
    parts.iter().find(|p| p.geo == Some(geo))
}

fn gather<T: Copy>(values: &[T], ncomp: usize, ranges: &[Range<usize>]) -> Option<Vec<T>> {
    let mut out = Vec::with_capacity(ranges.iter().map(|r| r.len() * ncomp).sum());
    for range in ranges {
        out.extend_from_slice(values.get(range.start * ncomp..range.end * ncomp)?);
    }
    Some(out)
}

/// Cell ids of a piece, shifted by `start`. `count` is the number of cells
/// of the piece type.
fn piece_cells(piece: &SupportPiece, start: usize, count: usize, mesh: &str) -> Result<Vec<usize>, Error> {
    match &piece.profile {
        None => Ok((start..start + count).collect()),
        Some(ids) => ids
            .iter()
            .map(|&id| {
                if id < count {
                    Ok(start + id)
                } else {
                    Err(Error::ProfileOutOfRange {
                        mesh: mesh.to_string(),
                        geo: piece.geo,
                        id,
                    })
                }
            })
            .collect(),
    }
}

fn int_array(name: &str, ids: &[i64]) -> Result<DataArray, Error> {
    let values = ids
        .iter()
        .map(|&value| {
            i32::try_from(value).map_err(|_| Error::IdOverflow {
                array: name.to_string(),
                value,
            })
        })
        .collect::<Result<Vec<i32>, Error>>()?;
    Ok(DataArray::new(name, 1, Values::I32(values)))
}

fn dims_3d(node_dims: &[usize]) -> [usize; 3] {
    let mut dims = [1; 3];
    for (slot, d) in dims.iter_mut().zip(node_dims) {
        *slot = *d;
    }
    dims
}

/// Node coordinates of a cartesian mesh, x varying fastest.
fn cartesian_points(axes: &[Vec<f64>]) -> Vec<f64> {
    let axis = |i: usize| axes.get(i).cloned().unwrap_or_else(|| vec![0.0]);
    let (x, y, z) = (axis(0), axis(1), axis(2));
    let mut points = Vec::with_capacity(x.len() * y.len() * z.len() * 3);
    for zk in &z {
        for yj in &y {
            for xi in &x {
                points.extend_from_slice(&[*xi, *yj, *zk]);
            }
        }
    }
    points
}

/// Nodes of structured cell `c`, in the node order of its MED type.
fn structured_cell_nodes(node_dims: &[usize], c: usize) -> Vec<i64> {
    // (node count, node stride) of the axes holding more than one node.
    let mut axes: Vec<(usize, usize)> = Vec::new();
    let mut stride = 1;
    for &n in node_dims {
        if n > 1 {
            axes.push((n, stride));
        }
        stride *= n;
    }
    let mut rest = c;
    let mut base = 0;
    let mut strides = Vec::with_capacity(axes.len());
    for &(n, stride) in &axes {
        base += (rest % (n - 1)) * stride;
        rest /= n - 1;
        strides.push(stride);
    }
    let corners: &[&[usize]] = match strides.len() {
        1 => &[&[0], &[1]],
        2 => &[&[0, 0], &[1, 0], &[1, 1], &[0, 1]],
        _ => &[
            &[0, 0, 0],
            &[1, 0, 0],
            &[1, 1, 0],
            &[0, 1, 0],
            &[0, 0, 1],
            &[1, 0, 1],
            &[1, 1, 1],
            &[0, 1, 1],
        ],
    };
    corners
        .iter()
        .map(|offsets| {
            let shift: usize = offsets.iter().zip(&strides).map(|(o, s)| o * s).sum();
            (base + shift) as i64
        })
        .collect()
}

/// Type and point count of every cell of `dataset`.
pub fn cell_shapes(dataset: &DataSet) -> Vec<(CellType, usize)> {
    match dataset {
        DataSet::Unstructured(grid) => grid
            .types
            .iter()
            .zip(grid.cells.iter())
            .map(|(ct, cell)| (*ct, cell.len()))
            .collect(),
        DataSet::Poly(_) => (0..dataset.num_cells())
            .filter_map(|i| dataset.cell_type(i).map(|ct| (ct, 0)))
            .collect(),
        DataSet::Rectilinear(grid) => structured_shapes(&grid.dimensions()),
        DataSet::Structured(grid) => structured_shapes(&grid.dimensions),
    }
}

fn structured_shapes(dims: &[usize]) -> Vec<(CellType, usize)> {
    match structured_geo_type(dims) {
        Some(geo) => {
            let n = geo.node_count().unwrap_or(0);
            vec![(geo.vtk(), n); structured_cell_count(dims)]
        }
        None => Vec::new(),
    }
}
