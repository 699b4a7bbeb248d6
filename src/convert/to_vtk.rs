use super::Error;
use crate::array::DataArray;
use crate::array::Values;
use crate::med::GeoType;
use crate::med::Level;
use crate::med::UMesh;
use crate::vtk::CellArray;
use crate::vtk::CellType;
use crate::vtk::PolyhedronFaces;
use crate::vtk::UnstructuredGrid;

/// Coordinates with exactly three components per point, zero-padded.
pub fn points_3d(coords: &[f64], dim: usize) -> Vec<f64> {
    if dim == 3 {
        return coords.to_vec();
    }
    if dim == 0 {
        return Vec::new();
    }
    coords
        .chunks(dim)
        .flat_map(|p| (0..3).map(move |i| p.get(i).copied().unwrap_or(0.0)))
        .collect()
}

/// Accumulates MED cells into an unstructured grid topology.
#[derive(Debug, Default)]
pub(crate) struct CellSink {
    cells: CellArray,
    types: Vec<CellType>,
    face_locations: Vec<Option<usize>>,
    face_stream: Vec<i64>,
}

impl CellSink {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Appends one cell. Polyhedra come as faces separated by `-1`.
    pub fn push(&mut self, geo: GeoType, nodes: &[i64]) -> Result<(), Error> {
        let pos = self.types.len();
        if geo != GeoType::Polyhed {
            self.cells.push(nodes.iter().copied());
            self.types.push(geo.vtk());
            self.face_locations.push(None);
            return Ok(());
        }
        let faces: Vec<&[i64]> = nodes.split(|n| *n == -1).collect();
        if faces.iter().any(|face| face.len() < 3) {
            return Err(Error::MalformedPolyhedron { pos });
        }
        let mut points: Vec<i64> = nodes.iter().copied().filter(|n| *n >= 0).collect();
        points.sort_unstable();
        points.dedup();
        self.face_locations.push(Some(self.face_stream.len()));
        self.face_stream.push(faces.len() as i64);
        for face in faces {
            self.face_stream.push(face.len() as i64);
            self.face_stream.extend_from_slice(face);
        }
        self.cells.push(points);
        self.types.push(CellType::POLYHEDRON);
        Ok(())
    }

    /// Appends the given cells of `level`.
    pub fn push_level<I>(&mut self, level: &Level, cells: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = usize>,
    {
        for i in cells {
            self.push(level.types[i], level.cell(i))?;
        }
        Ok(())
    }

    pub fn into_grid(self, points: Vec<f64>) -> UnstructuredGrid {
        let faces = if self.face_stream.is_empty() {
            None
        } else {
            Some(PolyhedronFaces {
                locations: self.face_locations,
                stream: self.face_stream,
            })
        };
        UnstructuredGrid {
            points: DataArray::new("Points", 3, Values::F64(points)),
            cells: self.cells,
            types: self.types,
            faces,
            ..UnstructuredGrid::default()
        }
    }
}

/// Every cell of every non empty level, highest dimension first. Only the
/// geometry is converted.
pub fn umesh_to_vtk(mesh: &UMesh) -> Result<UnstructuredGrid, Error> {
    let mut sink = CellSink::default();
    for l in mesh.non_empty_levels() {
        let level = mesh.level(l)?;
        sink.push_level(level, 0..level.len())?;
    }
    tracing::trace!(mesh = %mesh.name, cells = sink.len(), "converted to unstructured grid");
    Ok(sink.into_grid(points_3d(&mesh.coords, mesh.space_dimension)))
}
