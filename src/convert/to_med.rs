use super::Error;
use super::Family;
use super::Group;
use crate::array::Attributes;
use crate::array::DataArray;
use crate::array::ValueKind;
use crate::med::structured_cell_count;
use crate::med::structured_geo_type;
use crate::med::CMesh;
use crate::med::CurveLinearMesh;
use crate::med::FieldMultiTs;
use crate::med::FieldPart;
use crate::med::FieldValues;
use crate::med::GeoType;
use crate::med::Level;
use crate::med::MedDocument;
use crate::med::Mesh;
use crate::med::TimeStep;
use crate::med::TypeOfField;
use crate::med::UMesh;
use crate::vtk::DataObject;
use crate::vtk::DataSet;
use crate::vtk::PolyData;
use crate::vtk::RectilinearGrid;
use crate::vtk::StructuredGrid;
use crate::vtk::UnstructuredGrid;
use crate::FAMILY_ID_CELL_NAME;
use crate::FAMILY_ID_NODE_NAME;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

const DEFAULT_MESH_NAME: &str = "Mesh";

/// Time stamp given to every converted field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WriteOptions {
    pub time: f64,
    pub iteration: i32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            time: 0.0,
            iteration: 0,
        }
    }
}

/// Converts a dataset or a multi-block into a MED document.
///
/// Each dataset of a multi-block becomes its own mesh, named after its path
/// in the block tree (`Mesh_0_2`). A multi-block holding a single dataset is
/// converted as that dataset alone.
pub fn write_med_from_vtk(
    input: &DataObject,
    options: &WriteOptions,
) -> Result<MedDocument, Error> {
    let _span = tracing::info_span!("write_med_from_vtk", class = input.class_name()).entered();
    let mut doc = MedDocument::default();
    match input {
        DataObject::DataSet(ds) => write_dataset(&mut doc, ds, &[], options)?,
        DataObject::MultiBlock(mb) => {
            if let [Some(DataObject::DataSet(ds))] = mb.blocks.as_slice() {
                write_dataset(&mut doc, ds, &[], options)?;
            } else {
                write_multi_block(&mut doc, &mb.blocks, &[], options)?;
            }
        }
    }
    tracing::debug!(
        meshes = doc.meshes.len(),
        fields = doc.fields.len(),
        "converted to MED"
    );
    Ok(doc)
}

fn write_multi_block(
    doc: &mut MedDocument,
    blocks: &[Option<DataObject>],
    context: &[usize],
    options: &WriteOptions,
) -> Result<(), Error> {
    for (i, block) in blocks.iter().enumerate() {
        let mut inner = context.to_vec();
        inner.push(i);
        match block {
            None => {
                return Err(Error::NullBlock {
                    context: context.to_vec(),
                    pos: i,
                })
            }
            Some(DataObject::DataSet(ds)) => write_dataset(doc, ds, &inner, options)?,
            Some(DataObject::MultiBlock(mb)) => write_multi_block(doc, &mb.blocks, &inner, options)?,
        }
    }
    Ok(())
}

fn mesh_name_with_context(context: &[usize]) -> String {
    let mut name = DEFAULT_MESH_NAME.to_string();
    for i in context {
        name.push('_');
        name.push_str(&i.to_string());
    }
    name
}

fn write_dataset(
    doc: &mut MedDocument,
    ds: &DataSet,
    context: &[usize],
    options: &WriteOptions,
) -> Result<(), Error> {
    let name = mesh_name_with_context(context);
    match ds {
        DataSet::Unstructured(grid) => from_unstructured_grid(doc, grid, name, options),
        DataSet::Poly(poly) => from_poly_data(doc, poly, name, options),
        DataSet::Rectilinear(grid) => from_rectilinear_grid(doc, grid, name, options),
        DataSet::Structured(grid) => from_structured_grid(doc, grid, name, options),
    }
}

/// A cell on its way to a MED level, with the id of the pipeline cell that
/// carries its cell data.
struct RawCell {
    geo: GeoType,
    nodes: Vec<i64>,
    source: usize,
}

fn real_values(array: &DataArray) -> Result<Vec<f64>, Error> {
    array
        .values
        .to_f64()
        .ok_or_else(|| Error::UnrecognizedArrayType {
            array: array.name.clone(),
            type_name: array.values.type_name(),
        })
}

fn check_tuples(array: &DataArray, expected: usize) -> Result<(), Error> {
    if array.tuples() != expected {
        return Err(Error::BadArrayLength {
            array: array.name.clone(),
            expected,
            actual: array.tuples(),
        });
    }
    Ok(())
}

fn single_point(cell: &[i64], pos: usize) -> Result<Vec<i64>, Error> {
    if cell.len() != 1 {
        return Err(Error::NonSinglePolyVertex { pos });
    }
    Ok(cell.to_vec())
}

fn from_unstructured_grid(
    doc: &mut MedDocument,
    grid: &UnstructuredGrid,
    name: String,
    options: &WriteOptions,
) -> Result<(), Error> {
    let coords = real_values(&grid.points)?;
    let mut cells = Vec::with_capacity(grid.num_cells());
    for (i, &cell_type) in grid.types.iter().enumerate() {
        let geo = GeoType::from_vtk(cell_type).ok_or(Error::UnrecognizedCellType {
            pos: i,
            cell_type,
        })?;
        let points = grid.cells.cell(i);
        let nodes = match geo {
            GeoType::Polyhed => {
                let faces = grid
                    .faces
                    .as_ref()
                    .and_then(|faces| faces.faces(i))
                    .ok_or(Error::MalformedPolyhedron { pos: i })?;
                faces.join(&-1)
            }
            GeoType::Point1 => single_point(points, i)?,
            _ => points.to_vec(),
        };
        cells.push(RawCell {
            geo,
            nodes,
            source: i,
        });
    }
    assemble_umesh(
        doc,
        name,
        coords,
        cells,
        grid.num_cells(),
        &grid.cell_data,
        &grid.point_data,
        options,
    )
}

fn from_poly_data(
    doc: &mut MedDocument,
    poly: &PolyData,
    name: String,
    options: &WriteOptions,
) -> Result<(), Error> {
    let coords = real_values(&poly.points)?;
    let mut cells = Vec::with_capacity(poly.num_cells());
    let mut source = 0;
    for cell in poly.verts.iter() {
        cells.push(RawCell {
            geo: GeoType::Point1,
            nodes: single_point(cell, source)?,
            source,
        });
        source += 1;
    }
    for cell in poly.lines.iter() {
        if cell.len() != 2 {
            return Err(Error::PolyLine { pos: source });
        }
        cells.push(RawCell {
            geo: GeoType::Seg2,
            nodes: cell.to_vec(),
            source,
        });
        source += 1;
    }
    for cell in poly.polys.iter() {
        cells.push(RawCell {
            geo: GeoType::Polygon,
            nodes: cell.to_vec(),
            source,
        });
        source += 1;
    }
    for cell in poly.strips.iter() {
        if cell.len() < 3 {
            return Err(Error::BadTriangleStrip { pos: source });
        }
        for tri in cell.windows(3) {
            cells.push(RawCell {
                geo: GeoType::Tri3,
                nodes: tri.to_vec(),
                source,
            });
        }
        source += 1;
    }
    assemble_umesh(
        doc,
        name,
        coords,
        cells,
        poly.num_cells(),
        &poly.cell_data,
        &poly.point_data,
        options,
    )
}

/// Integer family ids, `None` when `array` isn't a family array.
fn family_ids(array: &DataArray, reserved: &str) -> Option<Vec<i64>> {
    if array.name != reserved || array.values.kind() != Some(ValueKind::Integer) {
        return None;
    }
    array.values.to_i64()
}

fn field_values(array: &DataArray) -> Result<(FieldValues, Vec<String>), Error> {
    let ncomp = array.components;
    let named = |i: usize| array.component_name(i).map(str::to_string);
    match array.values.kind() {
        Some(ValueKind::Real) => {
            let names = (0..ncomp)
                .map(|i| {
                    named(i).unwrap_or_else(|| match ncomp {
                        2 | 3 => char::from(b'X' + i as u8).to_string(),
                        _ => String::new(),
                    })
                })
                .collect();
            Ok((FieldValues::Float64(real_values(array)?), names))
        }
        Some(ValueKind::Integer) => {
            let values = array
                .values
                .to_i64()
                .unwrap_or_default()
                .into_iter()
                .map(|v| {
                    i32::try_from(v).map_err(|_| Error::IdOverflow {
                        array: array.name.clone(),
                        value: v,
                    })
                })
                .collect::<Result<Vec<i32>, Error>>()?;
            let names = (0..ncomp).map(|i| named(i).unwrap_or_default()).collect();
            Ok((FieldValues::Int32(values), names))
        }
        None => Err(Error::UnrecognizedArrayType {
            array: array.name.clone(),
            type_name: array.values.type_name(),
        }),
    }
}

fn single_step_field(
    array: &DataArray,
    mesh_name: &str,
    parts: Vec<FieldPart>,
    options: &WriteOptions,
) -> Result<FieldMultiTs, Error> {
    let (values, components) = field_values(array)?;
    Ok(FieldMultiTs {
        name: array.name.clone(),
        mesh_name: mesh_name.to_string(),
        dt_unit: String::new(),
        components,
        steps: vec![TimeStep {
            iteration: options.iteration,
            order: 0,
            time: options.time,
            parts,
            values,
        }],
    })
}

fn cell_part(geo: GeoType, range: Range<usize>) -> FieldPart {
    FieldPart {
        disc: TypeOfField::OnCells,
        geo: Some(geo),
        profile: None,
        localization: None,
        range,
    }
}

/// Point arrays become node fields, except the node family array which
/// is returned.
fn node_fields(
    doc: &mut MedDocument,
    point_data: &Attributes,
    mesh_name: &str,
    num_nodes: usize,
    options: &WriteOptions,
) -> Result<Option<Vec<i64>>, Error> {
    let mut families = None;
    for array in point_data.iter() {
        check_tuples(array, num_nodes)?;
        if let Some(ids) = family_ids(array, FAMILY_ID_NODE_NAME) {
            families = Some(ids);
            continue;
        }
        let part = FieldPart {
            disc: TypeOfField::OnNodes,
            geo: None,
            profile: None,
            localization: None,
            range: 0..num_nodes,
        };
        doc.fields
            .push(single_step_field(array, mesh_name, vec![part], options)?);
    }
    Ok(families)
}

/// Routes cells to one level per dimension, sorts each level per type and
/// carries cell data along.
#[allow(clippy::too_many_arguments)]
fn assemble_umesh(
    doc: &mut MedDocument,
    name: String,
    coords: Vec<f64>,
    cells: Vec<RawCell>,
    num_sources: usize,
    cell_data: &Attributes,
    point_data: &Attributes,
    options: &WriteOptions,
) -> Result<(), Error> {
    let mut mesh = UMesh::new(name, 3, coords);
    let num_nodes = mesh.num_nodes();
    for array in cell_data.iter() {
        check_tuples(array, num_sources)?;
    }
    let cell_families = cell_data
        .get(FAMILY_ID_CELL_NAME)
        .and_then(|array| family_ids(array, FAMILY_ID_CELL_NAME));

    let mut per_dim: BTreeMap<usize, Vec<RawCell>> = BTreeMap::new();
    for cell in cells {
        per_dim.entry(cell.geo.dimension()).or_default().push(cell);
    }
    let mesh_dim = per_dim.keys().next_back().copied().unwrap_or(0);

    // Cell data source ids in final cell order, highest level first.
    let mut sources: Vec<usize> = Vec::new();
    let mut parts: Vec<FieldPart> = Vec::new();
    for (dim, dim_cells) in per_dim.into_iter().rev() {
        let mut level = Level::default();
        let mut level_sources = Vec::with_capacity(dim_cells.len());
        for cell in dim_cells {
            level.push_cell(cell.geo, cell.nodes);
            level_sources.push(cell.source);
        }
        level.families = cell_families
            .as_ref()
            .map(|f| level_sources.iter().map(|&s| f[s]).collect());
        let o2n = level.sort_cells_in_med_file_format();
        let mut n2o = vec![0; o2n.len()];
        for (old, &new) in o2n.iter().enumerate() {
            n2o[new] = old;
        }
        let offset = sources.len();
        sources.extend(n2o.iter().map(|&old| level_sources[old]));
        if n2o.iter().enumerate().any(|(new, &old)| new != old) {
            level.renumbering = Some(n2o);
        }
        for (geo, range) in level.blocks()? {
            parts.push(cell_part(geo, offset + range.start..offset + range.end));
        }
        mesh.levels.insert(dim as i32 - mesh_dim as i32, level);
    }

    for array in cell_data.iter() {
        if family_ids(array, FAMILY_ID_CELL_NAME).is_some() {
            continue;
        }
        let selected = array.select_tuples(&sources)?;
        doc.fields
            .push(single_step_field(&selected, &mesh.name, parts.clone(), options)?);
    }
    mesh.node_families = node_fields(doc, point_data, &mesh.name, num_nodes, options)?;
    mesh.check_consistency()?;
    tracing::debug!(
        mesh = %mesh.name,
        nodes = num_nodes,
        levels = ?mesh.non_empty_levels(),
        "unstructured mesh assembled"
    );
    doc.meshes.push(Arc::new(Mesh::Unstructured(mesh)));
    Ok(())
}

/// Cell fields of a structured mesh, returning the cell family array.
fn structured_cell_fields(
    doc: &mut MedDocument,
    cell_data: &Attributes,
    mesh_name: &str,
    node_dims: &[usize],
    options: &WriteOptions,
) -> Result<Option<Vec<i64>>, Error> {
    let num_cells = match structured_geo_type(node_dims) {
        Some(_) => structured_cell_count(node_dims),
        None => 0,
    };
    let mut families = None;
    for array in cell_data.iter() {
        check_tuples(array, num_cells)?;
        if let Some(ids) = family_ids(array, FAMILY_ID_CELL_NAME) {
            families = Some(ids);
            continue;
        }
        let parts = structured_geo_type(node_dims)
            .map(|geo| vec![cell_part(geo, 0..num_cells)])
            .unwrap_or_default();
        doc.fields
            .push(single_step_field(array, mesh_name, parts, options)?);
    }
    Ok(families)
}

fn from_rectilinear_grid(
    doc: &mut MedDocument,
    grid: &RectilinearGrid,
    name: String,
    options: &WriteOptions,
) -> Result<(), Error> {
    let mut mesh = CMesh {
        name,
        ..CMesh::default()
    };
    for axis in [&grid.x, &grid.y, &grid.z] {
        if axis.tuples() > 0 {
            mesh.axes.push(real_values(axis)?);
            mesh.axis_names.push(axis.component_name(0).unwrap_or_default().to_string());
        }
    }
    let node_dims = mesh.node_dims();
    let num_nodes = node_dims.iter().product();
    mesh.cell_families = structured_cell_fields(doc, &grid.cell_data, &mesh.name, &node_dims, options)?;
    mesh.node_families = node_fields(doc, &grid.point_data, &mesh.name, num_nodes, options)?;
    doc.meshes.push(Arc::new(Mesh::Cartesian(mesh)));
    Ok(())
}

fn from_structured_grid(
    doc: &mut MedDocument,
    grid: &StructuredGrid,
    name: String,
    options: &WriteOptions,
) -> Result<(), Error> {
    let node_dims = grid.dimensions.to_vec();
    let num_nodes: usize = node_dims.iter().product();
    check_tuples(&grid.points, num_nodes)?;
    let mut mesh = CurveLinearMesh {
        name,
        node_dims,
        space_dimension: 3,
        coords: real_values(&grid.points)?,
        ..CurveLinearMesh::default()
    };
    mesh.cell_families =
        structured_cell_fields(doc, &grid.cell_data, &mesh.name, &mesh.node_dims, options)?;
    mesh.node_families = node_fields(doc, &grid.point_data, &mesh.name, num_nodes, options)?;
    doc.meshes.push(Arc::new(Mesh::CurveLinear(mesh)));
    Ok(())
}

/// Names the single mesh of `doc` and attaches families and groups to it.
/// Documents with several meshes are left untouched.
pub fn put_fam_grp_info_if_any(
    doc: &mut MedDocument,
    mesh_name: &str,
    groups: &[Group],
    families: &[Family],
) {
    if mesh_name.is_empty() || doc.meshes.len() != 1 {
        return;
    }
    let mesh = Arc::make_mut(&mut doc.meshes[0]);
    mesh.set_name(mesh_name);
    let info = mesh.family_info_mut();
    for family in families {
        info.families.insert(family.name.clone(), family.id);
    }
    for group in groups {
        info.groups.insert(group.name.clone(), group.families.clone());
    }
    for field in &mut doc.fields {
        field.mesh_name = mesh_name.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Values;
    use crate::convert::umesh_to_vtk;
    use crate::vtk::CellType;
    use crate::vtk::CellArray;
    use crate::vtk::MultiBlock;
    use crate::vtk::PolyhedronFaces;

    fn tetra() -> UnstructuredGrid {
        let mut grid = UnstructuredGrid {
            points: DataArray::new(
                "Points",
                3,
                Values::F32(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
                ]),
            ),
            ..UnstructuredGrid::default()
        };
        grid.cells.push([0, 1, 2, 3]);
        grid.types.push(CellType::TETRA);
        grid
    }

    fn unstructured(doc: &MedDocument, i: usize) -> &UMesh {
        match &*doc.meshes[i] {
            Mesh::Unstructured(m) => m,
            other => panic!("unexpected mesh {other:?}"),
        }
    }

    #[test]
    fn test_tetra_round_trip() {
        let grid = tetra();
        let doc = write_med_from_vtk(&grid.clone().into(), &WriteOptions::default()).unwrap();
        let mesh = unstructured(&doc, 0);
        assert_eq!(mesh.name, "Mesh");
        let back = umesh_to_vtk(mesh).unwrap();
        assert_eq!(back.points.values.to_f64(), grid.points.values.to_f64());
        assert_eq!(back.cells, grid.cells);
        assert_eq!(back.types, grid.types);
    }

    #[test]
    fn test_polyhedron_round_trip() {
        // A square pyramid given as a polyhedron, then a tetrahedron.
        let pyramid_faces: Vec<Vec<i64>> = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 4],
            vec![1, 2, 4],
            vec![2, 3, 4],
            vec![3, 0, 4],
        ];
        let mut stream = vec![pyramid_faces.len() as i64];
        for face in &pyramid_faces {
            stream.push(face.len() as i64);
            stream.extend_from_slice(face);
        }
        let mut grid = UnstructuredGrid {
            points: DataArray::new(
                "Points",
                3,
                Values::F64(vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.5, 1.0,
                ]),
            ),
            faces: Some(PolyhedronFaces {
                locations: vec![Some(0), None],
                stream,
            }),
            ..UnstructuredGrid::default()
        };
        grid.cells.push([0, 1, 2, 3, 4]);
        grid.types.push(CellType::POLYHEDRON);
        grid.cells.push([0, 1, 3, 4]);
        grid.types.push(CellType::TETRA);
        grid.cell_data
            .add(DataArray::new("v", 1, Values::F64(vec![1.0, 2.0])));

        let doc = write_med_from_vtk(&grid.into(), &WriteOptions::default()).unwrap();
        let mesh = unstructured(&doc, 0);
        let level = mesh.level(0).unwrap();
        assert_eq!(level.types, vec![GeoType::Tetra4, GeoType::Polyhed]);
        assert_eq!(level.renumbering, Some(vec![1, 0]));
        assert_eq!(
            level.cell(1),
            &[0, 1, 2, 3, -1, 0, 1, 4, -1, 1, 2, 4, -1, 2, 3, 4, -1, 3, 0, 4]
        );
        assert_eq!(doc.fields[0].steps[0].values, FieldValues::Float64(vec![2.0, 1.0]));

        let back = umesh_to_vtk(mesh).unwrap();
        assert_eq!(back.types, vec![CellType::TETRA, CellType::POLYHEDRON]);
        assert_eq!(back.cells.cell(0), &[0, 1, 3, 4]);
        assert_eq!(back.cells.cell(1), &[0, 1, 2, 3, 4]);
        let faces = back.faces.unwrap();
        assert!(faces.faces(0).is_none());
        let faces: Vec<Vec<i64>> = faces
            .faces(1)
            .unwrap()
            .into_iter()
            .map(<[i64]>::to_vec)
            .collect();
        assert_eq!(faces, pyramid_faces);
    }

    #[test]
    fn test_mixed_dimensions_and_sorting() {
        let mut grid = tetra();
        grid.cells = CellArray::default();
        grid.types.clear();
        for (ct, cell) in [
            (CellType::QUAD, vec![0, 1, 2, 3]),
            (CellType::LINE, vec![0, 1]),
            (CellType::TRIANGLE, vec![0, 1, 2]),
            (CellType::QUAD, vec![1, 2, 3, 0]),
        ] {
            grid.cells.push(cell);
            grid.types.push(ct);
        }
        grid.cell_data
            .add(DataArray::new("v", 1, Values::F64(vec![10.0, 11.0, 12.0, 13.0])));
        grid.cell_data
            .add(DataArray::new(FAMILY_ID_CELL_NAME, 1, Values::I32(vec![-1, -2, -3, -4])));
        let doc = write_med_from_vtk(&grid.into(), &WriteOptions::default()).unwrap();
        let mesh = unstructured(&doc, 0);
        assert_eq!(mesh.non_empty_levels(), vec![0, -1]);
        let top = mesh.level(0).unwrap();
        assert_eq!(top.types, vec![GeoType::Tri3, GeoType::Quad4, GeoType::Quad4]);
        assert_eq!(top.families, Some(vec![-3, -1, -4]));
        assert_eq!(top.renumbering, Some(vec![1, 0, 2]));
        assert_eq!(mesh.level(-1).unwrap().families, Some(vec![-2]));

        assert_eq!(doc.fields.len(), 1);
        let step = &doc.fields[0].steps[0];
        assert_eq!(step.values, FieldValues::Float64(vec![12.0, 10.0, 13.0, 11.0]));
        let ranges: Vec<_> = step.parts.iter().map(|p| (p.geo, p.range.clone())).collect();
        assert_eq!(
            ranges,
            vec![
                (Some(GeoType::Tri3), 0..1),
                (Some(GeoType::Quad4), 1..3),
                (Some(GeoType::Seg2), 3..4),
            ]
        );
    }

    #[test]
    fn test_triangle_strip_expansion() {
        let mut poly = PolyData {
            points: DataArray::new("Points", 3, Values::F64(vec![0.0; 15])),
            ..PolyData::default()
        };
        poly.verts.push([4]);
        poly.strips.push([0, 1, 2, 3]);
        poly.cell_data
            .add(DataArray::new("id", 1, Values::I32(vec![7, 9])));
        let doc = write_med_from_vtk(&DataSet::Poly(poly).into(), &WriteOptions::default()).unwrap();
        let mesh = unstructured(&doc, 0);
        let top = mesh.level(0).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top.cell(1), &[1, 2, 3]);
        assert_eq!(mesh.level(-2).unwrap().len(), 1);
        assert_eq!(doc.fields[0].steps[0].values, FieldValues::Int32(vec![9, 9, 7]));
        assert_eq!(doc.fields[0].components, vec![String::new()]);
    }

    #[test]
    fn test_multi_block_context_names() {
        let nested = MultiBlock {
            blocks: vec![Some(tetra().into())],
        };
        let input = MultiBlock {
            blocks: vec![
                Some(tetra().into()),
                Some(DataObject::MultiBlock(nested)),
            ],
        };
        let doc = write_med_from_vtk(&DataObject::MultiBlock(input), &WriteOptions::default()).unwrap();
        assert_eq!(doc.mesh_names(), vec!["Mesh_0", "Mesh_1_0"]);

        let single = MultiBlock {
            blocks: vec![Some(tetra().into())],
        };
        let doc = write_med_from_vtk(&DataObject::MultiBlock(single), &WriteOptions::default()).unwrap();
        assert_eq!(doc.mesh_names(), vec!["Mesh"]);

        let holed = MultiBlock {
            blocks: vec![Some(tetra().into()), None],
        };
        let err = write_med_from_vtk(&DataObject::MultiBlock(holed), &WriteOptions::default()).unwrap_err();
        assert_eq!(err, Error::NullBlock { context: vec![], pos: 1 });
    }

    #[test]
    fn test_unsupported_arrays() {
        let mut grid = tetra();
        grid.point_data
            .add(DataArray::new("u16", 1, Values::U16(vec![0; 4])));
        let err = write_med_from_vtk(&grid.into(), &WriteOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "unrecognized array \"vtkUnsignedShortArray\" type for array \"u16\"");

        let mut grid = tetra();
        grid.point_data
            .add(DataArray::new("big", 1, Values::I64(vec![0, 1, 2, i64::MAX])));
        let err = write_med_from_vtk(&grid.into(), &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::IdOverflow { .. }));
    }

    #[test]
    fn test_default_component_names_and_families() {
        let mut grid = tetra();
        grid.point_data
            .add(DataArray::new("disp", 2, Values::F64(vec![0.0; 8])).with_component_names(["dx"]));
        grid.point_data
            .add(DataArray::new(FAMILY_ID_NODE_NAME, 1, Values::Id(vec![1, 1, 2, 2])));
        let mut doc = write_med_from_vtk(&grid.into(), &WriteOptions { time: 2.5, iteration: 4 }).unwrap();
        assert_eq!(doc.fields.len(), 1);
        assert_eq!(doc.fields[0].components, vec!["dx".to_string(), "Y".to_string()]);
        assert_eq!(doc.fields[0].steps[0].id(), (4, 0));
        assert_eq!(unstructured(&doc, 0).node_families, Some(vec![1, 1, 2, 2]));

        let families = vec![Family::parse("top@@][@@2").unwrap()];
        let groups = vec![Group {
            name: "G".to_string(),
            families: vec!["top".to_string()],
        }];
        put_fam_grp_info_if_any(&mut doc, "solid", &groups, &families);
        assert_eq!(doc.mesh_names(), vec!["solid"]);
        assert_eq!(doc.fields[0].mesh_name, "solid");
        assert_eq!(doc.meshes[0].family_info().families.get("top"), Some(&2));
    }

    #[test]
    fn test_rectilinear_grid() {
        let grid = RectilinearGrid {
            x: DataArray::new("x", 1, Values::F64(vec![0.0, 1.0, 2.0])),
            y: DataArray::new("y", 1, Values::F32(vec![0.0, 1.0])),
            z: DataArray::new("z", 1, Values::F64(vec![0.0])),
            point_data: Attributes::default(),
            cell_data: {
                let mut cd = Attributes::default();
                cd.add(DataArray::new("p", 1, Values::F64(vec![1.0, 2.0])));
                cd
            },
            field_data: Attributes::default(),
        };
        let doc = write_med_from_vtk(&DataSet::Rectilinear(grid).into(), &WriteOptions::default()).unwrap();
        match &*doc.meshes[0] {
            Mesh::Cartesian(m) => assert_eq!(m.node_dims(), vec![3, 2, 1]),
            other => panic!("unexpected mesh {other:?}"),
        }
        assert_eq!(doc.fields[0].steps[0].parts[0].geo, Some(GeoType::Quad4));
    }
}
