//! The field representation tree.
//!
//! Fields of a MED document are split per discretization, then grouped by
//! time steps, mesh and support:
//!
//! ```text
//! TS{i} -> mesh -> ComSup{k} -> [field@@][@@disc, ...]
//! ```
//!
//! Every group of the last level is a [`RepresentationLeaf`] whose arrays
//! can be shown together on one dataset. Exactly one leaf is active when a
//! dataset is requested.

use crate::array;
use crate::array::DataArray;
use crate::array::Values;
use crate::convert;
use crate::med;
use crate::med::FieldMultiTs;
use crate::med::FieldPart;
use crate::med::FieldValues;
use crate::med::GeoType;
use crate::med::MedDocument;
use crate::med::Mesh;
use crate::med::SupportComparator;
use crate::med::SupportSignature;
use crate::med::TimeStep;
use crate::med::TypeOfField;
use crate::time_keeper;
use crate::time_keeper::find_time_step;
use crate::time_keeper::TimeKeeper;
use crate::time_keeper::TimeRequest;
use crate::tiny_info::ExportedTinyInfo;
use crate::vtk::DataSet;
use crate::COM_SUP_STR;
use crate::COMPO_STR_TO_LOCATE_MESH_DA;
use crate::TS_STR;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod elga;
mod geometry;
mod leaf;

pub use elga::elno_offsets;
pub use elga::ElgaCmp;
pub use geometry::cell_shapes;
pub use geometry::Geometry;
pub use leaf::is_field_mesh_regarding_info;
pub use leaf::LeafArray;
pub use leaf::RepresentationLeaf;

/// Prefix added to a mesh pseudo-field name until it no longer collides with
/// a field name.
const KEY_STR_TO_AVOID_COLLIDE: &str = "MESH@";

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// None or several leaves are active.
    NotSingleActivated(usize),

    /// The tree holds no leaf.
    EmptyTree,

    /// No array with this id.
    NoSuchId(usize),

    /// No array with this full name.
    NoSuchName(String),

    /// A support piece refers to a geometric type absent from the mesh.
    NoSuchGeoType { mesh: String, geo: GeoType },

    /// A profile selects a cell that doesn't exist.
    ProfileOutOfRange {
        mesh: String,
        geo: GeoType,
        id: usize,
    },

    /// A time step has no values for a piece of the support.
    MissingPart { field: String, geo: GeoType },

    /// Part ranges go beyond the values of a time step.
    ValuesOutOfRange { field: String },

    /// Only FLOAT64 and INT32 fields can be exported.
    UnsupportedFieldType {
        field: String,
        type_name: &'static str,
    },

    /// A family or number id doesn't fit a 32-bit integer.
    IdOverflow { array: String, value: i64 },

    Med(med::Error),
    TimeKeeper(time_keeper::Error),
    Convert(convert::Error),
    Array(array::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSingleActivated(n) => {
                write!(f, "Only one leaf must be activated ! Having {n} !")
            }
            Error::EmptyTree => write!(f, "the representation tree is empty"),
            Error::NoSuchId(id) => write!(f, "no leaf array with id {id}"),
            Error::NoSuchName(name) => write!(f, "No such a name {name:?} !"),
            Error::NoSuchGeoType { mesh, geo } => {
                write!(f, "mesh {mesh:?} has no cell of type {}", geo.repr())
            }
            Error::ProfileOutOfRange { mesh, geo, id } => write!(
                f,
                "profile on {} of mesh {mesh:?} refers to missing cell #{id}",
                geo.repr()
            ),
            Error::MissingPart { field, geo } => {
                write!(f, "field {field:?} has no values on {}", geo.repr())
            }
            Error::ValuesOutOfRange { field } => {
                write!(f, "field {field:?} has parts out of its values")
            }
            Error::UnsupportedFieldType { field, type_name } => write!(
                f,
                "field {field:?} is {type_name}, only FLOAT64 and INT32 fields are dealt for the moment"
            ),
            Error::IdOverflow { array, value } => {
                write!(f, "value {value} of array {array:?} overflows a 32-bit integer")
            }
            Error::Med(err) => write!(f, "{err}"),
            Error::TimeKeeper(err) => write!(f, "{err}"),
            Error::Convert(err) => write!(f, "{err}"),
            Error::Array(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Med(err) => Some(err),
            Error::TimeKeeper(err) => Some(err),
            Error::Convert(err) => Some(err),
            Error::Array(err) => Some(err),
            _ => None,
        }
    }
}

impl From<med::Error> for Error {
    fn from(err: med::Error) -> Self {
        Error::Med(err)
    }
}

impl From<time_keeper::Error> for Error {
    fn from(err: time_keeper::Error) -> Self {
        Error::TimeKeeper(err)
    }
}

impl From<convert::Error> for Error {
    fn from(err: convert::Error) -> Self {
        Error::Convert(err)
    }
}

impl From<array::Error> for Error {
    fn from(err: array::Error) -> Self {
        Error::Array(err)
    }
}

/// Position of a leaf: time series, mesh, common support.
pub type LeafPos = (usize, usize, usize);

#[derive(Debug)]
struct GeometryCache {
    pos: LeafPos,
    geometry: Arc<Geometry>,
}

#[derive(Debug)]
pub struct RepresentationTree {
    doc: Arc<MedDocument>,
    data: Vec<Vec<Vec<RepresentationLeaf>>>,
    cache: Option<GeometryCache>,
}

impl RepresentationTree {
    /// Builds the tree of a document. Each mesh also gets a pseudo-field so
    /// that it can be selected without any physical field.
    pub fn load_in_memory(mut doc: MedDocument) -> Result<RepresentationTree, Error> {
        let _span = tracing::info_span!(
            "load_in_memory",
            meshes = doc.meshes.len(),
            fields = doc.fields.len()
        )
        .entered();

        for mesh in &doc.meshes {
            if let Mesh::Unstructured(m) = &**mesh {
                m.check_consistency()?;
            }
        }
        for field in &doc.fields {
            doc.mesh(&field.mesh_name)?;
            field.check_consistency()?;
        }
        append_field_from_meshes(&mut doc);
        doc.fields.retain(|field| {
            if field.steps.is_empty() {
                tracing::debug!(field = %field.name, "dropping field without time step");
            }
            !field.steps.is_empty()
        });

        let mut leaves: Vec<(Arc<FieldMultiTs>, Arc<Mesh>)> = Vec::new();
        for mesh in &doc.meshes {
            for field in doc.fields.iter().filter(|f| f.mesh_name == mesh.name()) {
                for single in field.split_discretizations() {
                    if single.presence_of_multi_disc_per_geo_type() {
                        let variants = single.split_multi_discr_per_geo_types();
                        for (k, mut variant) in variants.into_iter().enumerate() {
                            variant.name = format!("{}_{:M>3}", single.name, k);
                            leaves.push((Arc::new(variant), Arc::clone(mesh)));
                        }
                    } else {
                        leaves.push((Arc::new(single), Arc::clone(mesh)));
                    }
                }
            }
        }

        let step_lists: Vec<Vec<(i32, i32)>> = leaves
            .iter()
            .map(|(field, _)| field.step_ids())
            .unique()
            .collect();
        let mut data = Vec::with_capacity(step_lists.len());
        for steps in step_lists {
            let in_ts: Vec<&(Arc<FieldMultiTs>, Arc<Mesh>)> = leaves
                .iter()
                .filter(|(field, _)| field.step_ids() == steps)
                .collect();
            let mesh_names: Vec<&str> = in_ts.iter().map(|(_, mesh)| mesh.name()).unique().collect();
            let mut per_mesh = Vec::with_capacity(mesh_names.len());
            for mesh_name in mesh_names {
                let mut groups: Vec<(SupportComparator, Arc<Mesh>, Vec<LeafArray>)> = Vec::new();
                for (field, mesh) in in_ts.iter().filter(|(_, mesh)| mesh.name() == mesh_name) {
                    let comparator = SupportComparator::new(mesh, field);
                    let array = LeafArray::new(Arc::clone(field));
                    match groups.iter_mut().find(|(c, ..)| c.is_compatible_with(&comparator)) {
                        Some((_, _, arrays)) => arrays.push(array),
                        None => groups.push((comparator, Arc::clone(mesh), vec![array])),
                    }
                }
                per_mesh.push(
                    groups
                        .into_iter()
                        .map(|(comparator, mesh, arrays)| RepresentationLeaf::new(arrays, mesh, comparator))
                        .collect(),
                );
            }
            data.push(per_mesh);
        }

        let mut tree = RepresentationTree {
            doc: Arc::new(doc),
            data,
            cache: None,
        };
        tree.remove_empty_leaves();
        tree.assign_ids();
        tree.compute_full_name_in_leaves();
        tracing::debug!(
            time_series = tree.data.len(),
            arrays = tree.leaves().map(|(_, leaf)| leaf.arrays().len()).sum::<usize>(),
            "representation tree loaded"
        );
        Ok(tree)
    }

    fn remove_empty_leaves(&mut self) {
        for ts in &mut self.data {
            for mesh in ts.iter_mut() {
                mesh.retain(|leaf| !leaf.is_empty());
            }
            ts.retain(|mesh| !mesh.is_empty());
        }
        self.data.retain(|ts| !ts.is_empty());
    }

    fn assign_ids(&mut self) {
        let mut id = 0;
        for leaf in self.data.iter_mut().flatten().flatten() {
            for array in leaf.arrays_mut() {
                array.set_id(&mut id);
            }
        }
    }

    fn compute_full_name_in_leaves(&mut self) {
        for (i, ts) in self.data.iter_mut().enumerate() {
            let ts_name = format!("{TS_STR}{i}");
            for mesh in ts {
                for (k, leaf) in mesh.iter_mut().enumerate() {
                    let com_sup = format!("{COM_SUP_STR}{k}");
                    let mesh_name = leaf.mesh_name().to_string();
                    for array in leaf.arrays_mut() {
                        array.compute_full_name(&ts_name, &mesh_name, &com_sup);
                    }
                }
            }
        }
    }

    /// The document the tree was built from, mesh pseudo-fields included.
    pub fn doc(&self) -> &Arc<MedDocument> {
        &self.doc
    }

    /// Time series, then meshes, then common supports.
    pub fn time_series(&self) -> &[Vec<Vec<RepresentationLeaf>>] {
        &self.data
    }

    /// Every leaf with its position, depth first.
    pub fn leaves(&self) -> impl Iterator<Item = (LeafPos, &RepresentationLeaf)> + '_ {
        self.data.iter().enumerate().flat_map(|(i, ts)| {
            ts.iter().enumerate().flat_map(move |(j, mesh)| {
                mesh.iter()
                    .enumerate()
                    .map(move |(k, leaf)| ((i, j, k), leaf))
            })
        })
    }

    /// Every array of the tree, in id order.
    pub fn arrays(&self) -> impl Iterator<Item = &LeafArray> + '_ {
        self.leaves().flat_map(|(_, leaf)| leaf.arrays().iter())
    }

    pub fn leaf(&self, (i, j, k): LeafPos) -> Option<&RepresentationLeaf> {
        self.data.get(i)?.get(j)?.get(k)
    }

    /// Activates every array of the first leaf.
    pub fn activate_the_first(&mut self) {
        if let Some(leaf) = self.data.iter_mut().flatten().flatten().next() {
            leaf.activate_all_arrays();
        }
    }

    /// Position of the only leaf having an active array.
    pub fn the_single_activated(&self) -> Result<LeafPos, Error> {
        let active: Vec<LeafPos> = self
            .leaves()
            .filter(|(_, leaf)| leaf.is_activated())
            .map(|(pos, _)| pos)
            .collect();
        match active.as_slice() {
            [pos] => Ok(*pos),
            _ => Err(Error::NotSingleActivated(active.len())),
        }
    }

    pub fn active_leaf(&self) -> Result<&RepresentationLeaf, Error> {
        let pos = self.the_single_activated()?;
        self.leaf(pos).ok_or(Error::EmptyTree)
    }

    pub fn get_leaf_arr(&self, id: usize) -> Result<&LeafArray, Error> {
        self.arrays()
            .find(|array| array.id() == id)
            .ok_or(Error::NoSuchId(id))
    }

    /// Full name of an array.
    pub fn name_of(&self, id: usize) -> Result<&str, Error> {
        Ok(self.get_leaf_arr(id)?.full_name())
    }

    pub fn status_of(&self, id: usize) -> Result<bool, Error> {
        Ok(self.get_leaf_arr(id)?.status())
    }

    pub fn id_having_ze_name(&self, name: &str) -> Result<usize, Error> {
        self.arrays()
            .find(|array| array.full_name() == name)
            .map(LeafArray::id)
            .ok_or_else(|| Error::NoSuchName(name.to_string()))
    }

    /// Sets the status of an array and returns whether it changed.
    pub fn change_status_of_and_update_to_have_coherent_vtk_dataset(
        &mut self,
        id: usize,
        status: bool,
    ) -> Result<bool, Error> {
        let array = self
            .data
            .iter_mut()
            .flatten()
            .flatten()
            .flat_map(|leaf| leaf.arrays_mut().iter_mut())
            .find(|array| array.id() == id)
            .ok_or(Error::NoSuchId(id))?;
        Ok(array.set_status(status))
    }

    pub fn max_number_of_time_steps(&self) -> usize {
        self.leaves()
            .map(|(_, leaf)| leaf.number_of_ts())
            .max()
            .unwrap_or(0)
    }

    pub fn active_mesh_name(&self) -> Result<&str, Error> {
        Ok(self.active_leaf()?.mesh_name())
    }

    /// Mesh of the first leaf.
    pub fn dft_mesh_name(&self) -> Result<&str, Error> {
        self.leaves()
            .next()
            .map(|(_, leaf)| leaf.mesh_name())
            .ok_or(Error::EmptyTree)
    }

    /// Published time axis of the active leaf.
    pub fn time_steps(&self, tk: &mut TimeKeeper) -> Result<Vec<f64>, Error> {
        let (times, ids) = self.active_leaf()?.time_steps_in_coarse_med_file_format();
        Ok(tk.time_steps_regarding_policy(&ids, &times)?)
    }

    /// Status of every array, by full name.
    pub fn dump_state(&self) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for (_, leaf) in self.leaves() {
            leaf.dump_state(&mut status);
        }
        status
    }

    pub fn print_my_self(&self) -> String {
        self.to_string()
    }

    /// The dataset of the active leaf at `time`, with its selected arrays.
    ///
    /// In modal mode, every step flagged in `tk` is exported with arrays
    /// suffixed by the step index.
    pub fn build_vtk_instance(
        &mut self,
        modal: bool,
        time: f64,
        tk: &mut TimeKeeper,
        tiny: &mut ExportedTinyInfo,
    ) -> Result<DataSet, Error> {
        let pos = self.the_single_activated()?;
        let leaf = self.leaf(pos).ok_or(Error::EmptyTree)?;
        let _span = tracing::info_span!("build_vtk_instance", mesh = leaf.mesh_name(), modal, time).entered();

        let (times, ids) = leaf.time_steps_in_coarse_med_file_format();
        let times = tk.time_steps_regarding_policy(&ids, &times)?;
        let request = if modal {
            TimeRequest::modal(&tk.vect_of_bool(), times.len())
        } else {
            TimeRequest::Standard {
                step: find_time_step(&times, time)?.0,
            }
        };
        let geometry_step = request.steps().first().copied().unwrap_or(0);
        let signature = leaf
            .comparator()
            .steps
            .get(geometry_step)
            .cloned()
            .unwrap_or_default();
        let mesh = Arc::clone(leaf.mesh());
        let geometry = self.geometry(pos, &mesh, signature)?;

        let doc = Arc::clone(&self.doc);
        let (i, j, k) = pos;
        let leaf = &mut self.data[i][j][k];
        let comparator = leaf.comparator().clone();
        let (arrays, elga) = leaf.arrays_and_elga();
        let mut dataset = geometry.dataset.clone();
        for array in arrays.iter().filter(|array| array.status()) {
            append_fields(
                &doc,
                array.field(),
                &comparator,
                &geometry,
                &request,
                &mut dataset,
                elga,
                tiny,
            )?;
        }

        let (cell_arrays, node_arrays) = geometry.aux_arrays(&mesh)?;
        for array in cell_arrays {
            dataset.cell_data_mut().add(array);
        }
        for array in node_arrays {
            dataset.point_data_mut().add(array);
        }
        Ok(dataset)
    }

    /// The geometry of the leaf at `pos` for `signature`, built on a cache
    /// miss.
    fn geometry(
        &mut self,
        pos: LeafPos,
        mesh: &Mesh,
        signature: SupportSignature,
    ) -> Result<Arc<Geometry>, Error> {
        if let Some(cache) = &self.cache {
            if cache.pos == pos && cache.geometry.signature == signature {
                tracing::trace!("reusing cached geometry");
                return Ok(Arc::clone(&cache.geometry));
            }
        }
        let geometry = Arc::new(Geometry::build(mesh, &signature)?);
        self.cache = Some(GeometryCache {
            pos,
            geometry: Arc::clone(&geometry),
        });
        Ok(geometry)
    }
}

impl fmt::Display for RepresentationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#############################################")?;
        for (i, ts) in self.data.iter().enumerate() {
            writeln!(f, "{TS_STR}{i}")?;
            for mesh in ts {
                for (k, leaf) in mesh.iter().enumerate() {
                    if k == 0 {
                        writeln!(f, "   {}", leaf.mesh_name())?;
                    }
                    writeln!(f, "      Comp{k}")?;
                    write!(f, "{leaf}")?;
                }
            }
        }
        writeln!(f, "$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$$")
    }
}

#[allow(clippy::too_many_arguments)]
fn append_fields(
    doc: &MedDocument,
    field: &FieldMultiTs,
    comparator: &SupportComparator,
    geometry: &Geometry,
    request: &TimeRequest,
    dataset: &mut DataSet,
    elga: &mut ElgaCmp,
    tiny: &mut ExportedTinyInfo,
) -> Result<(), Error> {
    let disc = match field.discretizations().first() {
        Some(disc) => *disc,
        None => return Ok(()),
    };
    let ncomp = field.num_components();
    let name = post_process_field_name(&field.name);
    for &step_id in request.steps() {
        let step = match field.steps.get(step_id) {
            Some(step) => step,
            None => continue,
        };
        if comparator.steps.get(step_id) != Some(&geometry.signature) {
            tracing::warn!(
                field = %field.name,
                step = step_id,
                "support differs from the shown geometry, step skipped"
            );
            continue;
        }
        let values = geometry.gather(&field.name, ncomp, step)?;
        let is_real = matches!(values, Values::F64(_));
        let mut array = DataArray::new(request.array_name(&name, step_id), ncomp, values)
            .with_component_names(field.components.iter().cloned());
        match disc {
            TypeOfField::OnCells => dataset.cell_data_mut().add(array),
            TypeOfField::OnNodes => dataset.point_data_mut().add(array),
            TypeOfField::OnGaussPt => {
                if is_real {
                    let locs = geometry.localizations(step);
                    let (offsets, _) = elga.find_or_create(doc, &locs, geometry, tiny)?;
                    array.info.offsets_name = Some(offsets.name.clone());
                    array.info.quadrature = offsets.info.quadrature.clone();
                    dataset.cell_data_mut().add(offsets);
                }
                dataset.field_data_mut().add(array);
            }
            TypeOfField::OnGaussNe => {
                if is_real {
                    let elno = elno_offsets(&array.name, geometry);
                    array.info.offsets_name = Some(elno.name.clone());
                    array.info.quadrature = elno.info.quadrature.clone();
                    dataset.cell_data_mut().add(elno);
                }
                dataset.field_data_mut().add(array);
            }
        }
    }
    Ok(())
}

/// Collapses runs of `_` and strips them at both ends. A name made only of
/// `_` is kept.
pub fn post_process_field_name(name: &str) -> String {
    let processed = name.split('_').filter(|part| !part.is_empty()).join("_");
    if processed.is_empty() {
        name.to_string()
    } else {
        processed
    }
}

/// `mesh` if no field has this name, else `mesh` prefixed with `MESH@` as
/// many times as needed.
pub fn build_unique_array_name_for_mesh(mesh: &str, fields: &[FieldMultiTs]) -> String {
    let taken = |name: &str| fields.iter().any(|f| f.name == name);
    let mut name = mesh.to_string();
    if !taken(&name) {
        return name;
    }
    name = format!("{KEY_STR_TO_AVOID_COLLIDE}{name}");
    while taken(&name) {
        name = format!("{KEY_STR_TO_AVOID_COLLIDE}{name}");
    }
    name
}

/// Appends one pseudo-field per mesh, holding the index of every cell. A
/// mesh without cell gets a node field instead.
pub fn append_field_from_meshes(doc: &mut MedDocument) {
    for mesh in &doc.meshes {
        let mut parts = Vec::new();
        let mut count = 0;
        for (_, types) in mesh.geo_types_per_level() {
            for geo in types {
                let n = mesh.cell_count(geo);
                parts.push(FieldPart {
                    disc: TypeOfField::OnCells,
                    geo: Some(geo),
                    profile: None,
                    localization: None,
                    range: count..count + n,
                });
                count += n;
            }
        }
        if parts.is_empty() {
            count = mesh.num_nodes();
            if count == 0 {
                continue;
            }
            parts.push(FieldPart {
                disc: TypeOfField::OnNodes,
                geo: None,
                profile: None,
                localization: None,
                range: 0..count,
            });
        }
        let name = build_unique_array_name_for_mesh(mesh.name(), &doc.fields);
        tracing::trace!(mesh = mesh.name(), %name, "mesh pseudo-field");
        let values = (0..count).map(|i| i as i32).collect();
        doc.fields.push(FieldMultiTs {
            name,
            mesh_name: mesh.name().to_string(),
            dt_unit: String::new(),
            components: vec![COMPO_STR_TO_LOCATE_MESH_DA.to_string()],
            steps: vec![TimeStep {
                iteration: -1,
                order: -1,
                time: 0.0,
                parts,
                values: FieldValues::Int32(values),
            }],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::med::Level;
    use crate::med::Localization;
    use crate::med::SupportPiece;
    use crate::med::UMesh;
    use proptest::prelude::*;

    fn square() -> Mesh {
        let mut mesh = UMesh::new("m", 2, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        let mut level = Level::default();
        level.push_cell(GeoType::Tri3, [0, 1, 2]);
        level.push_cell(GeoType::Tri3, [0, 2, 3]);
        mesh.levels.insert(0, level);
        Mesh::Unstructured(mesh)
    }

    fn part(disc: TypeOfField, geo: Option<GeoType>, range: std::ops::Range<usize>) -> FieldPart {
        FieldPart {
            disc,
            geo,
            profile: None,
            localization: None,
            range,
        }
    }

    fn cell_field(name: &str, times: &[f64]) -> FieldMultiTs {
        FieldMultiTs {
            name: name.to_string(),
            mesh_name: "m".to_string(),
            dt_unit: "s".to_string(),
            components: vec!["T".to_string()],
            steps: times
                .iter()
                .enumerate()
                .map(|(i, t)| TimeStep {
                    iteration: i as i32,
                    order: -1,
                    time: *t,
                    parts: vec![part(TypeOfField::OnCells, Some(GeoType::Tri3), 0..2)],
                    values: FieldValues::Float64(vec![10.0 * i as f64, 10.0 * i as f64 + 1.0]),
                })
                .collect(),
        }
    }

    fn doc(fields: Vec<FieldMultiTs>) -> MedDocument {
        MedDocument {
            meshes: vec![Arc::new(square())],
            fields,
            ..MedDocument::default()
        }
    }

    #[test]
    fn test_tree_layout() {
        let tree = RepresentationTree::load_in_memory(doc(vec![
            cell_field("temp", &[0.0, 0.5, 1.0]),
            cell_field("__pres_", &[0.0, 0.5, 1.0]),
            FieldMultiTs {
                steps: Vec::new(),
                ..cell_field("empty", &[])
            },
        ]))
        .unwrap();
        assert_eq!(tree.time_series().len(), 2);
        assert_eq!(tree.name_of(0).unwrap(), "TS0/m/ComSup0/temp@@][@@P0");
        assert_eq!(tree.name_of(1).unwrap(), "TS0/m/ComSup0/__pres_@@][@@P0");
        assert_eq!(tree.name_of(2).unwrap(), "TS1/m/ComSup0/m@@][@@P0");
        assert!(tree.get_leaf_arr(2).unwrap().is_mesh_field());
        assert!(matches!(tree.get_leaf_arr(3), Err(Error::NoSuchId(3))));
        assert_eq!(tree.id_having_ze_name("TS1/m/ComSup0/m@@][@@P0").unwrap(), 2);
        assert_eq!(tree.max_number_of_time_steps(), 3);
        assert_eq!(tree.dft_mesh_name().unwrap(), "m");
        assert_eq!(
            tree.time_series()[0][0][0].human_readable_overview_of_ts(),
            "3 time steps [s]\n(0 (0,-1), 0.5 (1,-1), 1 (2,-1))"
        );
        let printed = tree.print_my_self();
        assert!(printed.contains("      Comp0\n"));
        assert!(printed.contains("TS0/m/ComSup0/temp@@][@@P0 ( )"));
    }

    #[test]
    fn test_single_activated() {
        let mut tree = RepresentationTree::load_in_memory(doc(vec![cell_field("temp", &[0.0])])).unwrap();
        assert!(matches!(tree.the_single_activated(), Err(Error::NotSingleActivated(0))));
        tree.activate_the_first();
        assert_eq!(tree.the_single_activated().unwrap(), (0, 0, 0));
        assert!(tree.change_status_of_and_update_to_have_coherent_vtk_dataset(1, true).unwrap());
        let err = tree.the_single_activated().unwrap_err();
        assert_eq!(err.to_string(), "Only one leaf must be activated ! Having 2 !");
        assert!(!tree.change_status_of_and_update_to_have_coherent_vtk_dataset(1, true).unwrap());
        tree.change_status_of_and_update_to_have_coherent_vtk_dataset(0, false).unwrap();
        assert_eq!(tree.active_mesh_name().unwrap(), "m");
        assert_eq!(tree.dump_state().get("TS0/m/ComSup0/temp@@][@@P0"), Some(&false));
    }

    #[test]
    fn test_request_middle_time() {
        let mut tree = RepresentationTree::load_in_memory(doc(vec![cell_field("temp", &[0.0, 0.5, 1.0])])).unwrap();
        tree.activate_the_first();
        let mut tk = TimeKeeper::new(0);
        let mut tiny = ExportedTinyInfo::default();
        let dataset = tree.build_vtk_instance(false, 0.5, &mut tk, &mut tiny).unwrap();
        assert_eq!(dataset.num_cells(), 2);
        let temp = dataset.cell_data().get("temp").unwrap();
        assert_eq!(temp.values, Values::F64(vec![10.0, 11.0]));
        assert_eq!(temp.component_name(0), Some("T"));
        assert!(tiny.is_empty());

        // A time between steps keeps the previous one.
        let dataset = tree.build_vtk_instance(false, 0.9, &mut tk, &mut tiny).unwrap();
        let temp = dataset.cell_data().get("temp").unwrap();
        assert_eq!(temp.values, Values::F64(vec![10.0, 11.0]));
        assert_eq!(tree.time_steps(&mut tk).unwrap(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_modal_request() {
        let mut tree = RepresentationTree::load_in_memory(doc(vec![cell_field("temp", &[0.0, 0.5, 1.0])])).unwrap();
        tree.activate_the_first();
        let mut tk = TimeKeeper::new(0);
        tk.set_max_number_of_time_steps(tree.max_number_of_time_steps());
        tk.set_time_flag(1, false).unwrap();
        let mut tiny = ExportedTinyInfo::default();
        let dataset = tree.build_vtk_instance(true, 0.0, &mut tk, &mut tiny).unwrap();
        let names: Vec<&str> = dataset.cell_data().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["temp[0]", "temp[2]"]);
    }

    #[test]
    fn test_mesh_pseudo_field() {
        let mut fields = vec![cell_field("m", &[0.0]), cell_field("MESH@m", &[0.0])];
        assert_eq!(build_unique_array_name_for_mesh("m", &fields), "MESH@MESH@m");
        fields.pop();
        assert_eq!(build_unique_array_name_for_mesh("m", &fields), "MESH@m");
        assert_eq!(build_unique_array_name_for_mesh("n", &fields), "n");

        let mut tree = RepresentationTree::load_in_memory(doc(Vec::new())).unwrap();
        assert_eq!(tree.name_of(0).unwrap(), "TS0/m/ComSup0/m@@][@@P0");
        let field = tree.get_leaf_arr(0).unwrap().field();
        assert_eq!(field.step_ids(), vec![(-1, -1)]);
        assert!(is_field_mesh_regarding_info(&field.components));
        tree.activate_the_first();
        let dataset = tree
            .build_vtk_instance(false, 0.0, &mut TimeKeeper::new(0), &mut ExportedTinyInfo::default())
            .unwrap();
        assert_eq!(dataset.cell_data().get("m").unwrap().values, Values::I32(vec![0, 1]));
    }

    #[test]
    fn test_node_only_mesh() {
        let mesh = UMesh::new("pts", 3, vec![0.0; 9]);
        let mut doc = MedDocument {
            meshes: vec![Arc::new(Mesh::Unstructured(mesh))],
            ..MedDocument::default()
        };
        append_field_from_meshes(&mut doc);
        let step = &doc.fields[0].steps[0];
        assert_eq!(step.parts[0].disc, TypeOfField::OnNodes);
        assert_eq!(step.values, FieldValues::Int32(vec![0, 1, 2]));
    }

    #[test]
    fn test_post_process_field_name() {
        assert_eq!(post_process_field_name("temp"), "temp");
        assert_eq!(post_process_field_name("a__b"), "a_b");
        assert_eq!(post_process_field_name("_a_b_"), "a_b");
        assert_eq!(post_process_field_name("___"), "___");
        assert_eq!(post_process_field_name(""), "");
    }

    fn gauss_doc(disc: TypeOfField) -> MedDocument {
        let mut gauss = part(disc, Some(GeoType::Tri3), 0..6);
        if disc == TypeOfField::OnGaussPt {
            gauss.localization = Some("tri3".to_string());
        }
        let field = FieldMultiTs {
            name: "g".to_string(),
            mesh_name: "m".to_string(),
            dt_unit: String::new(),
            components: vec!["s".to_string()],
            steps: vec![TimeStep {
                iteration: 0,
                order: 0,
                time: 0.0,
                parts: vec![gauss],
                values: FieldValues::Float64((0..6).map(f64::from).collect()),
            }],
        };
        let mut doc = doc(vec![field]);
        doc.localizations.insert(
            "tri3".to_string(),
            Localization {
                name: "tri3".to_string(),
                geo: GeoType::Tri3,
                ref_coords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                gauss_coords: vec![0.2, 0.2, 0.6, 0.2, 0.2, 0.6],
                weights: vec![1.0 / 6.0; 3],
            },
        );
        doc
    }

    #[test]
    fn test_gauss_points_export() {
        let mut tree = RepresentationTree::load_in_memory(gauss_doc(TypeOfField::OnGaussPt)).unwrap();
        tree.activate_the_first();
        let mut tiny = ExportedTinyInfo::default();
        let dataset = tree
            .build_vtk_instance(false, 0.0, &mut TimeKeeper::new(0), &mut tiny)
            .unwrap();
        let g = dataset.field_data().get("g").unwrap();
        assert_eq!(g.tuples(), 6);
        assert_eq!(g.info.offsets_name.as_deref(), Some("ELGA@0"));
        let offsets = dataset.cell_data().get("ELGA@0").unwrap();
        assert_eq!(offsets.values, Values::Id(vec![0, 3]));
        assert!(!tiny.is_empty());
    }

    #[test]
    fn test_gauss_ne_export() {
        let mut tree = RepresentationTree::load_in_memory(gauss_doc(TypeOfField::OnGaussNe)).unwrap();
        assert_eq!(tree.name_of(0).unwrap(), "TS0/m/ComSup0/g@@][@@GSSNE");
        tree.activate_the_first();
        let mut tiny = ExportedTinyInfo::default();
        let dataset = tree
            .build_vtk_instance(false, 0.0, &mut TimeKeeper::new(0), &mut tiny)
            .unwrap();
        let g = dataset.field_data().get("g").unwrap();
        assert_eq!(g.info.offsets_name.as_deref(), Some("ELNO@g"));
        assert!(dataset.cell_data().get("ELNO@g").unwrap().info.elno);
        assert!(tiny.is_empty());
    }

    #[test]
    fn test_multi_disc_per_geo_type_variants() {
        let mut a = part(TypeOfField::OnGaussPt, Some(GeoType::Tri3), 0..6);
        a.localization = Some("tri3".to_string());
        let mut b = a.clone();
        b.range = 6..12;
        let field = FieldMultiTs {
            name: "g".to_string(),
            mesh_name: "m".to_string(),
            dt_unit: String::new(),
            components: vec!["s".to_string()],
            steps: vec![TimeStep {
                iteration: 0,
                order: 0,
                time: 0.0,
                parts: vec![a, b],
                values: FieldValues::Float64(vec![0.0; 12]),
            }],
        };
        let tree = RepresentationTree::load_in_memory(doc(vec![field])).unwrap();
        let names: Vec<&str> = tree.arrays().map(LeafArray::ze_name).collect();
        assert_eq!(names, vec!["g_MM0@@][@@GAUSS", "g_MM1@@][@@GAUSS", "m@@][@@P0"]);
    }

    #[test]
    fn test_unsupported_values_fail_at_export() {
        let mut field = cell_field("f", &[0.0]);
        field.steps[0].values = FieldValues::Float32(vec![0.0, 1.0]);
        let mut tree = RepresentationTree::load_in_memory(doc(vec![field])).unwrap();
        tree.activate_the_first();
        let err = tree
            .build_vtk_instance(false, 0.0, &mut TimeKeeper::new(0), &mut ExportedTinyInfo::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFieldType { type_name: "FLOAT32", .. }));
    }

    #[test]
    fn test_missing_mesh() {
        let mut field = cell_field("f", &[0.0]);
        field.mesh_name = "nope".to_string();
        assert!(matches!(
            RepresentationTree::load_in_memory(doc(vec![field])),
            Err(Error::Med(med::Error::NoSuchMesh(_)))
        ));
    }

    /// Support of field `i`: every cell, the first one or the second one.
    fn support(choice: u8) -> Option<Vec<usize>> {
        match choice {
            0 => None,
            1 => Some(vec![0]),
            _ => Some(vec![1]),
        }
    }

    proptest! {
        #[test]
        fn test_grouping_follows_supports(choices in prop::collection::vec(0u8..3, 1..8)) {
            let fields = choices
                .iter()
                .enumerate()
                .map(|(i, choice)| {
                    let profile = support(*choice);
                    let n = profile.as_ref().map_or(2, Vec::len);
                    FieldMultiTs {
                        name: format!("f{i}"),
                        steps: vec![TimeStep {
                            iteration: 0,
                            order: 0,
                            time: 0.0,
                            parts: vec![FieldPart {
                                profile,
                                ..part(TypeOfField::OnCells, Some(GeoType::Tri3), 0..n)
                            }],
                            values: FieldValues::Float64(vec![0.0; n]),
                        }],
                        ..cell_field("", &[])
                    }
                })
                .collect();
            let tree = RepresentationTree::load_in_memory(doc(fields)).unwrap();
            let position = |name: &str| {
                tree.leaves()
                    .find(|(_, leaf)| leaf.arrays().iter().any(|a| a.field().name == name))
                    .map(|(pos, _)| pos)
                    .unwrap()
            };
            for (i, a) in choices.iter().enumerate() {
                for (j, b) in choices.iter().enumerate() {
                    let same = position(&format!("f{i}")) == position(&format!("f{j}"));
                    prop_assert_eq!(same, a == b);
                }
            }
            let pieces = &tree.leaf(position("f0")).unwrap().comparator().steps[0].pieces;
            prop_assert_eq!(
                pieces,
                &vec![SupportPiece { geo: GeoType::Tri3, profile: support(choices[0]) }]
            );
        }
    }
}
