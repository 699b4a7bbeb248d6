use super::elga::ElgaCmp;
use crate::med::FieldMultiTs;
use crate::med::GeoType;
use crate::med::Mesh;
use crate::med::SupportComparator;
use crate::COMPO_STR_TO_LOCATE_MESH_DA;
use crate::ZE_SEP;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maximum length of a time series overview before it gets truncated.
const OVERVIEW_MAX_LEN: usize = 200;

/// One selectable field of the tree, with a single discretization.
#[derive(Debug)]
pub struct LeafArray {
    field: Arc<FieldMultiTs>,
    ze_name: String,
    full_name: String,
    id: usize,
    status: bool,
}

impl LeafArray {
    pub fn new(field: Arc<FieldMultiTs>) -> LeafArray {
        let disc = field
            .discretizations()
            .first()
            .map_or("", |disc| disc.repr());
        let ze_name = format!("{}{ZE_SEP}{disc}", field.name);
        LeafArray {
            field,
            ze_name,
            full_name: String::new(),
            id: 0,
            status: false,
        }
    }

    pub fn field(&self) -> &FieldMultiTs {
        &self.field
    }

    /// `{field}@@][@@{disc}`.
    pub fn ze_name(&self) -> &str {
        &self.ze_name
    }

    /// `TS{i}/{mesh}/ComSup{k}/{ze_name}`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> bool {
        self.status
    }

    /// Returns whether the status changed.
    pub fn set_status(&mut self, status: bool) -> bool {
        let changed = self.status != status;
        self.status = status;
        changed
    }

    /// Whether this is the pseudo-field standing for a mesh.
    pub fn is_mesh_field(&self) -> bool {
        is_field_mesh_regarding_info(&self.field.components)
    }

    pub(super) fn set_id(&mut self, id: &mut usize) {
        self.id = *id;
        *id += 1;
    }

    pub(super) fn compute_full_name(&mut self, ts: &str, mesh: &str, com_sup: &str) {
        self.full_name = format!("{ts}/{mesh}/{com_sup}/{}", self.ze_name);
    }
}

/// Whether components describe a mesh pseudo-field.
pub fn is_field_mesh_regarding_info(components: &[String]) -> bool {
    components.len() == 1 && components[0] == COMPO_STR_TO_LOCATE_MESH_DA
}

/// Fields sharing time steps, mesh and support. They are shown together on
/// one dataset.
#[derive(Debug)]
pub struct RepresentationLeaf {
    arrays: Vec<LeafArray>,
    mesh: Arc<Mesh>,
    comparator: SupportComparator,
    elga: ElgaCmp,
}

impl RepresentationLeaf {
    pub(super) fn new(
        arrays: Vec<LeafArray>,
        mesh: Arc<Mesh>,
        comparator: SupportComparator,
    ) -> RepresentationLeaf {
        RepresentationLeaf {
            arrays,
            mesh,
            comparator,
            elga: ElgaCmp::default(),
        }
    }

    pub fn arrays(&self) -> &[LeafArray] {
        &self.arrays
    }

    pub(super) fn arrays_mut(&mut self) -> &mut [LeafArray] {
        &mut self.arrays
    }

    pub(super) fn arrays_and_elga(&mut self) -> (&[LeafArray], &mut ElgaCmp) {
        (&self.arrays, &mut self.elga)
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn mesh_name(&self) -> &str {
        self.mesh.name()
    }

    pub fn comparator(&self) -> &SupportComparator {
        &self.comparator
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Whether any array of the leaf is selected.
    pub fn is_activated(&self) -> bool {
        self.arrays.iter().any(LeafArray::status)
    }

    pub fn activate_all_arrays(&mut self) {
        for array in &mut self.arrays {
            array.set_status(true);
        }
    }

    pub fn contains_id(&self, id: usize) -> bool {
        self.arrays.iter().any(|a| a.id == id)
    }

    pub fn number_of_ts(&self) -> usize {
        self.arrays.first().map_or(0, |a| a.field.steps.len())
    }

    /// Time values and (iteration, order) of the steps of the leaf.
    pub fn time_steps_in_coarse_med_file_format(&self) -> (Vec<f64>, Vec<(i32, i32)>) {
        match self.arrays.first() {
            Some(array) => (
                array.field.steps.iter().map(|s| s.time).collect(),
                array.field.step_ids(),
            ),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// `"{n} time steps [{unit}]\n(t0 (it0,or0), ...)"`.
    pub fn human_readable_overview_of_ts(&self) -> String {
        let (times, ids) = self.time_steps_in_coarse_med_file_format();
        let unit = self.arrays.first().map_or("", |a| a.field.dt_unit.as_str());
        let mut text = format!("{} time steps [{unit}]\n(", times.len());
        for (i, (t, (it, order))) in times.iter().zip(&ids).enumerate() {
            text.push_str(&format!("{t} ({it},{order})"));
            let last = i + 1 == times.len();
            if !last {
                text.push_str(", ");
                if text.len() > OVERVIEW_MAX_LEN {
                    text.push_str("...");
                    break;
                }
            }
        }
        text.push(')');
        text
    }

    /// Geometric types of the support at the first step.
    pub fn geo_types(&self) -> Vec<GeoType> {
        match self.comparator.steps.first() {
            Some(signature) => signature.pieces.iter().map(|p| p.geo).collect(),
            None => Vec::new(),
        }
    }

    pub fn dump_state(&self, status: &mut BTreeMap<String, bool>) {
        for array in &self.arrays {
            status.insert(array.full_name.clone(), array.status);
        }
    }
}

impl fmt::Display for RepresentationLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for array in &self.arrays {
            let mark = if array.status { "X" } else { " " };
            writeln!(f, "         - {} ({mark})", array.full_name)?;
        }
        Ok(())
    }
}
