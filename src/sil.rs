//! The selection graph published next to the reader output.
//!
//! It lists the time series, meshes, common supports and arrays of the
//! representation tree under `FieldsStatusTree`, and the groups and families
//! of the active mesh under `MeshesFamsGrps`. Consumers such as group
//! extraction only see this graph, through [`GroupSelection`].

use crate::med::GeoType;
use crate::tree;
use crate::tree::RepresentationLeaf;
use crate::tree::RepresentationTree;
use crate::COM_SUP_STR;
use crate::ROOT_OF_FAM_IDS_IN_TREE;
use crate::ROOT_OF_GRPS_IN_TREE;
use crate::TS_STR;
use crate::ZE_SEP;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

const ROOT: &str = "SIL";
const FIELDS_ROOT: &str = "FieldsStatusTree";
const FAMS_GRPS_ROOT: &str = "MeshesFamsGrps";
const GRP_START: &str = "GRP_";
const FAM_START: &str = "FAM_";

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The graph doesn't have the layout the reader produces.
    UnexpectedLayout(&'static str),

    /// A selection key matches no group nor family.
    NoSuchEntry(String),

    /// A family vertex is not `name@@][@@id`.
    BadFamily(String),

    Tree(tree::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedLayout(what) => write!(
                f,
                "There is an internal error ! The tree on server side has not the expected look ({what})"
            ),
            Error::NoSuchEntry(key) => write!(f, "no such entry {key:?}"),
            Error::BadFamily(name) => write!(f, "malformed family entry {name:?}"),
            Error::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<tree::Error> for Error {
    fn from(err: tree::Error) -> Self {
        Error::Tree(err)
    }
}

/// A tree of named vertices. Vertex 0 is the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sil {
    names: Vec<String>,
    children: Vec<Vec<usize>>,
}

impl Default for Sil {
    fn default() -> Self {
        Sil {
            names: vec![ROOT.to_string()],
            children: vec![Vec::new()],
        }
    }
}

impl Sil {
    /// The graph of `tree`, whose groups and families are those of the mesh
    /// of the active leaf.
    pub fn build(tree: &RepresentationTree) -> Result<Sil, Error> {
        let mut sil = Sil::default();
        let fields = sil.add_child(0, FIELDS_ROOT);
        sil.feed_fields(tree, fields);
        let fams_grps = sil.add_child(0, FAMS_GRPS_ROOT);
        sil.feed_fams_and_grps(tree, fams_grps)?;
        tracing::trace!(vertices = sil.len(), "built selection graph");
        Ok(sil)
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn add_child(&mut self, parent: usize, name: impl Into<String>) -> usize {
        let id = self.names.len();
        self.names.push(name.into());
        self.children.push(Vec::new());
        self.children[parent].push(id);
        id
    }

    pub fn name(&self, vertex: usize) -> &str {
        &self.names[vertex]
    }

    pub fn children(&self, vertex: usize) -> &[usize] {
        &self.children[vertex]
    }

    /// Names of the children of `vertex`.
    pub fn child_names(&self, vertex: usize) -> impl Iterator<Item = &str> + '_ {
        self.children[vertex].iter().map(|c| self.names[*c].as_str())
    }

    /// First vertex named `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn feed_fields(&mut self, tree: &RepresentationTree, root: usize) {
        for (i, ts) in tree.time_series().iter().enumerate() {
            let first = match ts.first().and_then(|mesh| mesh.first()) {
                Some(leaf) => leaf,
                None => continue,
            };
            let info = self.add_child(root, first.human_readable_overview_of_ts());
            let (times, ids) = first.time_steps_in_coarse_med_file_format();
            let count = self.add_child(info, ids.len().to_string());
            for (t, (it, order)) in times.iter().zip(&ids) {
                let it = self.add_child(count, it.to_string());
                let order = self.add_child(it, order.to_string());
                self.add_child(order, t.to_string());
            }

            let ts_id = self.add_child(root, format!("{TS_STR}{i}"));
            for mesh in ts {
                let mesh_name = mesh.first().map_or("", RepresentationLeaf::mesh_name);
                let mesh_id = self.add_child(ts_id, mesh_name);
                for (k, leaf) in mesh.iter().enumerate() {
                    let com_sup = self.add_child(mesh_id, format!("{COM_SUP_STR}{k}"));
                    self.feed_leaf(leaf, com_sup);
                }
            }
        }
    }

    fn feed_leaf(&mut self, leaf: &RepresentationLeaf, root: usize) {
        let arrs = self.add_child(root, "Arrs");
        for array in leaf.arrays() {
            let id = self.add_child(arrs, array.ze_name());
            if array.is_mesh_field() {
                self.add_child(id, "");
            }
        }
        let geo_types = self.add_child(root, "InfoOnGeoType");
        for geo in leaf.geo_types() {
            self.add_child(geo_types, short_repr(geo));
        }
    }

    fn feed_fams_and_grps(&mut self, tree: &RepresentationTree, root: usize) -> Result<(), Error> {
        let mesh_name = tree.active_mesh_name()?;
        let mesh = tree.doc().mesh(mesh_name).map_err(tree::Error::from)?;
        let info = mesh.family_info();
        let mesh_id = self.add_child(root, mesh_name);

        let grps = self.add_child(mesh_id, ROOT_OF_GRPS_IN_TREE);
        for (group, families) in &info.groups {
            let group_id = self.add_child(grps, group.as_str());
            for family in families {
                self.add_child(group_id, family.as_str());
            }
        }
        let fams = self.add_child(mesh_id, ROOT_OF_FAM_IDS_IN_TREE);
        for (family, id) in &info.families {
            self.add_child(fams, format!("{family}{ZE_SEP}{id}"));
        }
        Ok(())
    }
}

/// `NORM_TRI3` -> `TRI3`.
fn short_repr(geo: GeoType) -> &'static str {
    let repr = geo.repr();
    repr.strip_prefix("NORM_").unwrap_or(repr)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct GroupEntry {
    name: String,
    key: String,
    families: Vec<String>,
    status: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FamilyEntry {
    name: String,
    key: String,
    id: i64,
    status: bool,
}

/// Groups and families of the mesh described by a selection graph, with
/// their selection status.
///
/// Groups are keyed `GRP_{group}` and families `FAM_{family}@@][@@{id}`.
#[derive(Clone, Debug, Default)]
pub struct GroupSelection {
    mesh_name: String,
    groups: Vec<GroupEntry>,
    families: Vec<FamilyEntry>,
    /// Status changes, applied when ids are computed.
    selection: Vec<(String, bool)>,
}

impl GroupSelection {
    /// Whether the graph carries groups and families.
    pub fn is_information_ok(sil: &Sil) -> bool {
        sil.find(FAMS_GRPS_ROOT).is_some()
    }

    /// Reads the groups and families of `sil`. Statuses are kept when the
    /// groups and families are the same as before.
    pub fn load_from(&mut self, sil: &Sil) -> Result<(), Error> {
        let root = sil
            .find(FAMS_GRPS_ROOT)
            .ok_or(Error::UnexpectedLayout(FAMS_GRPS_ROOT))?;
        let mut groups = Vec::new();
        let mut families = Vec::new();
        for &mesh in sil.children(root) {
            self.mesh_name = sil.name(mesh).to_string();
            let (grps, fams) = match sil.children(mesh) {
                [grps, fams, ..] => (*grps, *fams),
                _ => return Err(Error::UnexpectedLayout("mesh without groups or families")),
            };
            for &group in sil.children(grps) {
                let name = sil.name(group).to_string();
                groups.push(GroupEntry {
                    key: format!("{GRP_START}{name}"),
                    name,
                    families: sil.child_names(group).map(str::to_string).collect(),
                    status: false,
                });
            }
            for &family in sil.children(fams) {
                let encoded = sil.name(family);
                let (name, id) = encoded
                    .split_once(ZE_SEP)
                    .ok_or_else(|| Error::BadFamily(encoded.to_string()))?;
                let id = id
                    .parse()
                    .map_err(|_| Error::BadFamily(encoded.to_string()))?;
                families.push(FamilyEntry {
                    name: name.to_string(),
                    key: format!("{FAM_START}{encoded}"),
                    id,
                    status: false,
                });
            }
        }

        let same = groups.len() == self.groups.len()
            && families.len() == self.families.len()
            && groups.iter().zip(&self.groups).all(|(a, b)| {
                a.name == b.name && a.key == b.key && a.families == b.families
            })
            && families
                .iter()
                .zip(&self.families)
                .all(|(a, b)| a.name == b.name && a.key == b.key && a.id == b.id);
        if same {
            for (new, old) in groups.iter_mut().zip(&self.groups) {
                new.status = old.status;
            }
            for (new, old) in families.iter_mut().zip(&self.families) {
                new.status = old.status;
            }
        }
        self.groups = groups;
        self.families = families;
        Ok(())
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    pub fn number_of_entries(&self) -> usize {
        self.groups.len() + self.families.len()
    }

    /// Key of the `i`-th entry, groups first.
    pub fn key_of_entry(&self, i: usize) -> Option<&str> {
        match self.groups.get(i) {
            Some(group) => Some(&group.key),
            None => self
                .families
                .get(i - self.groups.len())
                .map(|f| f.key.as_str()),
        }
    }

    pub fn status_of_entry(&self, key: &str) -> Result<bool, Error> {
        if let Some(group) = self.groups.iter().find(|g| g.key == key) {
            return Ok(group.status);
        }
        self.families
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.status)
            .ok_or_else(|| Error::NoSuchEntry(key.to_string()))
    }

    /// Records a status change, applied by [`GroupSelection::ids_to_keep`].
    pub fn set_status_of_entry(&mut self, key: impl Into<String>, status: bool) {
        self.selection.push((key.into(), status));
    }

    /// Forgets every status.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        for group in &mut self.groups {
            group.status = false;
        }
        for family in &mut self.families {
            family.status = false;
        }
    }

    /// Family ids of the selected groups and families.
    pub fn ids_to_keep(&mut self) -> Result<BTreeSet<i64>, Error> {
        for (key, status) in std::mem::take(&mut self.selection) {
            if let Some(group) = self.groups.iter_mut().find(|g| g.key == key) {
                group.status = status;
            } else if let Some(family) = self.families.iter_mut().find(|f| f.key == key) {
                family.status = status;
            } else {
                return Err(Error::NoSuchEntry(key));
            }
        }
        let ids = self.family_ids();
        let mut keep = BTreeSet::new();
        for group in self.groups.iter().filter(|g| g.status) {
            keep.extend(group.families.iter().filter_map(|f| ids.get(f.as_str())));
        }
        keep.extend(self.families.iter().filter(|f| f.status).map(|f| f.id));
        Ok(keep)
    }

    /// Every group with the ids of its families. Unknown families get
    /// `i32::MAX`.
    pub fn all_groups(&self) -> Vec<(String, Vec<i64>)> {
        let ids = self.family_ids();
        self.groups
            .iter()
            .map(|g| {
                let family_ids = g
                    .families
                    .iter()
                    .map(|f| ids.get(f.as_str()).copied().unwrap_or(i64::from(i32::MAX)))
                    .collect();
                (g.name.clone(), family_ids)
            })
            .collect()
    }

    fn family_ids(&self) -> BTreeMap<&str, i64> {
        self.families
            .iter()
            .map(|f| (f.name.as_str(), f.id))
            .collect()
    }
}

impl fmt::Display for Sil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self.root(), 0)];
        while let Some((vertex, depth)) = stack.pop() {
            writeln!(f, "{:width$}{}", "", self.names[vertex], width = 2 * depth)?;
            stack.extend(self.children[vertex].iter().rev().map(|c| (*c, depth + 1)));
        }
        Ok(())
    }
}

impl fmt::Display for GroupSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |status: bool| if status { "X" } else { " " };
        writeln!(f, "Groups :")?;
        for group in &self.groups {
            writeln!(f, "      -{}({})", group.key, mark(group.status))?;
        }
        writeln!(f, "Families :")?;
        for family in &self.families {
            writeln!(
                f,
                "      -{} famName : \"{}\" id : {} ({})",
                family.key,
                family.name,
                family.id,
                mark(family.status)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::med::FieldMultiTs;
    use crate::med::FieldPart;
    use crate::med::FieldValues;
    use crate::med::Level;
    use crate::med::MedDocument;
    use crate::med::Mesh;
    use crate::med::TimeStep;
    use crate::med::TypeOfField;
    use crate::med::UMesh;
    use std::sync::Arc;

    fn tree() -> RepresentationTree {
        let mut mesh = UMesh::new("m", 2, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        let mut level = Level::default();
        level.push_cell(GeoType::Tri3, [0, 1, 2]);
        level.push_cell(GeoType::Quad4, [0, 1, 2, 3]);
        mesh.levels.insert(0, level);
        mesh.family_info.families.insert("F1".to_string(), -1);
        mesh.family_info.families.insert("F2".to_string(), -2);
        mesh.family_info.families.insert("FAMILLE_ZERO".to_string(), 0);
        mesh.family_info
            .groups
            .insert("G".to_string(), vec!["F1".to_string(), "F2".to_string()]);
        mesh.family_info
            .groups
            .insert("H".to_string(), vec!["F2".to_string()]);
        let field = FieldMultiTs {
            name: "T".to_string(),
            mesh_name: "m".to_string(),
            dt_unit: "s".to_string(),
            components: vec!["T".to_string()],
            steps: [0.0, 0.5]
                .iter()
                .enumerate()
                .map(|(i, t)| TimeStep {
                    iteration: i as i32,
                    order: -1,
                    time: *t,
                    parts: vec![
                        FieldPart {
                            disc: TypeOfField::OnCells,
                            geo: Some(GeoType::Tri3),
                            profile: None,
                            localization: None,
                            range: 0..1,
                        },
                        FieldPart {
                            disc: TypeOfField::OnCells,
                            geo: Some(GeoType::Quad4),
                            profile: None,
                            localization: None,
                            range: 1..2,
                        },
                    ],
                    values: FieldValues::Float64(vec![1.0, 2.0]),
                })
                .collect(),
        };
        let doc = MedDocument {
            meshes: vec![Arc::new(Mesh::Unstructured(mesh))],
            fields: vec![field],
            ..MedDocument::default()
        };
        let mut tree = RepresentationTree::load_in_memory(doc).unwrap();
        tree.activate_the_first();
        tree
    }

    #[test]
    fn test_layout() {
        let sil = Sil::build(&tree()).unwrap();
        assert_eq!(sil.name(sil.root()), "SIL");
        let top: Vec<&str> = sil.child_names(0).collect();
        assert_eq!(top, ["FieldsStatusTree", "MeshesFamsGrps"]);

        let fields = sil.find("FieldsStatusTree").unwrap();
        let series: Vec<&str> = sil.child_names(fields).collect();
        assert_eq!(series.len(), 4);
        assert_eq!(series[0], "2 time steps [s]\n(0 (0,-1), 0.5 (1,-1))");
        assert_eq!(series[1], "TS0");

        let count = sil.children(sil.children(fields)[0])[0];
        assert_eq!(sil.name(count), "2");
        let dt = sil.children(count)[1];
        assert_eq!(sil.name(dt), "1");
        let order = sil.children(dt)[0];
        assert_eq!(sil.name(order), "-1");
        assert_eq!(sil.child_names(order).collect::<Vec<_>>(), ["0.5"]);

        let arrs = sil.find("Arrs").unwrap();
        let names: Vec<&str> = sil.child_names(arrs).collect();
        assert_eq!(names, ["T@@][@@P0"]);
        let geo = sil.find("InfoOnGeoType").unwrap();
        assert_eq!(sil.child_names(geo).collect::<Vec<_>>(), ["TRI3", "QUAD4"]);

        let grps = sil.find("zeGrps").unwrap();
        assert_eq!(sil.child_names(grps).collect::<Vec<_>>(), ["G", "H"]);
        let fams = sil.find("zeFamIds").unwrap();
        assert_eq!(
            sil.child_names(fams).collect::<Vec<_>>(),
            ["F1@@][@@-1", "F2@@][@@-2", "FAMILLE_ZERO@@][@@0"]
        );
    }

    #[test]
    fn test_mesh_array_marker() {
        let sil = Sil::build(&tree()).unwrap();
        // The second time series is the mesh pseudo-field.
        let arrs: Vec<usize> = (0..sil.len()).filter(|v| sil.name(*v) == "Arrs").collect();
        assert_eq!(arrs.len(), 2);
        let mesh_array = sil.children(arrs[1])[0];
        assert_eq!(sil.child_names(mesh_array).collect::<Vec<_>>(), [""]);
        let field_array = sil.children(arrs[0])[0];
        assert!(sil.children(field_array).is_empty());
    }

    #[test]
    fn test_group_selection() {
        let sil = Sil::build(&tree()).unwrap();
        assert!(GroupSelection::is_information_ok(&sil));
        let mut selection = GroupSelection::default();
        selection.load_from(&sil).unwrap();
        assert_eq!(selection.mesh_name(), "m");
        assert_eq!(selection.number_of_entries(), 5);
        assert_eq!(selection.key_of_entry(0), Some("GRP_G"));
        assert_eq!(selection.key_of_entry(2), Some("FAM_F1@@][@@-1"));
        assert_eq!(selection.key_of_entry(5), None);

        selection.set_status_of_entry("GRP_H", true);
        selection.set_status_of_entry("FAM_FAMILLE_ZERO@@][@@0", true);
        let ids = selection.ids_to_keep().unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), [-2, 0]);
        assert!(selection.status_of_entry("GRP_H").unwrap());

        // Reloading the same graph keeps statuses.
        selection.load_from(&sil).unwrap();
        assert!(selection.status_of_entry("GRP_H").unwrap());

        selection.set_status_of_entry("GRP_nope", true);
        assert_eq!(
            selection.ids_to_keep(),
            Err(Error::NoSuchEntry("GRP_nope".to_string()))
        );

        assert_eq!(
            selection.all_groups(),
            vec![("G".to_string(), vec![-1, -2]), ("H".to_string(), vec![-2])]
        );
        selection.clear_selection();
        assert!(selection.ids_to_keep().unwrap().is_empty());
    }

    #[test]
    fn test_display_indents_children() {
        let mut sil = Sil::default();
        let a = sil.add_child(0, "a");
        sil.add_child(a, "b");
        sil.add_child(0, "c");
        assert_eq!(sil.to_string(), "SIL\n  a\n    b\n  c\n");
    }

    #[test]
    fn test_no_group_information() {
        let mut sil = Sil::default();
        sil.add_child(0, "FieldsStatusTree");
        assert!(!GroupSelection::is_information_ok(&sil));
        assert!(matches!(
            GroupSelection::default().load_from(&sil),
            Err(Error::UnexpectedLayout(_))
        ));
    }
}
