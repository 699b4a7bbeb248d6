//! The reader: selection state over a loaded document and dataset
//! production.
//!
//! A [`MedReader`] owns the representation tree of a document, the time
//! keeper and the selection graph. Hosts drive it the way a pipeline drives
//! a source: change the selection, ask for the published time steps, then
//! request the data at a time. Side-channel metadata goes to the
//! [`Registry`] passed to [`MedReader::request_data`].

use crate::med::MedDocument;
use crate::registry::GaussData;
use crate::registry::MetaData;
use crate::registry::Registry;
use crate::sil;
use crate::sil::Sil;
use crate::time_keeper;
use crate::time_keeper::TimeKeeper;
use crate::tiny_info::ExportedTinyInfo;
use crate::tree;
use crate::tree::RepresentationTree;
use crate::vectors::generate_vectors;
use crate::vtk::CellArray;
use crate::vtk::CellType;
use crate::vtk::DataObject;
use crate::vtk::DataSet;
use crate::vtk::MultiBlock;
use crate::vtk::UnstructuredGrid;
use crate::ZE_SEP;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    Tree(tree::Error),
    Sil(sil::Error),
    TimeKeeper(time_keeper::Error),

    /// The active leaf publishes no time step.
    NoTimeSteps,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tree(err) => write!(f, "{err}"),
            Error::Sil(err) => write!(f, "{err}"),
            Error::TimeKeeper(err) => write!(f, "{err}"),
            Error::NoTimeSteps => write!(f, "the selected fields have no time step"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Tree(err) => Some(err),
            Error::Sil(err) => Some(err),
            Error::TimeKeeper(err) => Some(err),
            Error::NoTimeSteps => None,
        }
    }
}

impl From<tree::Error> for Error {
    fn from(err: tree::Error) -> Self {
        Error::Tree(err)
    }
}

impl From<sil::Error> for Error {
    fn from(err: sil::Error) -> Self {
        Error::Sil(err)
    }
}

impl From<time_keeper::Error> for Error {
    fn from(err: time_keeper::Error) -> Self {
        Error::TimeKeeper(err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Time axis policy, see [`TimeKeeper`].
    pub time_policy: i32,
    /// Export every flagged time step at once instead of the requested one.
    pub modal: bool,
    /// Add 3-component companions of 2 and more than 3 component arrays.
    pub generate_vectors: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        ReaderSettings {
            time_policy: 0,
            modal: false,
            generate_vectors: false,
        }
    }
}

/// Published time information.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeInformation {
    pub steps: Vec<f64>,
    pub range: (f64, f64),
}

#[derive(Debug)]
pub struct MedReader {
    doc: Arc<MedDocument>,
    settings: ReaderSettings,
    tree: RepresentationTree,
    tk: TimeKeeper,
    /// The selection graph and the mesh its groups belong to.
    sil: Option<(String, Arc<Sil>)>,
    /// Arrays already set in the current series of status changes.
    pending: BTreeSet<String>,
    /// Statuses before the current series of status changes.
    reference: BTreeMap<String, bool>,
    modification_time: usize,
}

impl MedReader {
    /// Loads `doc`, activates the first leaf and sizes the time flags.
    pub fn from_document(doc: MedDocument, settings: ReaderSettings) -> Result<MedReader, Error> {
        let doc = Arc::new(doc);
        let (tree, tk) = load(&doc, &settings)?;
        Ok(MedReader {
            doc,
            settings,
            tree,
            tk,
            sil: None,
            pending: BTreeSet::new(),
            reference: BTreeMap::new(),
            modification_time: 0,
        })
    }

    /// Starts over from the loaded document, forgetting every selection.
    pub fn reload(&mut self) -> Result<(), Error> {
        let _enter = tracing::info_span!("reload").entered();
        let (tree, tk) = load(&self.doc, &self.settings)?;
        self.tree = tree;
        self.tk = tk;
        self.sil = None;
        self.pending.clear();
        self.reference.clear();
        self.modification_time += 1;
        Ok(())
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn tree(&self) -> &RepresentationTree {
        &self.tree
    }

    /// Bumped whenever the output would change.
    pub fn modification_time(&self) -> usize {
        self.modification_time
    }

    /// The separator between field names and discretizations.
    pub fn separator() -> &'static str {
        ZE_SEP
    }

    /// Full names of every selectable array, in id order.
    pub fn field_names(&self) -> Vec<&str> {
        self.tree.arrays().map(|a| a.full_name()).collect()
    }

    pub fn field_status(&self, name: &str) -> Result<bool, Error> {
        let id = self.tree.id_having_ze_name(name)?;
        Ok(self.tree.status_of(id)?)
    }

    /// Sets the status of the array named `name`.
    ///
    /// Hosts set every array in a row. Once all of them are set, the
    /// modification time is bumped if any status differs from the start of
    /// the series.
    pub fn set_fields_status(&mut self, name: &str, status: bool) -> Result<(), Error> {
        if self.pending.is_empty() {
            self.reference = self.tree.dump_state();
        }
        self.pending.insert(name.to_string());
        let id = self.tree.id_having_ze_name(name)?;
        self.tree
            .change_status_of_and_update_to_have_coherent_vtk_dataset(id, status)?;
        if self.pending.len() == self.tree.arrays().count() {
            if self.reference != self.tree.dump_state() {
                tracing::debug!("field selection changed");
                self.modification_time += 1;
            }
            self.pending.clear();
        }
        Ok(())
    }

    /// `(status, label)` of every time step, for the modal mode.
    pub fn times_flags(&self) -> &[(bool, String)] {
        self.tk.times_flags()
    }

    pub fn set_times_flags_status(&mut self, index: usize, status: bool) -> Result<(), Error> {
        self.tk.set_time_flag(index, status)?;
        if index + 1 == self.tk.times_flags().len() {
            self.modification_time += 1;
        }
        Ok(())
    }

    pub fn change_mode(&mut self, modal: bool) {
        if self.settings.modal != modal {
            self.settings.modal = modal;
            self.modification_time += 1;
        }
    }

    pub fn set_generate_vectors(&mut self, generate: bool) {
        if self.settings.generate_vectors != generate {
            self.settings.generate_vectors = generate;
            self.modification_time += 1;
        }
    }

    /// The selection graph, rebuilt when the active mesh changed.
    pub fn sil(&mut self) -> Result<Arc<Sil>, Error> {
        let mesh = self.tree.active_mesh_name()?;
        if let Some((built_for, sil)) = &self.sil {
            if built_for == mesh {
                return Ok(Arc::clone(sil));
            }
        }
        let sil = Arc::new(Sil::build(&self.tree)?);
        self.sil = Some((mesh.to_string(), Arc::clone(&sil)));
        Ok(sil)
    }

    /// Published time steps: those of the active leaf, or a single `0.0` in
    /// modal mode.
    pub fn request_information(&mut self) -> Result<TimeInformation, Error> {
        self.sil()?;
        let steps = if self.settings.modal {
            vec![0.0]
        } else {
            self.tree.time_steps(&mut self.tk)?
        };
        let range = match (steps.first(), steps.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(Error::NoTimeSteps),
        };
        Ok(TimeInformation { steps, range })
    }

    /// The selected arrays at `time`.
    ///
    /// Block 0 is the support dataset. A support with nodes but no cells
    /// gets a second block holding one vertex per node. Gauss localizations
    /// and the selection graph are published into `registry`.
    pub fn request_data(&mut self, time: f64, registry: &mut Registry) -> Result<MultiBlock, Error> {
        let _enter = tracing::info_span!("request_data", time).entered();

        let mut tiny = ExportedTinyInfo::default();
        let mut dataset =
            self.tree
                .build_vtk_instance(self.settings.modal, time, &mut self.tk, &mut tiny)?;
        if self.settings.generate_vectors {
            generate_vectors(&mut dataset);
        }

        let orphans = orphan_nodes(&dataset);
        let mut blocks = vec![Some(DataObject::DataSet(dataset))];
        if let Some(orphans) = orphans {
            tracing::debug!(nodes = orphans.num_points(), "support without cells");
            blocks.push(Some(orphans.into()));
        }

        if tiny.is_empty() {
            registry.remove::<GaussData>();
        } else {
            registry.set::<GaussData>(tiny.encode());
        }
        registry.set::<MetaData>(self.sil()?);
        Ok(MultiBlock { blocks })
    }
}

fn load(doc: &MedDocument, settings: &ReaderSettings) -> Result<(RepresentationTree, TimeKeeper), Error> {
    let mut tree = RepresentationTree::load_in_memory(doc.clone())?;
    tree.activate_the_first();
    let mut tk = TimeKeeper::new(settings.time_policy);
    tk.set_max_number_of_time_steps(tree.max_number_of_time_steps());
    Ok((tree, tk))
}

/// One vertex per node of an unstructured dataset without cells.
fn orphan_nodes(dataset: &DataSet) -> Option<UnstructuredGrid> {
    let grid = match dataset {
        DataSet::Unstructured(grid) if grid.num_cells() == 0 && grid.num_points() > 0 => grid,
        _ => return None,
    };
    let mut cells = CellArray::default();
    for i in 0..grid.num_points() {
        cells.push([i as i64]);
    }
    Some(UnstructuredGrid {
        points: grid.points.clone(),
        cells,
        types: vec![CellType::VERTEX; grid.num_points()],
        faces: None,
        point_data: grid.point_data.clone(),
        ..UnstructuredGrid::default()
    })
}
