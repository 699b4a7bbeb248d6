//! Reduction of Gauss point fields to cell fields.

use crate::array::DataArray;
use crate::array::Values;
use crate::registry::GaussData;
use crate::registry::Registry;
use crate::vtk::CellType;
use crate::vtk::DataObject;
use crate::vtk::DataSet;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The reader published no Gauss localization.
    NoAdvancedGaussInfo,

    /// The input is neither a dataset nor a multi-block holding exactly one.
    UnsupportedInput(&'static str),

    /// Gauss point fields refer to different offsets arrays.
    SeveralOffsetsArrays { first: String, other: String },

    /// The offsets array is not among the cell arrays.
    MissingOffsets(String),

    /// The offsets array is not id-typed.
    BadOffsetsType(String),

    /// The offsets array carries no quadrature definitions.
    NoQuadrature(String),

    /// No quadrature definition for the type of a cell.
    NoGaussInfoForCell { cell: usize },

    /// The Gauss points of a cell lie past the end of the field.
    OffsetOutOfRange { array: String, cell: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoAdvancedGaussInfo => write!(
                f,
                "no advanced gauss info found, expected right after a reader with Gauss points"
            ),
            Error::UnsupportedInput(class) => write!(
                f,
                "input of type {class} not supported, expected a dataset or a single block multi-block"
            ),
            Error::SeveralOffsetsArrays { first, other } => write!(
                f,
                "Gauss point fields refer to several offsets arrays ({first} and {other})"
            ),
            Error::MissingOffsets(name) => write!(f, "cell field {name} not found"),
            Error::BadOffsetsType(name) => {
                write!(f, "cell field {name} exists but not with the right type of data")
            }
            Error::NoQuadrature(name) => {
                write!(f, "no quadrature definitions attached to {name}")
            }
            Error::NoGaussInfoForCell { cell } => {
                write!(f, "For cell {cell} no Gauss info attached")
            }
            Error::OffsetOutOfRange { array, cell } => write!(
                f,
                "Gauss points of cell {cell} are past the end of {array}"
            ),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reduction {
    Avg,
    Max,
    Min,
}

impl Reduction {
    fn suffix(self) -> &'static str {
        match self {
            Reduction::Avg => "avg",
            Reduction::Max => "max",
            Reduction::Min => "min",
        }
    }

    /// Reduces `points` tuples of `components` values into `out`. A cell
    /// without Gauss points averages to NaN and keeps the extreme finite
    /// bounds as max and min.
    fn apply(self, values: &[f64], components: usize, out: &mut [f64]) {
        let points = values.len() / components.max(1);
        for (c, out) in out.iter_mut().enumerate() {
            let component = (0..points).map(|p| values[p * components + c]);
            *out = match self {
                Reduction::Avg => component.sum::<f64>() * (1.0 / points as f64),
                Reduction::Max => component.fold(f64::MIN, f64::max),
                Reduction::Min => component.fold(f64::MAX, f64::min),
            };
        }
    }
}

/// Which reductions [`GaussToCell::run`] adds, as `{field}_avg`,
/// `{field}_max` and `{field}_min` cell arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GaussToCell {
    pub avg: bool,
    pub max: bool,
    pub min: bool,
}

impl Default for GaussToCell {
    fn default() -> Self {
        GaussToCell {
            avg: true,
            max: false,
            min: false,
        }
    }
}

impl GaussToCell {
    /// A copy of the input dataset with the reduced Gauss point fields
    /// added to its cell data.
    pub fn run(&self, input: &DataObject, registry: &Registry) -> Result<DataSet, Error> {
        let _enter = tracing::info_span!("gauss_to_cell").entered();

        if !registry.contains::<GaussData>() {
            return Err(Error::NoAdvancedGaussInfo);
        }
        let input = single_dataset(input)?;
        let mut output = input.clone();
        let reductions: Vec<Reduction> = [
            (self.avg, Reduction::Avg),
            (self.max, Reduction::Max),
            (self.min, Reduction::Min),
        ]
        .into_iter()
        .filter_map(|(on, r)| on.then_some(r))
        .collect();

        let num_cells = input.num_cells();
        let mut offsets_name: Option<&str> = None;
        let mut points_per_cell: HashMap<&str, Vec<usize>> = HashMap::new();
        for array in input.field_data().iter() {
            let name = match array.info.offsets_name.as_deref() {
                Some(name) if name.contains("ELGA@") => name,
                _ => continue,
            };
            match offsets_name {
                None => offsets_name = Some(name),
                Some(first) if first != name => {
                    return Err(Error::SeveralOffsetsArrays {
                        first: first.to_string(),
                        other: name.to_string(),
                    })
                }
                Some(_) => {}
            }
            let offsets_array = input
                .cell_data()
                .get(name)
                .ok_or_else(|| Error::MissingOffsets(name.to_string()))?;
            let offsets = offsets_array
                .values
                .as_id()
                .ok_or_else(|| Error::BadOffsetsType(name.to_string()))?;
            let values = match array.values.as_f64() {
                Some(values) => values,
                None => {
                    tracing::debug!(array = %array.name, "skipping non double Gauss field");
                    continue;
                }
            };
            if !points_per_cell.contains_key(name) {
                let counts = gauss_points_per_cell(input, offsets_array)?;
                points_per_cell.insert(name, counts);
            }
            let counts = &points_per_cell[name];

            for &reduction in &reductions {
                let reduced = reduce(array, values, offsets, counts, num_cells, reduction)?;
                output.cell_data_mut().add(reduced);
            }
        }
        Ok(output)
    }
}

fn single_dataset(input: &DataObject) -> Result<&DataSet, Error> {
    match input {
        DataObject::DataSet(ds) => Ok(ds),
        DataObject::MultiBlock(mb) if mb.blocks.len() == 1 => match &mb.blocks[0] {
            Some(DataObject::DataSet(ds)) => Ok(ds),
            Some(other) => Err(Error::UnsupportedInput(other.class_name())),
            None => Err(Error::UnsupportedInput("empty block")),
        },
        other => Err(Error::UnsupportedInput(other.class_name())),
    }
}

/// Gauss point count of every cell, from the quadrature definitions
/// attached to `offsets`.
fn gauss_points_per_cell(input: &DataSet, offsets: &DataArray) -> Result<Vec<usize>, Error> {
    let dictionary = offsets
        .info
        .quadrature
        .as_deref()
        .ok_or_else(|| Error::NoQuadrature(offsets.name.clone()))?;
    (0..input.num_cells())
        .map(|cell| {
            let ct = input.cell_type(cell).unwrap_or(CellType::EMPTY);
            dictionary
                .get(ct)
                .map(|definition| definition.points)
                .ok_or(Error::NoGaussInfoForCell { cell })
        })
        .collect()
}

fn reduce(
    array: &DataArray,
    values: &[f64],
    offsets: &[i64],
    counts: &[usize],
    num_cells: usize,
    reduction: Reduction,
) -> Result<DataArray, Error> {
    let components = array.components.max(1);
    let out_of_range = |cell| Error::OffsetOutOfRange {
        array: array.name.clone(),
        cell,
    };
    let ranges: Vec<(usize, usize)> = (0..num_cells)
        .map(|cell| {
            let start = offsets
                .get(cell)
                .and_then(|o| usize::try_from(*o).ok())
                .ok_or_else(|| out_of_range(cell))?;
            let range = start
                .checked_add(counts[cell])
                .and_then(|end| Some((start.checked_mul(components)?, end.checked_mul(components)?)))
                .filter(|(_, end)| *end <= values.len());
            range.ok_or_else(|| out_of_range(cell))
        })
        .collect::<Result<_, Error>>()?;

    let mut out = vec![0.0; num_cells * components];
    out.par_chunks_mut(components)
        .zip(&ranges)
        .for_each(|(out, (start, end))| reduction.apply(&values[*start..*end], components, out));

    let mut reduced = DataArray::new(
        format!("{}_{}", array.name, reduction.suffix()),
        components,
        Values::F64(out),
    );
    reduced.component_names = array.component_names.clone();
    Ok(reduced)
}
