use super::geo::GeoType;
use super::Error;
use std::fmt;
use std::ops::Range;

/// Spatial discretization of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeOfField {
    OnCells,
    OnNodes,
    OnGaussPt,
    OnGaussNe,
}

impl TypeOfField {
    /// Short name used in leaf names.
    pub fn repr(self) -> &'static str {
        match self {
            TypeOfField::OnCells => "P0",
            TypeOfField::OnNodes => "P1",
            TypeOfField::OnGaussPt => "GAUSS",
            TypeOfField::OnGaussNe => "GSSNE",
        }
    }
}

impl fmt::Display for TypeOfField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeOfField::OnCells => "ON_CELLS",
            TypeOfField::OnNodes => "ON_NODES",
            TypeOfField::OnGaussPt => "ON_GAUSS_PT",
            TypeOfField::OnGaussNe => "ON_GAUSS_NE",
        })
    }
}

/// Values of one time step.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValues {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Float64(v) => v.len(),
            FieldValues::Float32(v) => v.len(),
            FieldValues::Int32(v) => v.len(),
            FieldValues::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValues::Float64(_) => "FLOAT64",
            FieldValues::Float32(_) => "FLOAT32",
            FieldValues::Int32(_) => "INT32",
            FieldValues::Int64(_) => "INT64",
        }
    }
}

/// A piece of a time step: the values of one discretization on one
/// geometric type, possibly restricted by a profile.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldPart {
    pub disc: TypeOfField,
    /// `None` for node parts.
    pub geo: Option<GeoType>,
    /// Ids of the cells of type `geo` the part is defined on, in the order
    /// of the values. `None` means every cell of that type.
    pub profile: Option<Vec<usize>>,
    /// Gauss localization name, for Gauss point parts.
    pub localization: Option<String>,
    /// Tuple range in the values of the time step.
    pub range: Range<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimeStep {
    pub iteration: i32,
    pub order: i32,
    pub time: f64,
    pub parts: Vec<FieldPart>,
    pub values: FieldValues,
}

impl TimeStep {
    pub fn id(&self) -> (i32, i32) {
        (self.iteration, self.order)
    }

    pub fn discretizations(&self) -> Vec<TypeOfField> {
        let mut discs: Vec<TypeOfField> = self.parts.iter().map(|p| p.disc).collect();
        discs.sort();
        discs.dedup();
        discs
    }
}

/// A named field over all its time steps.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMultiTs {
    pub name: String,
    pub mesh_name: String,
    pub dt_unit: String,
    pub components: Vec<String>,
    pub steps: Vec<TimeStep>,
}

impl FieldMultiTs {
    pub fn num_components(&self) -> usize {
        self.components.len().max(1)
    }

    /// Discretizations used by any step, sorted.
    pub fn discretizations(&self) -> Vec<TypeOfField> {
        let mut discs: Vec<TypeOfField> = self
            .steps
            .iter()
            .flat_map(|step| step.discretizations())
            .collect();
        discs.sort();
        discs.dedup();
        discs
    }

    pub fn step_ids(&self) -> Vec<(i32, i32)> {
        self.steps.iter().map(TimeStep::id).collect()
    }

    /// Checks part ranges fit in the values of each step.
    pub fn check_consistency(&self) -> Result<(), Error> {
        let ncomp = self.num_components();
        for step in &self.steps {
            let tuples = step.values.len() / ncomp;
            if step.values.len() % ncomp != 0 {
                return Err(Error::FieldStructMismatch(format!(
                    "field {:?} at {:?}: {} values for {ncomp} components",
                    self.name,
                    step.id(),
                    step.values.len()
                )));
            }
            for part in &step.parts {
                if part.range.start > part.range.end || part.range.end > tuples {
                    return Err(Error::FieldStructMismatch(format!(
                        "field {:?} at {:?}: part {:?} out of {tuples} tuples",
                        self.name,
                        step.id(),
                        part.range
                    )));
                }
                if part.disc == TypeOfField::OnNodes && part.profile.is_some() {
                    return Err(Error::FieldStructMismatch(format!(
                        "field {:?}: node profiles are not supported",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// One field per discretization, keeping the name.
    pub fn split_discretizations(&self) -> Vec<FieldMultiTs> {
        let discs = self.discretizations();
        if discs.len() <= 1 {
            return vec![self.clone()];
        }
        discs
            .into_iter()
            .map(|disc| self.filter_parts(|_, part| part.disc == disc))
            .collect()
    }

    /// Whether some step holds several parts on the same geometric type.
    pub fn presence_of_multi_disc_per_geo_type(&self) -> bool {
        self.steps.iter().any(|step| {
            step.parts.iter().enumerate().any(|(i, part)| {
                part.geo.is_some() && step.parts[..i].iter().any(|p| p.geo == part.geo)
            })
        })
    }

    /// Splits a field so that each variant holds at most one part per
    /// geometric type: variant `k` takes the `k`-th part of every type.
    pub fn split_multi_discr_per_geo_types(&self) -> Vec<FieldMultiTs> {
        let variants = self
            .steps
            .iter()
            .flat_map(|step| {
                step.parts.iter().map(move |part| {
                    step.parts.iter().filter(|p| p.geo == part.geo).count()
                })
            })
            .max()
            .unwrap_or(1);
        (0..variants)
            .map(|k| {
                self.filter_parts(|parts, part| {
                    let rank = parts
                        .iter()
                        .take_while(|p| !std::ptr::eq(*p, part))
                        .filter(|p| p.geo == part.geo)
                        .count();
                    rank == k
                })
            })
            .collect()
    }

    fn filter_parts<F>(&self, keep: F) -> FieldMultiTs
    where
        F: Fn(&[FieldPart], &FieldPart) -> bool,
    {
        let steps = self
            .steps
            .iter()
            .filter_map(|step| {
                let parts: Vec<FieldPart> = step
                    .parts
                    .iter()
                    .filter(|part| keep(&step.parts, *part))
                    .cloned()
                    .collect();
                if parts.is_empty() {
                    return None;
                }
                Some(TimeStep {
                    parts,
                    ..step.clone()
                })
            })
            .collect();
        FieldMultiTs {
            steps,
            ..self.clone_header()
        }
    }

    fn clone_header(&self) -> FieldMultiTs {
        FieldMultiTs {
            name: self.name.clone(),
            mesh_name: self.mesh_name.clone(),
            dt_unit: self.dt_unit.clone(),
            components: self.components.clone(),
            steps: Vec::new(),
        }
    }
}
