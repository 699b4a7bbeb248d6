//! Runtime-typed data arrays as exchanged with the visualization pipeline.
//!
//! The pipeline hands out loosely typed arrays. They are turned into the
//! closed [`Values`] variant once, at the boundary, and the rest of the crate
//! only matches on that variant.

use crate::vtk::CellType;
use num_traits::AsPrimitive;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The array element type is not handled by the requested operation.
    UnsupportedType {
        array: String,
        type_name: &'static str,
    },

    /// A tuple id is past the end of the array.
    TupleOutOfRange { id: usize, len: usize },

    /// Two arrays that must be merged don't hold the same element type.
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Two arrays that must be merged don't have the same component count.
    ComponentMismatch { expected: usize, actual: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedType { array, type_name } => {
                write!(f, "unrecognized array type {type_name} for array {array:?}")
            }
            Error::TupleOutOfRange { id, len } => {
                write!(f, "tuple #{id} out of range (array has {len} tuples)")
            }
            Error::TypeMismatch { expected, actual } => {
                write!(f, "array type mismatch (expected {expected}, got {actual})")
            }
            Error::ComponentMismatch { expected, actual } => write!(
                f,
                "component count mismatch (expected {expected}, got {actual})"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Element storage of a [`DataArray`].
#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    /// Index-typed integers, used for offsets and ids.
    Id(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Numeric family an element type belongs to, for the types the MED side
/// understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Real,
}

macro_rules! with_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::U8($v) => $body,
            Values::I8($v) => $body,
            Values::U16($v) => $body,
            Values::I16($v) => $body,
            Values::U32($v) => $body,
            Values::I32($v) => $body,
            Values::U64($v) => $body,
            Values::I64($v) => $body,
            Values::Id($v) => $body,
            Values::F32($v) => $body,
            Values::F64($v) => $body,
        }
    };
}

macro_rules! map_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::U8($v) => Values::U8($body),
            Values::I8($v) => Values::I8($body),
            Values::U16($v) => Values::U16($body),
            Values::I16($v) => Values::I16($body),
            Values::U32($v) => Values::U32($body),
            Values::I32($v) => Values::I32($body),
            Values::U64($v) => Values::U64($body),
            Values::I64($v) => Values::I64($body),
            Values::Id($v) => Values::Id($body),
            Values::F32($v) => Values::F32($body),
            Values::F64($v) => Values::F64($body),
        }
    };
}

fn widen<T, U>(src: &[T]) -> Vec<U>
where
    T: AsPrimitive<U>,
    U: Copy + 'static,
{
    src.iter().map(|x| x.as_()).collect()
}

fn select<T: Copy>(src: &[T], components: usize, ids: &[usize]) -> Result<Vec<T>, Error> {
    let len = src.len() / components.max(1);
    let mut out = Vec::with_capacity(ids.len() * components);
    for &id in ids {
        if id >= len {
            return Err(Error::TupleOutOfRange { id, len });
        }
        out.extend_from_slice(&src[id * components..(id + 1) * components]);
    }
    Ok(out)
}

impl Values {
    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the pipeline array class holding this element type, used in
    /// diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Values::U8(_) => "vtkUnsignedCharArray",
            Values::I8(_) => "vtkSignedCharArray",
            Values::U16(_) => "vtkUnsignedShortArray",
            Values::I16(_) => "vtkShortArray",
            Values::U32(_) => "vtkUnsignedIntArray",
            Values::I32(_) => "vtkIntArray",
            Values::U64(_) => "vtkUnsignedLongLongArray",
            Values::I64(_) => "vtkLongLongArray",
            Values::Id(_) => "vtkIdTypeArray",
            Values::F32(_) => "vtkFloatArray",
            Values::F64(_) => "vtkDoubleArray",
        }
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Values::U8(_) | Values::I32(_) | Values::I64(_) | Values::Id(_) => {
                Some(ValueKind::Integer)
            }
            Values::F32(_) | Values::F64(_) => Some(ValueKind::Real),
            _ => None,
        }
    }

    /// Real values widened to `f64`, `None` for integer storage.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Values::F64(v) => Some(v.clone()),
            Values::F32(v) => Some(widen(v)),
            _ => None,
        }
    }

    /// Integer values widened to `i64`, `None` for the unsupported types.
    pub fn to_i64(&self) -> Option<Vec<i64>> {
        match self {
            Values::U8(v) => Some(widen(v)),
            Values::I32(v) => Some(widen(v)),
            Values::I64(v) | Values::Id(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Values::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&[i64]> {
        match self {
            Values::Id(v) => Some(v),
            _ => None,
        }
    }

    /// Gathers the given tuples, in order, into a new storage of the same
    /// element type. Ids may repeat.
    pub fn select_tuples(&self, components: usize, ids: &[usize]) -> Result<Values, Error> {
        Ok(map_values!(self, v => select(v, components, ids)?))
    }

    /// An empty storage with the same element type.
    pub fn empty_like(&self) -> Values {
        map_values!(self, _v => Vec::new())
    }

    /// Appends `other` at the end of `self`.
    pub fn append(&mut self, other: &Values) -> Result<(), Error> {
        let expected = self.type_name();
        match (self, other) {
            (Values::U8(a), Values::U8(b)) => a.extend_from_slice(b),
            (Values::I8(a), Values::I8(b)) => a.extend_from_slice(b),
            (Values::U16(a), Values::U16(b)) => a.extend_from_slice(b),
            (Values::I16(a), Values::I16(b)) => a.extend_from_slice(b),
            (Values::U32(a), Values::U32(b)) => a.extend_from_slice(b),
            (Values::I32(a), Values::I32(b)) => a.extend_from_slice(b),
            (Values::U64(a), Values::U64(b)) => a.extend_from_slice(b),
            (Values::I64(a), Values::I64(b)) => a.extend_from_slice(b),
            (Values::Id(a), Values::Id(b)) => a.extend_from_slice(b),
            (Values::F32(a), Values::F32(b)) => a.extend_from_slice(b),
            (Values::F64(a), Values::F64(b)) => a.extend_from_slice(b),
            (_, other) => {
                return Err(Error::TypeMismatch {
                    expected,
                    actual: other.type_name(),
                })
            }
        }
        Ok(())
    }
}

/// Gauss integration scheme of one cell type, as attached to offsets arrays
/// and Gauss-valued arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadratureDefinition {
    pub cell_type: CellType,
    pub nodes_per_cell: usize,
    pub points: usize,
    /// Shape function values, `points` rows of `nodes_per_cell` values.
    pub shape_functions: Vec<f64>,
    pub weights: Vec<f64>,
}

/// Quadrature definitions indexed by cell type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadratureDictionary {
    definitions: BTreeMap<CellType, QuadratureDefinition>,
}

impl QuadratureDictionary {
    pub fn insert(&mut self, definition: QuadratureDefinition) {
        self.definitions.insert(definition.cell_type, definition);
    }

    pub fn get(&self, cell_type: CellType) -> Option<&QuadratureDefinition> {
        self.definitions.get(&cell_type)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Out-of-band keys attached to an array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayInfo {
    /// Name of the cell array holding the per-cell Gauss offsets of this
    /// array.
    pub offsets_name: Option<String>,
    pub quadrature: Option<Arc<QuadratureDictionary>>,
    pub hidden: bool,
    pub elga: bool,
    pub elno: bool,
}

/// A named array of fixed-size tuples.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub component_names: Vec<Option<String>>,
    pub values: Values,
    pub info: ArrayInfo,
}

impl DataArray {
    pub fn new(name: impl Into<String>, components: usize, values: Values) -> DataArray {
        DataArray {
            name: name.into(),
            components,
            component_names: vec![None; components],
            values,
            info: ArrayInfo::default(),
        }
    }

    pub fn with_component_names<I, S>(mut self, names: I) -> DataArray
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (slot, name) in self.component_names.iter_mut().zip(names) {
            *slot = Some(name.into());
        }
        self
    }

    pub fn tuples(&self) -> usize {
        self.values.len() / self.components.max(1)
    }

    pub fn component_name(&self, i: usize) -> Option<&str> {
        self.component_names.get(i).and_then(|name| name.as_deref())
    }

    /// A new array holding the given tuples of this one, same name and
    /// metadata.
    pub fn select_tuples(&self, ids: &[usize]) -> Result<DataArray, Error> {
        Ok(DataArray {
            values: self.values.select_tuples(self.components, ids)?,
            ..self.clone_header()
        })
    }

    /// Name, components and metadata without any value.
    pub fn clone_header(&self) -> DataArray {
        DataArray {
            name: self.name.clone(),
            components: self.components,
            component_names: self.component_names.clone(),
            values: self.values.empty_like(),
            info: self.info.clone(),
        }
    }

    pub fn append(&mut self, other: &DataArray) -> Result<(), Error> {
        if self.components != other.components {
            return Err(Error::ComponentMismatch {
                expected: self.components,
                actual: other.components,
            });
        }
        self.values.append(&other.values)
    }
}

/// An ordered collection of arrays attached to points, cells or the whole
/// dataset. Arrays are shared, so cloning an `Attributes` is shallow.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    arrays: Vec<Arc<DataArray>>,
}

impl Attributes {
    /// Adds an array, replacing any array with the same name.
    pub fn add(&mut self, array: impl Into<Arc<DataArray>>) {
        let array = array.into();
        match self.arrays.iter_mut().find(|a| a.name == array.name) {
            Some(slot) => *slot = array,
            None => self.arrays.push(array),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DataArray>> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<DataArray>> {
        let pos = self.arrays.iter().position(|a| a.name == name)?;
        Some(self.arrays.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DataArray>> {
        self.arrays.iter()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_tuples_repeats() {
        let values = Values::F64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let selected = values.select_tuples(2, &[2, 0, 0]).unwrap();
        assert_eq!(selected, Values::F64(vec![5.0, 6.0, 1.0, 2.0, 1.0, 2.0]));
    }

    #[test]
    fn test_select_tuples_out_of_range() {
        let values = Values::I32(vec![1, 2, 3]);
        let err = values.select_tuples(1, &[3]).unwrap_err();
        assert_eq!(err, Error::TupleOutOfRange { id: 3, len: 3 });
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Values::U8(vec![]).kind(), Some(ValueKind::Integer));
        assert_eq!(Values::Id(vec![]).kind(), Some(ValueKind::Integer));
        assert_eq!(Values::F32(vec![]).kind(), Some(ValueKind::Real));
        assert_eq!(Values::U16(vec![]).kind(), None);
        assert_eq!(Values::U16(vec![]).type_name(), "vtkUnsignedShortArray");
    }

    #[test]
    fn test_append_type_mismatch() {
        let mut a = Values::F64(vec![1.0]);
        assert!(a.append(&Values::F32(vec![1.0])).is_err());
        a.append(&Values::F64(vec![2.0])).unwrap();
        assert_eq!(a, Values::F64(vec![1.0, 2.0]));
    }

    #[test]
    fn test_attributes_replace_by_name() {
        let mut attributes = Attributes::default();
        attributes.add(DataArray::new("a", 1, Values::F64(vec![1.0])));
        attributes.add(DataArray::new("b", 1, Values::F64(vec![2.0])));
        attributes.add(DataArray::new("a", 1, Values::F64(vec![3.0])));
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get("a").unwrap().values, Values::F64(vec![3.0]));
        assert!(attributes.remove("b").is_some());
        assert!(!attributes.contains("b"));
    }
}
