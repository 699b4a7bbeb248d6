//! 3-component companions of double arrays that can't be shown as vectors.

use crate::array::Attributes;
use crate::array::DataArray;
use crate::array::Values;
use crate::vtk::DataSet;

const VECTOR_SUFFIX: &str = "_Vector";

/// The 3-component version of `array`, if it is a double array with 2 or
/// more than 3 components. Extra components are dropped, a missing third
/// one is zero.
pub fn vector_of(array: &DataArray) -> Option<DataArray> {
    let values = array.values.as_f64()?;
    let n = array.components;
    if n != 2 && n <= 3 {
        return None;
    }
    let out: Vec<f64> = values
        .chunks(n)
        .flat_map(|tuple| (0..3).map(move |i| tuple.get(i).copied().unwrap_or(0.0)))
        .collect();
    let mut vector = DataArray::new(format!("{}{VECTOR_SUFFIX}", array.name), 3, Values::F64(out));
    vector.component_names = (0..3)
        .map(|i| array.component_names.get(i).cloned().flatten())
        .collect();
    vector.info = array.info.clone();
    Some(vector)
}

/// Adds the vector companion of every eligible array of `attributes`.
pub fn operate(attributes: &mut Attributes) {
    let vectors: Vec<DataArray> = attributes
        .iter()
        .filter(|a| !a.name.ends_with(VECTOR_SUFFIX))
        .filter_map(|a| vector_of(a))
        .filter(|v| !attributes.contains(&v.name))
        .collect();
    for vector in vectors {
        tracing::trace!(array = %vector.name, "generated vector");
        attributes.add(vector);
    }
}

/// Vector companions on point, cell and field data.
pub fn generate_vectors(dataset: &mut DataSet) {
    operate(dataset.point_data_mut());
    operate(dataset.cell_data_mut());
    operate(dataset.field_data_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_components_are_padded() {
        let array = DataArray::new("d", 2, Values::F64(vec![1.0, 2.0, 3.0, 4.0]))
            .with_component_names(["DX", "DY"]);
        let vector = vector_of(&array).unwrap();
        assert_eq!(vector.name, "d_Vector");
        assert_eq!(vector.values, Values::F64(vec![1.0, 2.0, 0.0, 3.0, 4.0, 0.0]));
        assert_eq!(vector.component_name(1), Some("DY"));
        assert_eq!(vector.component_name(2), None);
    }

    #[test]
    fn test_extra_components_are_dropped() {
        let array = DataArray::new("s", 6, Values::F64((0..12).map(f64::from).collect()));
        let vector = vector_of(&array).unwrap();
        assert_eq!(vector.values, Values::F64(vec![0.0, 1.0, 2.0, 6.0, 7.0, 8.0]));
    }

    #[test]
    fn test_ineligible_arrays() {
        assert!(vector_of(&DataArray::new("a", 1, Values::F64(vec![1.0]))).is_none());
        assert!(vector_of(&DataArray::new("a", 3, Values::F64(vec![1.0; 3]))).is_none());
        assert!(vector_of(&DataArray::new("a", 2, Values::I32(vec![1, 2]))).is_none());
    }

    #[test]
    fn test_operate_is_idempotent() {
        let mut attributes = Attributes::default();
        attributes.add(DataArray::new("d", 2, Values::F64(vec![1.0, 2.0])));
        attributes.add(DataArray::new("t", 1, Values::F64(vec![1.0])));
        operate(&mut attributes);
        operate(&mut attributes);
        assert_eq!(attributes.len(), 3);
        assert!(attributes.contains("d_Vector"));
    }
}
