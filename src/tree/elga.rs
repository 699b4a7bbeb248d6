//! Gauss point offsets arrays and their quadrature definitions.

use super::geometry::cell_shapes;
use super::geometry::Geometry;
use super::Error;
use crate::array::DataArray;
use crate::array::QuadratureDefinition;
use crate::array::QuadratureDictionary;
use crate::array::Values;
use crate::med::GeoType;
use crate::med::Localization;
use crate::med::MedDocument;
use crate::med::SupportSignature;
use crate::shape::ShapeFunctions;
use crate::tiny_info::ExportedTinyInfo;
use crate::vtk::CellType;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug)]
struct ElgaEntry {
    loc_names: Vec<String>,
    signature: SupportSignature,
    offsets: Arc<DataArray>,
}

/// Offsets arrays of the Gauss point fields of a leaf group, one per list
/// of localizations. Fields using the same localizations in the same order
/// share their offsets array.
#[derive(Debug, Default)]
pub struct ElgaCmp {
    entries: Vec<ElgaEntry>,
}

impl ElgaCmp {
    /// The offsets array of `loc_names` on `geometry`, created on first use.
    /// The returned flag tells whether it was just created.
    pub fn find_or_create(
        &mut self,
        doc: &MedDocument,
        loc_names: &[String],
        geometry: &Geometry,
        tiny: &mut ExportedTinyInfo,
    ) -> Result<(Arc<DataArray>, bool), Error> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.loc_names == loc_names && e.signature == geometry.signature)
        {
            for name in loc_names {
                push_tiny_info(doc.localization(name)?, tiny);
            }
            return Ok((Arc::clone(&entry.offsets), false));
        }

        let mut dictionary = QuadratureDictionary::default();
        let mut points_per_type: BTreeMap<CellType, usize> = BTreeMap::new();
        for name in loc_names {
            let loc = doc.localization(name)?;
            let definition = gauss_definition(loc);
            points_per_type.insert(definition.cell_type, definition.points);
            dictionary.insert(definition);
            push_tiny_info(loc, tiny);
        }

        let mut offset = 0;
        let offsets: Vec<i64> = cell_shapes(&geometry.dataset)
            .into_iter()
            .map(|(ct, _)| {
                let current = offset;
                offset += points_per_type.get(&ct).copied().unwrap_or(0) as i64;
                current
            })
            .collect();
        let mut array = DataArray::new(format!("ELGA@{}", self.entries.len()), 1, Values::Id(offsets));
        array.info.hidden = true;
        array.info.elga = true;
        array.info.quadrature = Some(Arc::new(dictionary));
        let array = Arc::new(array);
        tracing::debug!(name = %array.name, ?loc_names, "new Gauss offsets array");
        self.entries.push(ElgaEntry {
            loc_names: loc_names.to_vec(),
            signature: geometry.signature.clone(),
            offsets: Arc::clone(&array),
        });
        Ok((array, true))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn push_tiny_info(loc: &Localization, tiny: &mut ExportedTinyInfo) {
    let (ref_coords, gauss_coords) = loc.normalized_coords();
    tiny.push_gauss_additional_info(
        loc.geo.vtk(),
        loc.geo.dimension().max(1),
        ref_coords,
        gauss_coords,
    );
}

/// Quadrature definition of a localization. A type without interpolation
/// basis gets no shape function values.
fn gauss_definition(loc: &Localization) -> QuadratureDefinition {
    let (ref_coords, gauss_coords) = loc.normalized_coords();
    let dim = loc.geo.dimension();
    let shape_functions = match ShapeFunctions::new(loc.geo, &ref_coords, dim) {
        Ok(shape) => shape.eval_many(&gauss_coords, dim),
        Err(err) => {
            tracing::debug!(localization = %loc.name, "no shape functions: {err}");
            Vec::new()
        }
    };
    QuadratureDefinition {
        cell_type: loc.geo.vtk(),
        nodes_per_cell: loc.geo.node_count().unwrap_or(0),
        points: loc.num_gauss_points(),
        shape_functions,
        weights: loc.weights.clone(),
    }
}

/// Offsets array of a Gauss-NE field named `name`: one point per cell node.
pub fn elno_offsets(name: &str, geometry: &Geometry) -> DataArray {
    let shapes = cell_shapes(&geometry.dataset);
    let mut offset = 0;
    let offsets: Vec<i64> = shapes
        .iter()
        .map(|(_, n)| {
            let current = offset;
            offset += *n as i64;
            current
        })
        .collect();

    let mut dictionary = QuadratureDictionary::default();
    let types: BTreeSet<CellType> = shapes.iter().map(|(ct, _)| *ct).collect();
    for ct in types {
        let geo = match GeoType::from_vtk(ct) {
            Some(geo) if geo.node_count().is_some() && ct != CellType::POLY_VERTEX => geo,
            _ => continue,
        };
        let n = geo.node_count().unwrap_or(0);
        let mut identity = vec![0.0; n * n];
        for i in 0..n {
            identity[i * n + i] = 1.0;
        }
        dictionary.insert(QuadratureDefinition {
            cell_type: ct,
            nodes_per_cell: n,
            points: n,
            shape_functions: identity,
            weights: vec![geo.reference_measure() / n as f64; n],
        });
    }

    let mut array = DataArray::new(format!("ELNO@{name}"), 1, Values::Id(offsets));
    array.info.hidden = true;
    array.info.elno = true;
    array.info.quadrature = Some(Arc::new(dictionary));
    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::med::Level;
    use crate::med::Mesh;
    use crate::med::UMesh;

    fn mixed() -> (Mesh, Geometry) {
        let mut mesh = UMesh::new("m", 2, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 2.0, 0.0]);
        let mut level = Level::default();
        level.push_cell(GeoType::Tri3, [0, 1, 2]);
        level.push_cell(GeoType::Tri3, [0, 2, 3]);
        level.push_cell(GeoType::Quad4, [1, 4, 2, 3]);
        mesh.levels.insert(0, level);
        let mesh = Mesh::Unstructured(mesh);
        let geometry = Geometry::build(&mesh, &SupportSignature::whole_mesh(&mesh)).unwrap();
        (mesh, geometry)
    }

    fn doc() -> MedDocument {
        let mut doc = MedDocument::default();
        doc.localizations.insert(
            "tri3".to_string(),
            Localization {
                name: "tri3".to_string(),
                geo: GeoType::Tri3,
                ref_coords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                gauss_coords: vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
                weights: vec![1.0 / 6.0; 3],
            },
        );
        doc
    }

    #[test]
    fn test_elga_offsets_are_shared() {
        let (_, geometry) = mixed();
        let doc = doc();
        let mut cmp = ElgaCmp::default();
        let mut tiny = ExportedTinyInfo::default();
        let locs = vec!["tri3".to_string()];
        let (offsets, new) = cmp.find_or_create(&doc, &locs, &geometry, &mut tiny).unwrap();
        assert!(new);
        assert_eq!(offsets.name, "ELGA@0");
        assert_eq!(offsets.values, Values::Id(vec![0, 3, 6]));
        assert!(offsets.info.hidden && offsets.info.elga);
        let def = offsets
            .info
            .quadrature
            .as_ref()
            .and_then(|d| d.get(CellType::TRIANGLE))
            .unwrap();
        assert_eq!(def.points, 3);
        assert_eq!(def.shape_functions.len(), 9);
        // Shape functions sum to one at every Gauss point.
        for row in def.shape_functions.chunks(3) {
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(def.shape_functions[0], 2.0 / 3.0, epsilon = 1e-12);

        let (again, new) = cmp.find_or_create(&doc, &locs, &geometry, &mut tiny).unwrap();
        assert!(!new);
        assert!(Arc::ptr_eq(&offsets, &again));
        assert_eq!(cmp.len(), 1);
        assert!(!tiny.is_empty());
        assert!(matches!(
            cmp.find_or_create(&doc, &["nope".to_string()], &geometry, &mut tiny),
            Err(Error::Med(_))
        ));
    }

    #[test]
    fn test_elno_offsets() {
        let (_, geometry) = mixed();
        let elno = elno_offsets("f", &geometry);
        assert_eq!(elno.name, "ELNO@f");
        assert_eq!(elno.values, Values::Id(vec![0, 3, 6]));
        let dict = elno.info.quadrature.as_ref().unwrap();
        let quad = dict.get(CellType::QUAD).unwrap();
        assert_eq!(quad.points, 4);
        assert_relative_eq!(quad.weights.iter().sum::<f64>(), 4.0);
        assert_eq!(quad.shape_functions[5], 1.0);
        assert_eq!(dict.len(), 2);
    }
}
