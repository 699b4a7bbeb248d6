use super::geo::GeoType;
use super::Error;
use std::collections::BTreeMap;
use std::ops::Range;

/// Families (name to id) and groups (name to family names) of a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FamilyInfo {
    pub families: BTreeMap<String, i64>,
    pub groups: BTreeMap<String, Vec<String>>,
}

impl FamilyInfo {
    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.groups.is_empty()
    }
}

/// Cells of one dimension level of an unstructured mesh.
///
/// Polyhedra store their faces one after the other, separated by `-1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    pub types: Vec<GeoType>,
    pub connectivity: Vec<i64>,
    pub index: Vec<usize>,
    pub families: Option<Vec<i64>>,
    pub numbers: Option<Vec<i64>>,
    /// New to old cell permutation applied when cells were sorted per type.
    pub renumbering: Option<Vec<usize>>,
}

impl Default for Level {
    fn default() -> Self {
        Level {
            types: Vec::new(),
            connectivity: Vec::new(),
            index: vec![0],
            families: None,
            numbers: None,
            renumbering: None,
        }
    }
}

impl Level {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn push_cell<I>(&mut self, geo: GeoType, nodes: I)
    where
        I: IntoIterator<Item = i64>,
    {
        self.types.push(geo);
        self.connectivity.extend(nodes);
        self.index.push(self.connectivity.len());
    }

    pub fn cell(&self, i: usize) -> &[i64] {
        &self.connectivity[self.index[i]..self.index[i + 1]]
    }

    /// Dimension of the cells of this level, `None` when it is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.types.first().map(|geo| geo.dimension())
    }

    /// Distinct node ids of cell `i`, without polyhedron face separators.
    pub fn cell_nodes(&self, i: usize) -> Vec<i64> {
        let mut nodes: Vec<i64> = Vec::new();
        for &n in self.cell(i) {
            if n >= 0 && !nodes.contains(&n) {
                nodes.push(n);
            }
        }
        nodes
    }

    /// Contiguous per-type cell ranges. Cells must be grouped by type.
    pub fn blocks(&self) -> Result<Vec<(GeoType, Range<usize>)>, Error> {
        let mut blocks: Vec<(GeoType, Range<usize>)> = Vec::new();
        for (i, geo) in self.types.iter().enumerate() {
            match blocks.last_mut() {
                Some((last, range)) if last == geo => range.end = i + 1,
                _ => {
                    if blocks.iter().any(|(g, _)| g == geo) {
                        return Err(Error::MeshStructMismatch(format!(
                            "cells of type {geo} are not contiguous"
                        )));
                    }
                    blocks.push((*geo, i..i + 1));
                }
            }
        }
        Ok(blocks)
    }

    pub fn geo_types(&self) -> Vec<GeoType> {
        let mut types: Vec<GeoType> = Vec::new();
        for geo in &self.types {
            if !types.contains(geo) {
                types.push(*geo);
            }
        }
        types
    }

    /// Stable sort of the cells by geometric type. Returns the old to new
    /// permutation; family and number arrays follow the cells.
    pub fn sort_cells_in_med_file_format(&mut self) -> Vec<usize> {
        let mut n2o: Vec<usize> = (0..self.len()).collect();
        n2o.sort_by_key(|&i| self.types[i]);
        let mut o2n = vec![0; n2o.len()];
        for (new, &old) in n2o.iter().enumerate() {
            o2n[old] = new;
        }
        *self = self.select(&n2o);
        o2n
    }

    /// A level made of the given cells, in the given order.
    pub fn select(&self, ids: &[usize]) -> Level {
        let mut out = Level::default();
        for &i in ids {
            out.push_cell(self.types[i], self.cell(i).iter().copied());
        }
        out.families = self
            .families
            .as_ref()
            .map(|f| ids.iter().map(|&i| f[i]).collect());
        out.numbers = self
            .numbers
            .as_ref()
            .map(|n| ids.iter().map(|&i| n[i]).collect());
        out
    }

    /// Appends the cells of `other`. Families and numbers are kept only when
    /// both sides have them.
    pub fn append(&mut self, other: &Level) {
        for i in 0..other.len() {
            self.push_cell(other.types[i], other.cell(i).iter().copied());
        }
        self.families = match (self.families.take(), &other.families) {
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            _ => None,
        };
        self.numbers = match (self.numbers.take(), &other.numbers) {
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            _ => None,
        };
    }
}

/// Unstructured mesh: shared coordinates plus one [`Level`] per dimension,
/// keyed by relative level (0 for the highest dimension, then -1, ..).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UMesh {
    pub name: String,
    pub description: String,
    pub space_dimension: usize,
    pub coords: Vec<f64>,
    pub coord_names: Vec<String>,
    pub levels: BTreeMap<i32, Level>,
    pub node_families: Option<Vec<i64>>,
    pub node_numbers: Option<Vec<i64>>,
    /// Global node numbering of a partitioned mesh.
    pub global_node_ids: Option<Vec<i64>>,
    pub family_info: FamilyInfo,
}

impl UMesh {
    pub fn new(name: impl Into<String>, space_dimension: usize, coords: Vec<f64>) -> UMesh {
        UMesh {
            name: name.into(),
            space_dimension,
            coords,
            ..UMesh::default()
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.coords.len() / self.space_dimension.max(1)
    }

    /// Non empty levels, highest first.
    pub fn non_empty_levels(&self) -> Vec<i32> {
        self.levels
            .iter()
            .rev()
            .filter(|(_, level)| !level.is_empty())
            .map(|(l, _)| *l)
            .collect()
    }

    pub fn level(&self, level: i32) -> Result<&Level, Error> {
        self.levels
            .get(&level)
            .ok_or_else(|| Error::MeshStructMismatch(format!("no level {level} in {:?}", self.name)))
    }

    /// The level holding cells of the given type.
    pub fn level_of(&self, geo: GeoType) -> Option<i32> {
        self.levels
            .iter()
            .find(|(_, level)| level.types.contains(&geo))
            .map(|(l, _)| *l)
    }

    /// Checks the index spans the connectivity, cells have the node count of
    /// their type, node ids are in range and family/number arrays have the
    /// right length.
    pub fn check_consistency(&self) -> Result<(), Error> {
        let num_nodes = self.num_nodes() as i64;
        for (l, level) in &self.levels {
            let bad_index = |what: &str| {
                Error::MeshStructMismatch(format!(
                    "level {l} of {:?} has a bad index: {what}",
                    self.name
                ))
            };
            if level.index.len() != level.len() + 1 {
                return Err(bad_index("wrong length"));
            }
            if level.index.first() != Some(&0) {
                return Err(bad_index("does not start at 0"));
            }
            if level.index.windows(2).any(|w| w[1] < w[0]) {
                return Err(bad_index("decreasing"));
            }
            if level.index.last() != Some(&level.connectivity.len()) {
                return Err(bad_index("does not end with the connectivity length"));
            }
            if let Some(n) = level.connectivity.iter().find(|n| **n < -1 || **n >= num_nodes) {
                return Err(Error::MeshStructMismatch(format!(
                    "node id {n} out of range in level {l} of {:?}",
                    self.name
                )));
            }
            for (i, geo) in level.types.iter().enumerate() {
                let cell = level.cell(i);
                if *geo != GeoType::Polyhed && cell.contains(&-1) {
                    return Err(Error::MeshStructMismatch(format!(
                        "cell #{i} of type {geo} in level {l} of {:?} has a face separator",
                        self.name
                    )));
                }
                match geo.node_count() {
                    Some(n) if n != cell.len() => {
                        return Err(Error::MeshStructMismatch(format!(
                            "cell #{i} of type {geo} in level {l} of {:?} has {} nodes, expected {n}",
                            self.name,
                            cell.len()
                        )))
                    }
                    _ => {}
                }
            }
            for array in [&level.families, &level.numbers].into_iter().flatten() {
                if array.len() != level.len() {
                    return Err(Error::MeshStructMismatch(format!(
                        "level {l} of {:?} has {} cells but an array of {} ids",
                        self.name,
                        level.len(),
                        array.len()
                    )));
                }
            }
            level.blocks()?;
        }
        Ok(())
    }
}

/// Cartesian mesh given by its axis coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CMesh {
    pub name: String,
    pub description: String,
    pub axes: Vec<Vec<f64>>,
    pub axis_names: Vec<String>,
    pub cell_families: Option<Vec<i64>>,
    pub cell_numbers: Option<Vec<i64>>,
    pub node_families: Option<Vec<i64>>,
    pub node_numbers: Option<Vec<i64>>,
    pub family_info: FamilyInfo,
}

impl CMesh {
    pub fn node_dims(&self) -> Vec<usize> {
        self.axes.iter().map(Vec::len).collect()
    }
}

/// Curvilinear mesh: structured topology with explicit coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveLinearMesh {
    pub name: String,
    pub description: String,
    pub node_dims: Vec<usize>,
    pub space_dimension: usize,
    pub coords: Vec<f64>,
    pub cell_families: Option<Vec<i64>>,
    pub cell_numbers: Option<Vec<i64>>,
    pub node_families: Option<Vec<i64>>,
    pub node_numbers: Option<Vec<i64>>,
    pub family_info: FamilyInfo,
}

/// Type of the cells of a structured mesh with the given node dimensions.
pub fn structured_geo_type(node_dims: &[usize]) -> Option<GeoType> {
    match node_dims.iter().filter(|d| **d > 1).count() {
        0 => None,
        1 => Some(GeoType::Seg2),
        2 => Some(GeoType::Quad4),
        _ => Some(GeoType::Hexa8),
    }
}

pub fn structured_cell_count(node_dims: &[usize]) -> usize {
    if node_dims.is_empty() || node_dims.iter().any(|d| *d == 0) {
        return 0;
    }
    node_dims.iter().map(|d| d.saturating_sub(1).max(1)).product()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mesh {
    Unstructured(UMesh),
    Cartesian(CMesh),
    CurveLinear(CurveLinearMesh),
}

impl Mesh {
    pub fn name(&self) -> &str {
        match self {
            Mesh::Unstructured(m) => &m.name,
            Mesh::Cartesian(m) => &m.name,
            Mesh::CurveLinear(m) => &m.name,
        }
    }

    pub fn family_info(&self) -> &FamilyInfo {
        match self {
            Mesh::Unstructured(m) => &m.family_info,
            Mesh::Cartesian(m) => &m.family_info,
            Mesh::CurveLinear(m) => &m.family_info,
        }
    }

    pub fn set_name(&mut self, name: &str) {
        match self {
            Mesh::Unstructured(m) => m.name = name.to_string(),
            Mesh::Cartesian(m) => m.name = name.to_string(),
            Mesh::CurveLinear(m) => m.name = name.to_string(),
        }
    }

    pub fn family_info_mut(&mut self) -> &mut FamilyInfo {
        match self {
            Mesh::Unstructured(m) => &mut m.family_info,
            Mesh::Cartesian(m) => &mut m.family_info,
            Mesh::CurveLinear(m) => &mut m.family_info,
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            Mesh::Unstructured(m) => m.num_nodes(),
            Mesh::Cartesian(m) => m.node_dims().iter().product(),
            Mesh::CurveLinear(m) => m.node_dims.iter().product(),
        }
    }

    /// Geometric types present on each non empty level, highest level first.
    pub fn geo_types_per_level(&self) -> Vec<(i32, Vec<GeoType>)> {
        match self {
            Mesh::Unstructured(m) => m
                .non_empty_levels()
                .into_iter()
                .filter_map(|l| m.levels.get(&l).map(|level| (l, level.geo_types())))
                .collect(),
            Mesh::Cartesian(m) => structured_geo_type(&m.node_dims())
                .map(|geo| vec![(0, vec![geo])])
                .unwrap_or_default(),
            Mesh::CurveLinear(m) => structured_geo_type(&m.node_dims)
                .map(|geo| vec![(0, vec![geo])])
                .unwrap_or_default(),
        }
    }

    /// Number of cells of the given type.
    pub fn cell_count(&self, geo: GeoType) -> usize {
        match self {
            Mesh::Unstructured(m) => m
                .levels
                .values()
                .map(|level| level.types.iter().filter(|g| **g == geo).count())
                .sum(),
            Mesh::Cartesian(m) if structured_geo_type(&m.node_dims()) == Some(geo) => {
                structured_cell_count(&m.node_dims())
            }
            Mesh::CurveLinear(m) if structured_geo_type(&m.node_dims) == Some(geo) => {
                structured_cell_count(&m.node_dims)
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_level() -> Level {
        let mut level = Level::default();
        level.push_cell(GeoType::Quad4, [0, 1, 2, 3]);
        level.push_cell(GeoType::Tri3, [0, 1, 2]);
        level.push_cell(GeoType::Quad4, [1, 2, 3, 4]);
        level.push_cell(GeoType::Tri3, [2, 3, 4]);
        level.families = Some(vec![10, 20, 30, 40]);
        level
    }

    #[test]
    fn test_sort_cells_in_med_file_format() {
        let mut level = mixed_level();
        assert!(level.blocks().is_err());
        let o2n = level.sort_cells_in_med_file_format();
        assert_eq!(o2n, vec![2, 0, 3, 1]);
        assert_eq!(
            level.types,
            vec![GeoType::Tri3, GeoType::Tri3, GeoType::Quad4, GeoType::Quad4]
        );
        assert_eq!(level.cell(1), &[2, 3, 4]);
        assert_eq!(level.families, Some(vec![20, 40, 10, 30]));
        let blocks = level.blocks().unwrap();
        assert_eq!(blocks, vec![(GeoType::Tri3, 0..2), (GeoType::Quad4, 2..4)]);
    }

    #[test]
    fn test_cell_nodes_skip_separators() {
        let mut level = Level::default();
        level.push_cell(GeoType::Polyhed, [0, 1, 2, -1, 0, 1, 3, -1, 1, 2, 3, -1, 2, 0, 3]);
        assert_eq!(level.cell_nodes(0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_consistency() {
        let mut mesh = UMesh::new("m", 2, vec![0.0; 10]);
        mesh.levels.insert(0, mixed_level());
        assert!(mesh.check_consistency().is_err());
        mesh.levels.get_mut(&0).unwrap().sort_cells_in_med_file_format();
        mesh.check_consistency().unwrap();
        mesh.levels.get_mut(&0).unwrap().connectivity[0] = 5;
        assert!(mesh.check_consistency().is_err());
    }

    fn single_tri(connectivity: Vec<i64>, index: Vec<usize>) -> UMesh {
        let mut mesh = UMesh::new("m", 2, vec![0.0; 8]);
        let level = Level {
            types: vec![GeoType::Tri3],
            connectivity,
            index,
            ..Level::default()
        };
        mesh.levels.insert(0, level);
        mesh
    }

    #[test]
    fn test_index_must_span_connectivity() {
        single_tri(vec![0, 1, 2], vec![0, 3]).check_consistency().unwrap();
        // past the end
        let err = single_tri(vec![0, 1, 2], vec![0, 5]).check_consistency().unwrap_err();
        assert!(matches!(err, Error::MeshStructMismatch(_)));
        // not starting at 0
        let err = single_tri(vec![3, 0, 1, 2], vec![1, 4]).check_consistency().unwrap_err();
        assert!(matches!(err, Error::MeshStructMismatch(_)));
        // short of the end
        let err = single_tri(vec![0, 1, 2, 3], vec![0, 3]).check_consistency().unwrap_err();
        assert!(matches!(err, Error::MeshStructMismatch(_)));
    }

    #[test]
    fn test_decreasing_index() {
        let mut mesh = UMesh::new("m", 2, vec![0.0; 8]);
        let level = Level {
            types: vec![GeoType::Tri3, GeoType::Tri3],
            connectivity: vec![0, 1, 2, 1, 2, 3],
            index: vec![0, 4, 2],
            ..Level::default()
        };
        mesh.levels.insert(0, level);
        let err = mesh.check_consistency().unwrap_err();
        assert!(matches!(err, Error::MeshStructMismatch(_)));
    }

    #[test]
    fn test_node_count_per_type() {
        let err = single_tri(vec![0, 1], vec![0, 2]).check_consistency().unwrap_err();
        assert!(matches!(err, Error::MeshStructMismatch(_)));
        let err = single_tri(vec![0, -1, 2], vec![0, 3]).check_consistency().unwrap_err();
        assert!(matches!(err, Error::MeshStructMismatch(_)));

        let mut mesh = UMesh::new("m", 2, vec![0.0; 10]);
        let mut level = Level::default();
        level.push_cell(GeoType::Polygon, [0, 1, 2, 3, 4]);
        mesh.levels.insert(0, level);
        mesh.check_consistency().unwrap();
    }

    #[test]
    fn test_structured() {
        assert_eq!(structured_geo_type(&[3, 4]), Some(GeoType::Quad4));
        assert_eq!(structured_cell_count(&[3, 4]), 6);
        assert_eq!(structured_cell_count(&[3, 4, 1]), 6);
    }
}
