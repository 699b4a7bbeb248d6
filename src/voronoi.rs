//! Voronoi cells of seed points restricted to a mesh cell.
//!
//! The cell of a seed is the part of the mesh cell closer to it than to any
//! other seed. It is computed by clipping the mesh cell with the bisector
//! half-space of every other seed, which is exact for convex cells.

use crate::med::GeoType;
use itertools::Itertools;
use nalgebra::Vector3;
use std::fmt;

pub type Point3D = Vector3<f64>;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The cell type has no known boundary.
    UnsupportedType(GeoType),

    /// Not enough nodes for the cell type.
    NotEnoughNodes { geo: GeoType, expected: usize, actual: usize },

    /// The cell has no length, area or volume.
    Degenerate,

    /// A seed got an empty Voronoi cell, e.g. because it is duplicated.
    EmptyCell { seed: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedType(geo) => {
                write!(f, "cannot voronoize cells of type {}", geo.repr())
            }
            Error::NotEnoughNodes {
                geo,
                expected,
                actual,
            } => write!(
                f,
                "{} cell with {actual} nodes, expected {expected}",
                geo.repr()
            ),
            Error::Degenerate => write!(f, "degenerate cell"),
            Error::EmptyCell { seed } => write!(f, "seed #{seed} has an empty Voronoi cell"),
        }
    }
}

impl std::error::Error for Error {}

/// A piece of space: a segment, a planar polygon or a polyhedron given by
/// its faces.
#[derive(Clone, Debug, PartialEq)]
pub enum Region {
    Segment(Point3D, Point3D),
    Polygon(Vec<Point3D>),
    Polyhedron(Vec<Vec<Point3D>>),
}

impl Region {
    /// The region covered by a cell of type `geo` whose nodes are `nodes`.
    /// Quadratic cells are reduced to their corners.
    pub fn from_cell(geo: GeoType, nodes: &[Point3D]) -> Result<Region, Error> {
        let corners = match geo.corner_count() {
            Some(n) => n,
            None if geo == GeoType::Polygon => nodes.len(),
            None if geo == GeoType::QPolyg => nodes.len() / 2,
            None => return Err(Error::UnsupportedType(geo)),
        };
        if nodes.len() < corners {
            return Err(Error::NotEnoughNodes {
                geo,
                expected: corners,
                actual: nodes.len(),
            });
        }
        let corners = &nodes[..corners];
        match geo.dimension() {
            1 => Ok(Region::Segment(corners[0], corners[1])),
            2 => Ok(Region::Polygon(corners.to_vec())),
            3 => {
                let faces = geo.faces().ok_or(Error::UnsupportedType(geo))?;
                Ok(Region::Polyhedron(
                    faces
                        .iter()
                        .map(|face| face.iter().map(|&i| corners[i]).collect())
                        .collect(),
                ))
            }
            _ => Err(Error::UnsupportedType(geo)),
        }
    }

    /// Length, area or volume.
    pub fn measure(&self) -> f64 {
        match self {
            Region::Segment(a, b) => (b - a).norm(),
            Region::Polygon(points) => polygon_normal(points).norm() / 2.0,
            Region::Polyhedron(faces) => signed_volume(faces).abs(),
        }
    }

    /// Points of the region without duplicates, in order of first
    /// appearance.
    pub fn vertices(&self, eps: f64) -> Vec<Point3D> {
        let all: Vec<Point3D> = match self {
            Region::Segment(a, b) => vec![*a, *b],
            Region::Polygon(points) => points.clone(),
            Region::Polyhedron(faces) => faces.iter().flatten().copied().collect(),
        };
        let mut unique: Vec<Point3D> = Vec::with_capacity(all.len());
        for p in all {
            if !unique.iter().any(|q| (q - p).norm() <= eps) {
                unique.push(p);
            }
        }
        unique
    }

    /// The part of the region where `(x - origin) . normal <= 0`, `None`
    /// when empty.
    fn clip(&self, origin: &Point3D, normal: &Point3D, eps: f64) -> Option<Region> {
        match self {
            Region::Segment(a, b) => {
                let da = (a - origin).dot(normal);
                let db = (b - origin).dot(normal);
                match (da <= eps, db <= eps) {
                    (true, true) => Some(self.clone()),
                    (false, false) => None,
                    _ => {
                        let cut = a + (b - a) * (da / (da - db));
                        if da <= eps {
                            Some(Region::Segment(*a, cut))
                        } else {
                            Some(Region::Segment(cut, *b))
                        }
                    }
                }
            }
            Region::Polygon(points) => {
                let clipped = clip_polygon(points, origin, normal, eps);
                (clipped.len() >= 3).then(|| Region::Polygon(clipped))
            }
            Region::Polyhedron(faces) => {
                let mut clipped: Vec<Vec<Point3D>> = faces
                    .iter()
                    .map(|face| clip_polygon(face, origin, normal, eps))
                    .filter(|face| face.len() >= 3)
                    .collect();
                if clipped.is_empty() {
                    return None;
                }
                let on_plane: Vec<Point3D> = clipped
                    .iter()
                    .flatten()
                    .filter(|p| ((*p - origin).dot(normal)).abs() <= eps * normal.norm().max(1.0))
                    .copied()
                    .collect();
                let mut cap = order_around(&dedup(on_plane, eps), normal);
                // Faces pointing inward give a negative volume.
                if signed_volume(faces) < 0.0 {
                    cap.reverse();
                }
                if cap.len() >= 3 {
                    clipped.push(cap);
                }
                (clipped.len() >= 4).then(|| Region::Polyhedron(clipped))
            }
        }
    }

    fn is_negligible(&self, reference: f64, eps: f64) -> bool {
        self.measure() <= eps * reference.max(1.0)
    }
}

/// Voronoi cells of `seeds` inside `region`, one per seed and in the same
/// order.
pub fn voronoize(region: &Region, seeds: &[Point3D], eps: f64) -> Result<Vec<Region>, Error> {
    let reference = region.measure();
    if reference <= eps {
        return Err(Error::Degenerate);
    }
    if seeds.len() == 1 {
        return Ok(vec![region.clone()]);
    }
    seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let mut cell = region.clone();
            for (j, other) in seeds.iter().enumerate() {
                if i == j {
                    continue;
                }
                let normal = other - seed;
                if normal.norm() <= eps {
                    return Err(Error::EmptyCell { seed: i.max(j) });
                }
                let origin = (seed + other) / 2.0;
                cell = cell
                    .clip(&origin, &normal, eps)
                    .ok_or(Error::EmptyCell { seed: i })?;
            }
            if cell.is_negligible(reference, eps) {
                return Err(Error::EmptyCell { seed: i });
            }
            Ok(cell)
        })
        .collect()
}

/// Sutherland-Hodgman clipping of a polygon by one half-space.
fn clip_polygon(points: &[Point3D], origin: &Point3D, normal: &Point3D, eps: f64) -> Vec<Point3D> {
    let mut out = Vec::with_capacity(points.len() + 1);
    let scale = eps * normal.norm().max(1.0);
    for (a, b) in points.iter().circular_tuple_windows() {
        let da = (a - origin).dot(normal);
        let db = (b - origin).dot(normal);
        let a_in = da <= scale;
        let b_in = db <= scale;
        if a_in {
            out.push(*a);
        }
        if a_in != b_in && (da - db).abs() > f64::EPSILON {
            let t = da / (da - db);
            if t > 0.0 && t < 1.0 {
                out.push(a + (b - a) * t);
            }
        }
    }
    dedup_consecutive(out, eps)
}

fn dedup_consecutive(points: Vec<Point3D>, eps: f64) -> Vec<Point3D> {
    let mut out: Vec<Point3D> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().map_or(true, |q| (q - p).norm() > eps) {
            out.push(p);
        }
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).norm() <= eps {
        out.pop();
    }
    out
}

fn dedup(points: Vec<Point3D>, eps: f64) -> Vec<Point3D> {
    let mut out: Vec<Point3D> = Vec::with_capacity(points.len());
    for p in points {
        if !out.iter().any(|q| (q - p).norm() <= eps) {
            out.push(p);
        }
    }
    out
}

/// Sorts coplanar points counterclockwise around their centroid, seen from
/// the tip of `normal`.
fn order_around(points: &[Point3D], normal: &Point3D) -> Vec<Point3D> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let n = normal.normalize();
    let c = centroid(points);
    let helper = if n.x.abs() < 0.9 {
        Point3D::x()
    } else {
        Point3D::y()
    };
    let u = n.cross(&helper).normalize();
    let v = n.cross(&u);
    points
        .iter()
        .map(|p| {
            let d = p - c;
            (d.dot(&v).atan2(d.dot(&u)), *p)
        })
        .sorted_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, p)| p)
        .collect()
}

/// Volume enclosed by `faces`, positive when they point outward.
fn signed_volume(faces: &[Vec<Point3D>]) -> f64 {
    let origin = faces
        .iter()
        .flatten()
        .next()
        .copied()
        .unwrap_or_else(Point3D::zeros);
    faces
        .iter()
        .map(|face| (centroid(face) - origin).dot(&polygon_normal(face)) / 6.0)
        .sum()
}

fn centroid(points: &[Point3D]) -> Point3D {
    let sum: Point3D = points.iter().sum();
    sum / points.len().max(1) as f64
}

/// Newell normal, of norm twice the area.
fn polygon_normal(points: &[Point3D]) -> Point3D {
    points
        .iter()
        .circular_tuple_windows()
        .map(|(a, b)| a.cross(b))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: f64, y: f64, z: f64) -> Point3D {
        Point3D::new(x, y, z)
    }

    fn unit_cube() -> Region {
        let nodes = [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ];
        Region::from_cell(GeoType::Hexa8, &nodes).unwrap()
    }

    #[test]
    fn test_segment_split_at_midpoints() {
        let seg = Region::Segment(p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0));
        let cells = voronoize(&seg, &[p(3.0, 0.0, 0.0), p(1.0, 0.0, 0.0)], 1e-12).unwrap();
        assert_eq!(cells[0], Region::Segment(p(2.0, 0.0, 0.0), p(4.0, 0.0, 0.0)));
        assert_eq!(cells[1], Region::Segment(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_triangle_areas() {
        let tri = Region::from_cell(
            GeoType::Tri3,
            &[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
        )
        .unwrap();
        let seeds = [
            p(1.0 / 6.0, 1.0 / 6.0, 0.0),
            p(2.0 / 3.0, 1.0 / 6.0, 0.0),
            p(1.0 / 6.0, 2.0 / 3.0, 0.0),
        ];
        let cells = voronoize(&tri, &seeds, 1e-12).unwrap();
        assert_eq!(cells.len(), 3);
        let total: f64 = cells.iter().map(Region::measure).sum();
        assert_relative_eq!(total, 0.5, epsilon = 1e-12);
        // The two corner seeds are symmetric.
        assert_relative_eq!(cells[1].measure(), cells[2].measure(), epsilon = 1e-12);
    }

    #[test]
    fn test_cube_halves() {
        let cube = unit_cube();
        assert_relative_eq!(cube.measure(), 1.0, epsilon = 1e-12);
        let cells = voronoize(&cube, &[p(0.25, 0.5, 0.5), p(0.75, 0.5, 0.5)], 1e-12).unwrap();
        for cell in &cells {
            assert_relative_eq!(cell.measure(), 0.5, epsilon = 1e-12);
            match cell {
                Region::Polyhedron(faces) => assert_eq!(faces.len(), 6),
                other => panic!("unexpected region {other:?}"),
            }
        }
        assert_eq!(cells[0].vertices(1e-12).len(), 8);
    }

    #[test]
    fn test_cap_follows_face_orientation() {
        let cube = unit_cube();
        let cells = voronoize(&cube, &[p(0.5, 0.5, 0.25), p(0.5, 0.5, 0.75)], 1e-12).unwrap();
        for cell in &cells {
            match cell {
                Region::Polyhedron(faces) => {
                    assert!(signed_volume(faces) < 0.0);
                    assert_relative_eq!(signed_volume(faces), -0.5, epsilon = 1e-12);
                }
                other => panic!("unexpected region {other:?}"),
            }
        }
    }

    #[test]
    fn test_duplicate_seed() {
        let cube = unit_cube();
        let seeds = [p(0.5, 0.5, 0.5), p(0.5, 0.5, 0.5)];
        assert_eq!(voronoize(&cube, &seeds, 1e-12), Err(Error::EmptyCell { seed: 1 }));
    }

    #[test]
    fn test_unsupported_type() {
        assert_eq!(
            Region::from_cell(GeoType::Polyhed, &[]),
            Err(Error::UnsupportedType(GeoType::Polyhed))
        );
        assert!(matches!(
            Region::from_cell(GeoType::Tri3, &[p(0.0, 0.0, 0.0)]),
            Err(Error::NotEnoughNodes { expected: 3, actual: 1, .. })
        ));
    }

    proptest! {
        #[test]
        fn test_cells_partition_the_cube(
            seeds in prop::collection::vec((0.05f64..0.95, 0.05f64..0.95, 0.05f64..0.95), 1..6)
        ) {
            let seeds: Vec<Point3D> = seeds.into_iter().map(|(x, y, z)| p(x, y, z)).collect();
            let far_apart = seeds
                .iter()
                .tuple_combinations()
                .all(|(a, b)| (a - b).norm() > 1e-3);
            prop_assume!(far_apart);
            let cells = voronoize(&unit_cube(), &seeds, 1e-12).unwrap();
            prop_assert_eq!(cells.len(), seeds.len());
            let total: f64 = cells.iter().map(Region::measure).sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
    }
}
