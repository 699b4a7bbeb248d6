//! Lagrange shape functions of reference elements.
//!
//! The nodes of a reference element come from the file, so shape functions
//! are not hard-coded: they are recovered by inverting the Vandermonde matrix
//! of a polynomial space matching the element. Several spaces and axis
//! orientations are tried, the first unisolvent one wins.

use crate::med::GeoType;
use nalgebra::DMatrix;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// No polynomial space is known for this type.
    NoBasis(GeoType),

    /// No known polynomial space interpolates these reference nodes.
    Singular(GeoType),

    /// Coordinate arrays don't match the node count of the type.
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoBasis(geo) => write!(f, "no shape functions available for {geo}"),
            Error::Singular(geo) => {
                write!(f, "reference nodes of {geo} are not unisolvent")
            }
            Error::SizeMismatch { expected, actual } => write!(
                f,
                "reference coordinates size mismatch (expected {expected} values, got {actual})"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// `coef * x^a * y^b * z^c` terms, optionally divided by `1 - w` where `w`
/// is one of the coordinates.
#[derive(Clone, Debug)]
struct Term {
    monomials: Vec<(f64, [u8; 3])>,
    over_one_minus: Option<usize>,
}

impl Term {
    fn eval(&self, p: [f64; 3]) -> f64 {
        let num: f64 = self
            .monomials
            .iter()
            .map(|(coef, [a, b, c])| {
                coef * p[0].powi(i32::from(*a)) * p[1].powi(i32::from(*b)) * p[2].powi(i32::from(*c))
            })
            .sum();
        match self.over_one_minus {
            None => num,
            Some(axis) => {
                let den = 1.0 - p[axis];
                if den.abs() < 1e-12 {
                    0.0
                } else {
                    num / den
                }
            }
        }
    }

    fn permuted(&self, perm: [usize; 3]) -> Term {
        Term {
            monomials: self
                .monomials
                .iter()
                .map(|(coef, exps)| {
                    let mut out = [0; 3];
                    for (axis, e) in exps.iter().enumerate() {
                        out[perm[axis]] = *e;
                    }
                    (*coef, out)
                })
                .collect(),
            over_one_minus: self.over_one_minus.map(|axis| perm[axis]),
        }
    }
}

fn mono(a: u8, b: u8, c: u8) -> Term {
    Term {
        monomials: vec![(1.0, [a, b, c])],
        over_one_minus: None,
    }
}

fn monos(exps: &[[u8; 3]]) -> Vec<Term> {
    exps.iter().map(|[a, b, c]| mono(*a, *b, *c)).collect()
}

const P2_TRI: [[u8; 3]; 6] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [2, 0, 0],
    [1, 1, 0],
    [0, 2, 0],
];

/// Candidate polynomial spaces, in canonical orientation (prism axes along
/// `z`, pyramid apex towards `z`).
fn spaces(geo: GeoType) -> Vec<Vec<Term>> {
    match geo {
        GeoType::Point1 => vec![monos(&[[0, 0, 0]])],
        GeoType::Seg2 => vec![monos(&[[0, 0, 0], [1, 0, 0]])],
        GeoType::Seg3 => vec![monos(&[[0, 0, 0], [1, 0, 0], [2, 0, 0]])],
        GeoType::Seg4 => vec![monos(&[[0, 0, 0], [1, 0, 0], [2, 0, 0], [3, 0, 0]])],
        GeoType::Tri3 => vec![monos(&[[0, 0, 0], [1, 0, 0], [0, 1, 0]])],
        GeoType::Tri6 => vec![monos(&P2_TRI)],
        GeoType::Tri7 => {
            let mut space = monos(&P2_TRI);
            space.push(Term {
                monomials: vec![(1.0, [1, 1, 0]), (-1.0, [2, 1, 0]), (-1.0, [1, 2, 0])],
                over_one_minus: None,
            });
            vec![space]
        }
        GeoType::Quad4 => vec![monos(&[[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0]])],
        GeoType::Quad8 | GeoType::Quad9 => {
            let mut exps = P2_TRI.to_vec();
            exps.extend([[2, 1, 0], [1, 2, 0]]);
            if geo == GeoType::Quad9 {
                exps.push([2, 2, 0]);
            }
            vec![monos(&exps)]
        }
        GeoType::Tetra4 => vec![monos(&[[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]])],
        GeoType::Tetra10 => vec![monos(&[
            [0, 0, 0],
            [1, 0, 0],
            [0, 1, 0],
            [0, 0, 1],
            [2, 0, 0],
            [0, 2, 0],
            [0, 0, 2],
            [1, 1, 0],
            [0, 1, 1],
            [1, 0, 1],
        ])],
        GeoType::Pyra5 => {
            let linear = monos(&[[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]]);
            let rational = |monomials: Vec<(f64, [u8; 3])>| {
                let mut space = linear.clone();
                space.push(Term {
                    monomials,
                    over_one_minus: Some(2),
                });
                space
            };
            vec![
                rational(vec![(1.0, [1, 1, 0])]),
                rational(vec![(1.0, [2, 0, 0]), (-1.0, [0, 2, 0])]),
            ]
        }
        GeoType::Penta6 => vec![monos(&[
            [0, 0, 0],
            [1, 0, 0],
            [0, 1, 0],
            [0, 0, 1],
            [1, 0, 1],
            [0, 1, 1],
        ])],
        GeoType::Penta15 | GeoType::Penta18 => {
            let mut exps: Vec<[u8; 3]> = Vec::new();
            for [a, b, _] in P2_TRI {
                exps.push([a, b, 0]);
                exps.push([a, b, 1]);
            }
            if geo == GeoType::Penta15 {
                exps.extend([[0, 0, 2], [1, 0, 2], [0, 1, 2]]);
            } else {
                exps.extend(P2_TRI.iter().map(|[a, b, _]| [*a, *b, 2]));
            }
            vec![monos(&exps)]
        }
        GeoType::Hexa8 => {
            let exps: Vec<[u8; 3]> = (0..8u8).map(|i| [i & 1, (i >> 1) & 1, (i >> 2) & 1]).collect();
            vec![monos(&exps)]
        }
        GeoType::Hexa20 => vec![monos(&[
            [0, 0, 0],
            [1, 0, 0],
            [0, 1, 0],
            [0, 0, 1],
            [2, 0, 0],
            [0, 2, 0],
            [0, 0, 2],
            [1, 1, 0],
            [0, 1, 1],
            [1, 0, 1],
            [2, 1, 0],
            [2, 0, 1],
            [1, 2, 0],
            [0, 2, 1],
            [1, 0, 2],
            [0, 1, 2],
            [1, 1, 1],
            [2, 1, 1],
            [1, 2, 1],
            [1, 1, 2],
        ])],
        GeoType::Hexa27 => {
            let mut exps: Vec<[u8; 3]> = Vec::with_capacity(27);
            for a in 0..3 {
                for b in 0..3 {
                    for c in 0..3 {
                        exps.push([a, b, c]);
                    }
                }
            }
            vec![monos(&exps)]
        }
        _ => Vec::new(),
    }
}

const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [1, 2, 0],
    [2, 0, 1],
    [0, 2, 1],
    [2, 1, 0],
    [1, 0, 2],
];

fn pad3(coords: &[f64]) -> [f64; 3] {
    let mut p = [0.0; 3];
    for (slot, c) in p.iter_mut().zip(coords) {
        *slot = *c;
    }
    p
}

/// Interpolation basis of a reference element.
#[derive(Clone, Debug)]
pub struct ShapeFunctions {
    terms: Vec<Term>,
    /// Inverse of the Vandermonde matrix of `terms` at the nodes.
    coefficients: DMatrix<f64>,
}

impl ShapeFunctions {
    /// Builds the shape functions of `geo` whose nodes are `ref_coords`, given
    /// with `dim` coordinates per node.
    pub fn new(geo: GeoType, ref_coords: &[f64], dim: usize) -> Result<ShapeFunctions, Error> {
        let n = geo.node_count().ok_or(Error::NoBasis(geo))?;
        if dim == 0 && n == 1 {
            return Ok(ShapeFunctions {
                terms: monos(&[[0, 0, 0]]),
                coefficients: DMatrix::identity(1, 1),
            });
        }
        if dim == 0 {
            // one coordinate per node at least
            return Err(Error::SizeMismatch {
                expected: n,
                actual: 0,
            });
        }
        if ref_coords.len() != n * dim {
            return Err(Error::SizeMismatch {
                expected: n * dim,
                actual: ref_coords.len(),
            });
        }
        let candidates = spaces(geo);
        if candidates.is_empty() {
            return Err(Error::NoBasis(geo));
        }
        let nodes: Vec<[f64; 3]> = ref_coords.chunks(dim).map(pad3).collect();
        for space in &candidates {
            for perm in PERMUTATIONS {
                let terms: Vec<Term> = space.iter().map(|t| t.permuted(perm)).collect();
                let vandermonde = DMatrix::from_fn(n, n, |i, j| terms[j].eval(nodes[i]));
                let inverse = match vandermonde.clone().try_inverse() {
                    Some(inverse) => inverse,
                    None => continue,
                };
                let check = &vandermonde * &inverse;
                let identity = DMatrix::<f64>::identity(n, n);
                if (check - identity).amax() > 1e-8 {
                    continue;
                }
                return Ok(ShapeFunctions {
                    terms,
                    coefficients: inverse,
                });
            }
        }
        Err(Error::Singular(geo))
    }

    pub fn node_count(&self) -> usize {
        self.terms.len()
    }

    /// Values of every shape function at `point`.
    pub fn eval(&self, point: &[f64]) -> Vec<f64> {
        let p = pad3(point);
        let n = self.terms.len();
        let t: Vec<f64> = self.terms.iter().map(|term| term.eval(p)).collect();
        (0..n)
            .map(|i| (0..n).map(|j| t[j] * self.coefficients[(j, i)]).sum())
            .collect()
    }

    /// Shape function values at each of the given points, one row of
    /// `node_count` values per point.
    pub fn eval_many(&self, points: &[f64], dim: usize) -> Vec<f64> {
        if dim == 0 {
            return vec![1.0; self.node_count()];
        }
        points.chunks(dim).flat_map(|p| self.eval(p)).collect()
    }
}
