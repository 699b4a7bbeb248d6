//! Mesh file adapters for the `medreader` dataset model.

#![warn(missing_debug_implementations, rust_2018_idioms)]

#[cfg(feature = "vtk-legacy")]
pub mod vtk;
