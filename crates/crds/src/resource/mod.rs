//! `resource.xo.jet.crossplane.io` API group: resource sets.

pub mod set;

pub use set::*;
