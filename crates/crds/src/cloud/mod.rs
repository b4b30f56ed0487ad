//! `cloud.xo.jet.crossplane.io` API group: cloud-init configs.

pub mod config;

pub use config::*;
