//! `xenorchestra.xo.jet.crossplane.io` API group: VMs and ACLs.

pub mod acl;
pub mod vm;

pub use acl::*;
pub use vm::*;
