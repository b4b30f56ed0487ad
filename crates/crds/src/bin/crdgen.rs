//! Prints every CRD of the XenOrchestra provider as a YAML stream.

use crds::{Acl, CloudConfig, ProviderConfig, ProviderConfigUsage, ResourceSet, Vm};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [
        ProviderConfig::crd(),
        ProviderConfigUsage::crd(),
        CloudConfig::crd(),
        ResourceSet::crd(),
        Acl::crd(),
        Vm::crd(),
    ];

    let mut documents = Vec::with_capacity(crds.len());
    for crd in &crds {
        documents.push(serde_yaml::to_string(crd)?);
    }
    print!("{}", documents.join("---\n"));
    Ok(())
}
