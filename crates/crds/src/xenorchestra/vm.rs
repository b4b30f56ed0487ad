//! VM Custom Resource Definition
//!
//! A XenOrchestra virtual machine cloned from a template, with its
//! network interfaces, disks and optional cloud-init configuration.
//! Backed by the `xenorchestra_vm` Terraform resource.

use crate::common::{DeletionPolicy, ResourceStatus};
use crate::managed::impl_managed;
use crate::references::{default_provider_config_ref, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VmSpec defines the desired state of a XenOrchestra VM
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "xenorchestra.xo.jet.crossplane.io",
    version = "v1alpha1",
    kind = "VM",
    root = "Vm",
    status = "VmStatus",
    category = "crossplane",
    category = "managed",
    category = "xo",
    printcolumn = r#"{"name":"READY","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"SYNCED","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"POWER","type":"string","jsonPath":".status.atProvider.powerState"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VmSpec {
    /// ProviderConfig holding the XenOrchestra credentials
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// What happens to the VM in XenOrchestra when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// VM parameters
    pub for_provider: VmParameters,
}

/// VM parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VmParameters {
    /// VM name
    pub name_label: String,

    /// VM description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_description: Option<String>,

    /// Id of the template to clone
    pub template: String,

    /// Number of vCPUs
    pub cpus: i64,

    /// Maximum memory in bytes
    pub memory_max: i64,

    /// Network interfaces (at least one)
    pub network: Vec<NetworkParameters>,

    /// Disks (at least one)
    pub disk: Vec<DiskParameters>,

    /// ISO mounted in the CD drive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cdrom: Vec<CdromParameters>,

    /// Preferred host for the VM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_host: Option<String>,

    /// Start the VM when its host boots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_poweron: Option<bool>,

    /// XenAPI operations that are blocked on the VM
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_operations: Vec<String>,

    /// CPU cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cap: Option<i64>,

    /// CPU weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_weight: Option<i64>,

    /// Cloud-init user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_config: Option<String>,

    /// Cloud-init network configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_network_config: Option<String>,

    /// Template is a CoreOS template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_os: Option<bool>,

    /// Enable nested virtualization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_nested_hvm: Option<bool>,

    /// High availability mode (`restart`, `best-effort` or empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<String>,

    /// Host to start the VM on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Boot firmware (`bios` or `uefi`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hvm_boot_firmware: Option<String>,

    /// Installation method (`network` for PXE)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_method: Option<String>,

    /// Resource set the VM is created in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_set: Option<String>,

    /// Delay in seconds before the VM is started on host boot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_delay: Option<i64>,

    /// XenOrchestra tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Graphics adapter (`cirrus` or `std`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vga: Option<String>,

    /// Video RAM in MiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videoram: Option<i64>,

    /// Wait until the guest reports an IP address before completing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_ip: Option<bool>,
}

/// Network interface parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParameters {
    /// Id of the network to attach to
    pub network_id: String,

    /// MAC address (generated when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,

    /// Whether the interface is plugged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached: Option<bool>,
}

/// Disk parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiskParameters {
    /// Storage repository holding the disk
    pub sr_id: String,

    /// Disk name
    pub name_label: String,

    /// Disk description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_description: Option<String>,

    /// Size in bytes
    pub size: i64,

    /// Whether the disk is plugged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached: Option<bool>,
}

/// CD drive parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CdromParameters {
    /// Id of the ISO VDI
    pub id: String,
}

/// Observed VM attributes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VmObservation {
    /// XenOrchestra VM id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// IPv4 addresses reported by the guest
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,

    /// IPv6 addresses reported by the guest
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6_addresses: Vec<String>,

    /// Power state (`Running`, `Halted`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,

    /// Observed network interfaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network: Vec<NetworkObservation>,

    /// Observed disks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disk: Vec<DiskObservation>,
}

/// Observed network interface attributes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkObservation {
    /// VIF device number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// IPv4 addresses on this interface
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,

    /// IPv6 addresses on this interface
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6_addresses: Vec<String>,
}

/// Observed disk attributes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiskObservation {
    /// VBD position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    /// VBD id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vbd_id: Option<String>,

    /// VDI id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdi_id: Option<String>,
}

/// VM status
pub type VmStatus = ResourceStatus<VmObservation>;

impl_managed!(Vm, VmParameters, VmObservation, "xenorchestra_vm");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managed::Managed;
    use kube::CustomResourceExt;

    fn sample_parameters() -> VmParameters {
        VmParameters {
            name_label: "web-01".to_string(),
            template: "tmpl-ubuntu".to_string(),
            cpus: 2,
            memory_max: 4 * 1024 * 1024 * 1024,
            network: vec![NetworkParameters {
                network_id: "net-1".to_string(),
                ..Default::default()
            }],
            disk: vec![DiskParameters {
                sr_id: "sr-1".to_string(),
                name_label: "root".to_string(),
                size: 20 * 1024 * 1024 * 1024,
                ..Default::default()
            }],
            wait_for_ip: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_vm_parameters_skip_unset_fields() {
        let json = serde_json::to_value(sample_parameters()).unwrap();
        assert_eq!(json["nameLabel"], "web-01");
        assert_eq!(json["memoryMax"], 4_294_967_296_i64);
        assert_eq!(json["network"][0]["networkId"], "net-1");
        assert_eq!(json["waitForIp"], true);
        assert!(json.get("cdrom").is_none());
        assert!(json.get("tags").is_none());
        assert!(json.get("affinityHost").is_none());
    }

    #[test]
    fn test_vm_observation_accepts_partial_attributes() {
        let observation: VmObservation = serde_json::from_value(serde_json::json!({
            "id": "77c6637c-fa3d-0a46-717e-296208c40169",
            "powerState": "Running",
            "ipv4Addresses": ["10.0.0.12"],
            "unknownAttribute": "ignored"
        }))
        .unwrap();
        assert_eq!(observation.power_state.as_deref(), Some("Running"));
        assert_eq!(observation.ipv4_addresses, vec!["10.0.0.12".to_string()]);
        assert!(observation.disk.is_empty());
    }

    #[test]
    fn test_vm_crd_names() {
        let crd = Vm::crd();
        assert_eq!(crd.spec.names.kind, "VM");
        assert_eq!(crd.spec.names.plural, "vms");
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(Vm::TERRAFORM_TYPE, "xenorchestra_vm");
    }
}
