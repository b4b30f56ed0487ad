//! Terraform provider setup
//!
//! The `Setup` produced per reconciliation from a `ProviderConfig`: which
//! Terraform and provider versions to run, the provider block contents
//! and the environment passed to every terraform invocation.

use serde_json::{Map, Value};

/// Terraform registry host assumed when a provider source has no hostname
pub const DEFAULT_REGISTRY: &str = "registry.terraform.io";

/// Provider source and version constraint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderRequirement {
    /// Provider source (e.g. `vatesfr/xenorchestra`)
    pub source: String,
    /// Provider version constraint
    pub version: String,
}

impl ProviderRequirement {
    /// Local name of the provider, the last segment of its source
    pub fn local_name(&self) -> &str {
        self.source.rsplit('/').next().unwrap_or(&self.source)
    }

    /// Fully qualified provider address as written in state files
    pub fn address(&self) -> String {
        if self.source.split('/').count() >= 3 {
            format!("provider[\"{}\"]", self.source)
        } else {
            format!("provider[\"{}/{}\"]", DEFAULT_REGISTRY, self.source)
        }
    }
}

/// Everything needed to run the provider against one XenOrchestra endpoint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Setup {
    /// Terraform CLI version
    pub version: String,
    /// Provider requirement
    pub requirement: ProviderRequirement,
    /// Provider block contents
    pub configuration: Map<String, Value>,
    /// Environment as `NAME=value` entries
    pub env: Vec<String>,
}

impl Setup {
    /// Create a setup with no configuration or environment
    pub fn new(version: impl Into<String>, source: impl Into<String>, provider_version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            requirement: ProviderRequirement {
                source: source.into(),
                version: provider_version.into(),
            },
            configuration: Map::new(),
            env: Vec::new(),
        }
    }

    /// Environment entries split into name/value pairs; malformed entries are skipped
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_and_address() {
        let requirement = ProviderRequirement {
            source: "vatesfr/xenorchestra".to_string(),
            version: "0.26.1".to_string(),
        };
        assert_eq!(requirement.local_name(), "xenorchestra");
        assert_eq!(
            requirement.address(),
            "provider[\"registry.terraform.io/vatesfr/xenorchestra\"]"
        );

        let hosted = ProviderRequirement {
            source: "registry.example.com/vatesfr/xenorchestra".to_string(),
            version: "0.26.1".to_string(),
        };
        assert_eq!(hosted.address(), "provider[\"registry.example.com/vatesfr/xenorchestra\"]");
    }

    #[test]
    fn test_env_pairs_split_on_first_equals() {
        let mut setup = Setup::new("1.5.7", "vatesfr/xenorchestra", "0.26.1");
        setup.env = vec![
            "XOA_PASSWORD=a=b".to_string(),
            "XOA_INSECURE=".to_string(),
            "garbage".to_string(),
        ];
        assert_eq!(
            setup.env_pairs(),
            vec![
                ("XOA_PASSWORD".to_string(), "a=b".to_string()),
                ("XOA_INSECURE".to_string(), String::new()),
            ]
        );
    }
}
