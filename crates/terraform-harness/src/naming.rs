//! Attribute name conversion between Kubernetes and Terraform
//!
//! CRD fields are camelCase, Terraform attributes are snake_case. Keys are
//! converted recursively through nested blocks and lists.

use serde_json::{Map, Value};

/// `memoryMax` -> `memory_max`, `ipv4Addresses` -> `ipv4_addresses`
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `memory_max` -> `memoryMax`, `ipv4_addresses` -> `ipv4Addresses`
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    out
}

fn rename_keys(value: &Value, rename: &dyn Fn(&str) -> String, drop_nulls: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                if drop_nulls && v.is_null() {
                    continue;
                }
                out.insert(rename(key), rename_keys(v, rename, drop_nulls));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rename_keys(item, rename, drop_nulls))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Convert CRD parameters to Terraform attributes
pub fn to_terraform(value: &Value) -> Value {
    rename_keys(value, &camel_to_snake, false)
}

/// Convert Terraform attributes to CRD field names, dropping null attributes
pub fn from_terraform(value: &Value) -> Value {
    rename_keys(value, &snake_to_camel, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("memoryMax"), "memory_max");
        assert_eq!(camel_to_snake("ipv4Addresses"), "ipv4_addresses");
        assert_eq!(camel_to_snake("vbdId"), "vbd_id");
        assert_eq!(camel_to_snake("cpus"), "cpus");
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("memory_max"), "memoryMax");
        assert_eq!(snake_to_camel("ipv6_addresses"), "ipv6Addresses");
        assert_eq!(snake_to_camel("hvm_boot_firmware"), "hvmBootFirmware");
        assert_eq!(snake_to_camel("id"), "id");
    }

    #[test]
    fn test_nested_blocks_are_converted() {
        let params = json!({
            "nameLabel": "web-01",
            "network": [{"networkId": "net-1", "macAddress": "aa:bb:cc:dd:ee:ff"}],
        });
        assert_eq!(
            to_terraform(&params),
            json!({
                "name_label": "web-01",
                "network": [{"network_id": "net-1", "mac_address": "aa:bb:cc:dd:ee:ff"}],
            })
        );
    }

    #[test]
    fn test_from_terraform_drops_nulls() {
        let attributes = json!({
            "id": "vm-1",
            "cloud_config": null,
            "disk": [{"vdi_id": "vdi-1", "position": null}],
        });
        assert_eq!(
            from_terraform(&attributes),
            json!({"id": "vm-1", "disk": [{"vdiId": "vdi-1"}]})
        );
    }
}
