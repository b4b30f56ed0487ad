//! Integration tests for the terraform harness
//!
//! These tests require a terraform binary and a reachable XenOrchestra.
//! Set XOA_URL, XOA_USER and XOA_PASSWORD to run; TERRAFORM_BINARY
//! overrides the binary (default `terraform`).

use std::sync::Arc;
use std::time::Duration;
use terraform_harness::{CommandRunner, ResourceBlock, Setup, WorkspaceStore};

fn setup_from_env() -> Setup {
    let url = std::env::var("XOA_URL").expect("XOA_URL environment variable must be set");
    let mut setup = Setup::new("1.5.7", "vatesfr/xenorchestra", "0.26.1");
    setup.configuration.insert("url".to_string(), url.clone().into());
    for name in ["XOA_USER", "XOA_PASSWORD"] {
        let value = std::env::var(name).unwrap_or_default();
        setup.env.push(format!("{name}={value}"));
    }
    setup.env.push(format!("XOA_URL={url}"));
    setup.env.push("XOA_INSECURE=true".to_string());
    setup
}

fn runner() -> Arc<CommandRunner> {
    let binary = std::env::var("TERRAFORM_BINARY").unwrap_or_else(|_| "terraform".to_string());
    Arc::new(CommandRunner::new(binary, Duration::from_secs(600)))
}

#[tokio::test]
#[ignore] // Requires terraform and network access to the registry
async fn test_init_downloads_provider() {
    let root = tempfile::tempdir().unwrap();
    let store = WorkspaceStore::new(root.path(), runner());
    let block = ResourceBlock::new(
        "xenorchestra_cloud_config",
        "harness-init",
        serde_json::json!({"name": "harness-init", "template": "#cloud-config\n"}),
    );

    let workspace = store
        .open("harness-init", &setup_from_env(), block, None)
        .await
        .expect("Failed to open workspace");
    workspace.init().await.expect("terraform init failed");

    assert!(workspace.dir().join(".terraform").exists());
    assert!(workspace.refresh().await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires terraform and a running XenOrchestra
async fn test_cloud_config_lifecycle() {
    let root = tempfile::tempdir().unwrap();
    let store = WorkspaceStore::new(root.path(), runner());
    let mut block = ResourceBlock::new(
        "xenorchestra_cloud_config",
        "harness-lifecycle",
        serde_json::json!({"name": "harness-lifecycle", "template": "#cloud-config\n"}),
    );
    block.prevent_destroy = false;

    let workspace = store
        .open("harness-lifecycle", &setup_from_env(), block, None)
        .await
        .expect("Failed to open workspace");
    workspace.init().await.expect("terraform init failed");

    let created = workspace.apply().await.expect("terraform apply failed");
    println!("Created cloud config {}", created.id);

    let plan = workspace.plan().await.expect("terraform plan failed");
    assert!(plan.is_empty(), "unexpected changes after apply: {plan:?}");

    workspace.destroy().await.expect("terraform destroy failed");
    assert!(workspace.refresh().await.unwrap().is_none());
    store.remove("harness-lifecycle").await.unwrap();
}
