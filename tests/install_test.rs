//! Integration tests for platform and tool installation
//!
//! Index documents in the toolchain root point at a wiremock server; installs
//! go through the fabric's download queue.

mod common;

use std::sync::Arc;

use common::{tar_gz, RecordingHost, TestProject, BOARDS_TXT};
use sha2::{Digest, Sha256};
use sketchforge::core::selection;
use sketchforge::core::workspace::Workspace;
use sketchforge::infra::layout::ToolchainLayout;
use sketchforge::infra::serial::StaticPorts;
use sketchforge::runtime::Fabric;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checksum(data: &[u8]) -> String {
    format!("SHA-256:{}", hex::encode(Sha256::digest(data)))
}

fn index_json(server: &str, platform_sum: &str, tool_sum: &str) -> String {
    format!(
        r#"{{
  "packages": [{{
    "name": "acme",
    "platforms": [{{
      "name": "Acme AVR",
      "architecture": "avr",
      "version": "1.0.0",
      "url": "{server}/acme-avr-1.0.0.tar.gz",
      "checksum": "{platform_sum}",
      "help": {{ "online": "https://acme.example.com/docs" }},
      "toolsDependencies": [{{ "packager": "acme", "name": "fake-gcc", "version": "1.0" }}]
    }}],
    "tools": [{{
      "name": "fake-gcc",
      "version": "1.0",
      "systems": [
        {{ "host": "x86_64-pc-linux-gnu", "url": "{server}/fake-gcc.tar.gz", "checksum": "{tool_sum}" }},
        {{ "host": "aarch64-linux-gnu", "url": "{server}/fake-gcc.tar.gz", "checksum": "{tool_sum}" }},
        {{ "host": "i686-pc-linux-gnu", "url": "{server}/fake-gcc.tar.gz", "checksum": "{tool_sum}" }},
        {{ "host": "x86_64-apple-darwin", "url": "{server}/fake-gcc.tar.gz", "checksum": "{tool_sum}" }},
        {{ "host": "i686-mingw32", "url": "{server}/fake-gcc.tar.gz", "checksum": "{tool_sum}" }}
      ]
    }}]
  }}]
}}"#
    )
}

fn start(project: &TestProject, host: &Arc<RecordingHost>) -> Fabric {
    let workspace = Workspace::load(ToolchainLayout::new(project.toolchain_root()), Vec::new());
    Fabric::start(
        workspace,
        host.clone(),
        Arc::new(StaticPorts::default()),
        project.fabric_config(),
    )
}

#[tokio::test]
async fn test_install_platform_then_its_tools() {
    let server = MockServer::start().await;
    let platform = tar_gz(&[
        ("avr/boards.txt", BOARDS_TXT),
        ("avr/platform.txt", "name=Acme AVR\n"),
    ]);
    let tool = tar_gz(&[("fake-gcc/bin/fake-gcc", "#!/bin/sh\n")]);
    Mock::given(method("GET"))
        .and(path("/acme-avr-1.0.0.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(platform.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fake-gcc.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(tool.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let project = TestProject::new();
    project.create_file(
        "toolchain/package_index.json",
        &index_json(&server.uri(), &checksum(&platform), &checksum(&tool)),
    );
    let host = Arc::new(RecordingHost::default());
    let fabric = start(&project, &host);

    fabric.install_platform("acme", "Acme AVR", "1.0.0").await.unwrap();
    fabric.drain().await;

    let messages = host.messages();
    assert!(
        messages.contains(&"[acme] avr 1.0.0: Installation completed.".to_string()),
        "{messages:?}"
    );
    assert!(
        messages.contains(&"[acme] fake-gcc 1.0: Installation completed.".to_string()),
        "{messages:?}"
    );
    assert!(project.file_exists("toolchain/packages/acme/hardware/avr/1.0.0/boards.txt"));
    assert!(project.file_exists("toolchain/packages/acme/tools/fake-gcc/1.0/bin/fake-gcc"));

    let view = fabric.state().view().await.unwrap();
    assert_eq!(view.selected(selection::PLATFORM), Some("Acme AVR"));
    assert_eq!(view.selected(selection::BOARD), Some("Test Uno"));
    assert_eq!(
        fabric.state().platform_help_url().await.unwrap().as_deref(),
        Some("https://acme.example.com/docs")
    );
    fabric.stop();
}

#[tokio::test]
async fn test_installed_platform_is_not_downloaded_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let project = TestProject::new();
    project.create_file(
        "toolchain/package_index.json",
        &index_json(&server.uri(), "", ""),
    );
    project.install_platform("acme", "avr", "1.0.0", &[("boards.txt", BOARDS_TXT)]);
    project.create_file("toolchain/packages/acme/tools/fake-gcc/1.0/bin/fake-gcc", "");
    let host = Arc::new(RecordingHost::default());
    let fabric = start(&project, &host);

    fabric.install_platform("acme", "Acme AVR", "1.0.0").await.unwrap();
    fabric.drain().await;

    assert!(host.messages().is_empty(), "{:?}", host.messages());
    fabric.stop();
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_nothing_installed() {
    let server = MockServer::start().await;
    let platform = tar_gz(&[("avr/boards.txt", BOARDS_TXT)]);
    Mock::given(method("GET"))
        .and(path("/acme-avr-1.0.0.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(platform))
        .mount(&server)
        .await;

    let project = TestProject::new();
    let wrong = format!("SHA-256:{}", "0".repeat(64));
    project.create_file(
        "toolchain/package_index.json",
        &index_json(&server.uri(), &wrong, &wrong),
    );
    let host = Arc::new(RecordingHost::default());
    let fabric = start(&project, &host);

    fabric.install_platform("acme", "Acme AVR", "1.0.0").await.unwrap();
    fabric.drain().await;

    let messages = host.messages();
    assert!(
        !messages.iter().any(|m| m.ends_with("Installation completed.")),
        "{messages:?}"
    );
    assert!(!project.file_exists("toolchain/packages/acme/hardware/avr/1.0.0"));
    fabric.stop();
}

#[tokio::test]
async fn test_unknown_release_is_rejected() {
    let project = TestProject::new();
    let host = Arc::new(RecordingHost::default());
    let fabric = start(&project, &host);

    let result = fabric.install_platform("acme", "Acme AVR", "9.9.9").await;
    assert!(result.is_err());
    fabric.stop();
}
