//! End-to-end tests: YAML document -> autowire session -> working manager.

use bytes::Bytes;
use stowage::{AutoWire, Error};

#[tokio::test]
async fn yaml_file_to_working_manager() {
    let data_dir = tempfile::tempdir().unwrap();
    let config_dir = tempfile::tempdir().unwrap();
    std::env::set_var("STOWAGE_E2E_ROOT", data_dir.path().to_str().unwrap());

    let config_path = config_dir.path().join("disks.yml");
    std::fs::write(
        &config_path,
        r#"
files:
  provider: local
  config:
    path: ${STOWAGE_E2E_ROOT}
cache:
  provider: memory
default: files
"#,
    )
    .unwrap();

    let mut wire = AutoWire::new();
    stowage::local::register(&mut wire);
    stowage::memory::register(&mut wire);
    wire.load(&config_path).unwrap();

    let files = wire.disk_config("files").unwrap();
    assert_eq!(files.provider, "local");
    assert_eq!(
        files.config["path"].as_str(),
        data_dir.path().to_str(),
    );
    assert_eq!(wire.default_disk_name(), Some("files"));

    let manager = wire.build_manager().await.unwrap();
    assert_eq!(manager.default_disk_name().as_deref(), Some("files"));

    // Unqualified operations hit the default (local) disk.
    manager
        .put("docs/readme.md", Bytes::from("# hi"))
        .await
        .unwrap();
    assert!(data_dir.path().join("docs/readme.md").is_file());
    assert_eq!(
        manager.get("docs/readme.md").await.unwrap(),
        Bytes::from("# hi")
    );

    // Named disks are independent namespaces.
    let cache = manager.disk("cache").unwrap();
    cache.put("sessions/1", Bytes::from("s")).await.unwrap();
    assert!(manager.get("sessions/1").await.unwrap_err().is_not_found());
    assert_eq!(cache.get("sessions/1").await.unwrap(), Bytes::from("s"));

    // Neither configured backend can mint public URLs.
    let err = manager.public_url("docs/readme.md").await.unwrap_err();
    assert!(matches!(err, Error::UrlsUnsupported(name) if name == "files"));

    manager.delete("docs/readme.md").await.unwrap();
    assert!(!data_dir.path().join("docs/readme.md").exists());
}

#[tokio::test]
async fn failed_build_yields_no_manager() {
    let mut wire = AutoWire::new();
    stowage::memory::register(&mut wire);
    wire.load_yaml(
        r#"
a:
  provider: memory
b:
  provider: memory
queue:
  provider: sqs
"#,
    )
    .unwrap();

    // One unknown provider aborts the whole build; the two valid disks are
    // not reachable anywhere because no manager is returned at all.
    let err = wire.build_manager().await.err().unwrap();
    assert!(matches!(err, Error::UnregisteredProvider(id) if id == "sqs"));
}

#[tokio::test]
async fn rewiring_after_fixing_the_session() {
    let mut wire = AutoWire::new();
    stowage::memory::register(&mut wire);
    wire.load_yaml("a:\n  provider: sqs\n").unwrap();

    assert!(wire.build_manager().await.is_err());

    // The session is reusable: a later document replaces the bad definition.
    wire.load_yaml("a:\n  provider: memory\ndefault: a\n").unwrap();
    let manager = wire.build_manager().await.unwrap();
    manager.put("k", Bytes::from("v")).await.unwrap();
    assert_eq!(manager.get("k").await.unwrap(), Bytes::from("v"));
}
