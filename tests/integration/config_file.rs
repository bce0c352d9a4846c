#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use widecol::{
    adapter::Adapter,
    config::{ClusterConfig, LoadBalancingPolicy, RetryPolicy},
    scope::RowLayout,
    statement::StoredAttributes,
    testkit::{MemoryConnection, StatementLog},
    types::{Consistency, Result, WidecolError},
};

const CLUSTER_TOML: &str = r#"
hosts = ["10.0.0.1", "10.0.0.2"]
keyspace = "tracker"
username = "app"
password = "secret"
compression = "lz4"
trace = true
load_balancing_policy = "DCAwareRoundRobin"
retry_policy = "downgrading-consistency"
consistency = "local_quorum"
page_size = 500

[ssl]
server_cert = "/etc/ssl/ca.pem"
passphrase = "hunter2"
"#;

#[test]
fn config_file_drives_the_adapter_consistency() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("cluster.toml");
    fs::write(&path, CLUSTER_TOML)?;

    let config = ClusterConfig::load(&path)?;
    assert_eq!(config.keyspace.as_deref(), Some("tracker"));
    assert_eq!(
        config.ssl.as_ref().and_then(|ssl| ssl.passphrase.as_deref()),
        Some("hunter2")
    );

    let options = config.cluster_options()?;
    assert_eq!(options.hosts, ["10.0.0.1", "10.0.0.2"]);
    assert_eq!(options.port, 9042);
    assert_eq!(options.load_balancing_policy, Some(LoadBalancingPolicy::DcAwareRoundRobin));
    assert_eq!(options.retry_policy, Some(RetryPolicy::DowngradingConsistency));
    assert_eq!(options.page_size, Some(500));
    assert_eq!(options.keyspace.as_deref(), Some("tracker"));
    assert_eq!(options.username.as_deref(), Some("app"));
    assert_eq!(options.password.as_deref(), Some("secret"));
    assert_eq!(options.compression.as_deref(), Some("lz4"));
    assert!(options.trace);
    let ssl = options.ssl.as_ref().expect("ssl settings pass through");
    assert_eq!(ssl.server_cert.as_deref(), Some(Path::new("/etc/ssl/ca.pem")));
    assert_eq!(ssl.passphrase.as_deref(), Some("hunter2"));

    let log = StatementLog::default();
    let mut conn = MemoryConnection::new();
    conn.create_table("Things", RowLayout::FixedSchema);
    let mut adapter = Adapter::from_config(conn, &config).with_observer(Arc::new(log.clone()));
    assert_eq!(adapter.consistency(), Some(Consistency::LocalQuorum));

    let mut attrs = StoredAttributes::new();
    attrs.insert("a".to_owned(), Some("1".to_owned()));
    adapter.write("Things", &"k".into(), &attrs)?;
    assert_eq!(
        log.statements(),
        vec!["INSERT INTO Things ('KEY','a') VALUES ('k','1') USING CONSISTENCY LOCAL_QUORUM".to_owned()]
    );
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().expect("tempdir");
    let err = ClusterConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, WidecolError::Io(_)));
}

#[test]
fn unknown_keys_and_selectors_are_config_errors() -> Result<()> {
    let err = ClusterConfig::from_toml_str("hostz = [\"a\"]").unwrap_err();
    assert!(matches!(err, WidecolError::Config(_)));

    let config = ClusterConfig::from_toml_str("reconnection_policy = \"sometimes\"")?;
    let err = config.cluster_options().unwrap_err();
    assert!(matches!(err, WidecolError::Config(message) if message.contains("sometimes")));
    Ok(())
}
