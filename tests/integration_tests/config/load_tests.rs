use devcamper::aggregate::Dispatch;
use devcamper::{AppConfig, ApiError, DependencyTable, Service};
use std::collections::HashMap;
use std::sync::Arc;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |k| map.get(k).cloned()
}

fn write_config(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let p = dir.path().join(name);
    std::fs::write(&p, body).unwrap();
    p
}

#[test]
fn cli_file_then_env_file_then_env_vars() {
    let dir = tempfile::tempdir().unwrap();
    let cli = write_config(&dir, "cli.toml", "[query]\nmax_page_size = 40\n");
    let from_env = write_config(
        &dir,
        "env.toml",
        "[query]\nmax_page_size = 90\ndefault_page_size = 10\n[aggregates]\ndispatch = \"detached\"\n",
    );
    let path = from_env.to_string_lossy().to_string();
    let lookup = env(&[("DEVCAMPER_CONFIG", path.as_str()), ("DEVCAMPER_LOG_LEVEL", "debug")]);
    let cfg = AppConfig::load_with(Some(&cli), &lookup).unwrap();
    assert_eq!(cfg.query.max_page_size, 40);
    assert_eq!(cfg.query.default_page_size, 10);
    assert_eq!(cfg.aggregates.dispatch, Dispatch::Detached);
    assert_eq!(cfg.log.level, "debug");
}

#[test]
fn env_beats_files() {
    let dir = tempfile::tempdir().unwrap();
    let cli = write_config(&dir, "cli.toml", "[query]\nconcurrent_reads = false\nstore_timeout_ms = 100\n");
    let lookup = env(&[("DEVCAMPER_CONCURRENT_READS", "true"), ("DEVCAMPER_STORE_TIMEOUT_MS", "250")]);
    let cfg = AppConfig::load_with(Some(&cli), &lookup).unwrap();
    let opts = cfg.service_options();
    assert!(opts.engine.concurrent_reads);
    assert_eq!(opts.engine.store_timeout_ms, Some(250));
}

#[test]
fn invalid_dependency_table_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let cli = write_config(
        &dir,
        "bad.toml",
        r#"
        [[aggregates.dependency]]
        name = "cost"
        child_collection = "courses"
        group_key = "bootcamp"
        metric = "tuition"
        parent_collection = "bootcamps"
        parent_field = "averageCost"
        rounding = { ceil_to_multiple = 0 }
        "#,
    );
    let err = AppConfig::load_with(Some(&cli), &env(&[])).unwrap_err();
    assert!(matches!(err, ApiError::Config(_)));
}

#[test]
fn configured_dependencies_drive_the_service() {
    let cfg = AppConfig::from_toml_str(
        r#"
        [[aggregates.dependency]]
        name = "longest-course"
        child_collection = "courses"
        group_key = "bootcamp"
        metric = "weeks"
        parent_collection = "bootcamps"
        parent_field = "maxWeeks"
        function = "max"
        "#,
    )
    .unwrap();
    let svc = Service::new(
        devcamper::Engine::new(),
        devcamper::ResourceRegistry::standard(),
        Arc::new(cfg.dependency_table().unwrap()),
        cfg.service_options(),
    );
    svc.create("bootcamps", bson::doc! {"_id": "b1", "name": "x"}).unwrap();
    svc.create_child("courses", "b1", bson::doc! {"weeks": 8, "tuition": 10}).unwrap();
    svc.create_child("courses", "b1", bson::doc! {"weeks": 12, "tuition": 10}).unwrap();
    assert_eq!(svc.derived_value("bootcamps", "b1", "maxWeeks").unwrap(), bson::Bson::Double(12.0));
    assert_eq!(svc.derived_value("bootcamps", "b1", "averageCost").unwrap(), bson::Bson::Null);
    assert_ne!(cfg.dependency_table().unwrap(), DependencyTable::standard());
}
