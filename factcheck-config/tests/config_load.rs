use factcheck_common::observability::LogFormat;
use factcheck_config::{ConfigError, FactcheckConfigLoader};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_with_env_overrides() {
    let tmp = TempDir::new().unwrap();
    let file_yaml = r#"
server:
  bind: "0.0.0.0:8080"
gemini:
  api_key: "${GEMINI_API_KEY}"
  models:
    - gemini-1.5-pro
    - gemini-pro
logging:
  format: json
  emit_stderr: false
"#;
    let p = write_yaml(&tmp, "factcheck.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("GEMINI_API_KEY", Some("from-env")),
            ("FACTCHECK__SERVER__BIND", Some("127.0.0.1:9000")),
        ],
        || {
            let config = FactcheckConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.gemini.api_key, "from-env");
            assert_eq!(config.server.bind, "127.0.0.1:9000");
            assert_eq!(config.gemini.models, vec!["gemini-1.5-pro", "gemini-pro"]);
            assert_eq!(config.logging.format, LogFormat::Json);
            assert!(!config.logging.emit_stderr);
        },
    );
}

#[test]
#[serial]
fn defaults_apply_when_only_the_key_is_set() {
    temp_env::with_var("GEMINI_API_KEY", Some("k"), || {
        let config = FactcheckConfigLoader::new().load().expect("defaults load");
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(config.server.index_path.is_none());
        assert_eq!(
            config.gemini.models,
            vec![
                "gemini-1.5-flash",
                "gemini-1.5-pro",
                "gemini-pro",
                "models/gemini-1.0-pro"
            ]
        );
        assert_eq!(
            config.gemini.base_url,
            "https://generativelanguage.googleapis.com/v1beta/"
        );
        assert_eq!(config.logging.filter, "info");
    });
}

#[test]
#[serial]
fn missing_api_key_is_fatal() {
    temp_env::with_var_unset("GEMINI_API_KEY", || {
        let err = FactcheckConfigLoader::new().load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    });
}

#[test]
#[serial]
fn blank_api_key_is_fatal() {
    temp_env::with_var("GEMINI_API_KEY", Some("   "), || {
        let err = FactcheckConfigLoader::new().load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    });
}

#[test]
#[serial]
fn optional_file_may_be_absent() {
    let tmp = TempDir::new().unwrap();
    temp_env::with_var("GEMINI_API_KEY", Some("k"), || {
        let config = FactcheckConfigLoader::new()
            .with_optional_file(tmp.path().join("missing.yaml"))
            .load()
            .expect("missing optional file is fine");
        assert_eq!(config.gemini.api_key, "k");
    });
}

#[test]
#[serial]
fn model_list_from_env_is_comma_separated() {
    temp_env::with_vars(
        [
            ("GEMINI_API_KEY", Some("k")),
            ("FACTCHECK__GEMINI__MODELS", Some("gemini-2.0-flash,gemini-1.5-flash")),
        ],
        || {
            let config = FactcheckConfigLoader::new().load().expect("load");
            assert_eq!(
                config.gemini.models,
                vec!["gemini-2.0-flash", "gemini-1.5-flash"]
            );
        },
    );
}

#[test]
#[serial]
fn explicit_config_path_must_exist() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.yaml");
    temp_env::with_vars(
        [
            ("GEMINI_API_KEY", Some("k")),
            ("FACTCHECK_CONFIG", Some(missing.to_str().unwrap())),
        ],
        || {
            let err = FactcheckConfigLoader::new()
                .with_default_file()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::Source(_)), "got {err:?}");
        },
    );
}

#[test]
#[serial]
fn explicit_config_path_is_loaded() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "custom.yaml", "server:\n  bind: \"0.0.0.0:7000\"\n");
    temp_env::with_vars(
        [
            ("GEMINI_API_KEY", Some("k")),
            ("FACTCHECK_CONFIG", Some(p.to_str().unwrap())),
        ],
        || {
            let config = FactcheckConfigLoader::new()
                .with_default_file()
                .load()
                .expect("named file loads");
            assert_eq!(config.server.bind, "0.0.0.0:7000");
        },
    );
}
