//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use cdr_deid::config::load_config;
use cdr_deid::rules::{Dialect, RuleFamily};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("DEID_APPLICATION_LOG_LEVEL");
    std::env::remove_var("DEID_APPLICATION_DRY_RUN");
    std::env::remove_var("DEID_DIALECT");
    std::env::remove_var("DEID_PIPELINE");
    std::env::remove_var("DEID_RULES_PATH");
    std::env::remove_var("DEID_OUTPUT_MANIFEST");
    std::env::remove_var("TEST_DEID_RULES_DIR");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "debug"
dry_run = true

[deid]
dialect = "postgresql"
pipeline = ["generalize", "suppress", "shift"]
rules_path = "/srv/deid/rules.json"

[output]
directory = "/srv/deid/sql"
manifest = false

[[tables]]
name = "person"
source = "cdr.person"
info_path = "tables/person.json"
columns = ["person_id", "race_source_value", "zip"]

[[tables]]
name = "observation"
info_path = "tables/observation.json"
columns = ["observation_id", "observation_date"]

[logging]
local_enabled = false
local_rotation = "hourly"
local_max_files = 3
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);
    assert_eq!(config.deid.dialect, Dialect::Postgresql);
    assert!(!config.deid.pipeline.contains(RuleFamily::Compute));
    assert_eq!(config.deid.pipeline.describe(), "generalize, suppress, shift");
    assert!(!config.output.manifest);
    assert_eq!(config.tables.len(), 2);
    assert_eq!(config.table("person").unwrap().source_table(), "cdr.person");
    assert_eq!(
        config.table("observation").unwrap().source_table(),
        "observation"
    );
    assert_eq!(config.logging.local_rotation, "hourly");
    assert_eq!(config.logging.local_max_files, 3);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config("[deid]\nrules_path = \"rules.json\"\n");

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.deid.dialect, Dialect::Bigquery);
    assert_eq!(
        config.deid.pipeline.describe(),
        "generalize, compute, suppress, shift"
    );
    assert_eq!(config.output.directory, "output");
    assert!(config.output.manifest);
    assert!(config.tables.is_empty());
    assert!(config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_DEID_RULES_DIR", "/opt/curation");

    let file = write_config(
        r#"
[deid]
# ${NOT_SET_BUT_COMMENTED}
rules_path = "${TEST_DEID_RULES_DIR}/rules.json"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.deid.rules_path, "/opt/curation/rules.json");

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config("[deid]\nrules_path = \"${TEST_DEID_RULES_DIR}/rules.json\"\n");

    let err = load_config(file.path()).unwrap_err().to_string();
    assert!(err.contains("TEST_DEID_RULES_DIR"), "{err}");
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("DEID_DIALECT", "sqlite");
    std::env::set_var("DEID_PIPELINE", "suppress,shift");
    std::env::set_var("DEID_APPLICATION_LOG_LEVEL", "warn");

    let file = write_config("[deid]\nrules_path = \"rules.json\"\n");
    let config = load_config(file.path());
    cleanup_env_vars();

    let config = config.unwrap();
    assert_eq!(config.deid.dialect, Dialect::Sqlite);
    assert_eq!(config.deid.pipeline.describe(), "suppress, shift");
    assert_eq!(config.application.log_level, "warn");
}

#[test]
fn test_invalid_pipeline_override_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("DEID_PIPELINE", "shift,suppress");

    let file = write_config("[deid]\nrules_path = \"rules.json\"\n");
    let result = load_config(file.path());
    cleanup_env_vars();

    assert!(result.is_err());
}

#[test]
fn test_validation_errors() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let cases = [
        // shift before suppress
        "[deid]\nrules_path = \"r.json\"\npipeline = [\"shift\", \"suppress\"]\n",
        // unknown dialect
        "[deid]\nrules_path = \"r.json\"\ndialect = \"oracle\"\n",
        // duplicate table
        "[deid]\nrules_path = \"r.json\"\n[[tables]]\nname = \"a\"\ninfo_path = \"a.json\"\ncolumns = [\"x\"]\n[[tables]]\nname = \"a\"\ninfo_path = \"b.json\"\ncolumns = [\"y\"]\n",
        // table without columns
        "[deid]\nrules_path = \"r.json\"\n[[tables]]\nname = \"a\"\ninfo_path = \"a.json\"\ncolumns = []\n",
        // bad log level
        "[application]\nlog_level = \"loud\"\n[deid]\nrules_path = \"r.json\"\n",
    ];

    for contents in cases {
        let file = write_config(contents);
        assert!(load_config(file.path()).is_err(), "accepted:\n{contents}");
    }
}

#[test]
fn test_missing_file() {
    let result = load_config("/nonexistent/deid.toml");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}
