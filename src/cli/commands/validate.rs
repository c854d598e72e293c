//! Validate config command implementation
//!
//! This module implements the `validate-config` command: it checks the
//! configuration file, loads the rules file, and resolves every descriptor of
//! every configured table against the rule store without compiling anything.
//! Shift and compute templates are also checked for placeholders that
//! compilation would leave unbound.

use crate::cli::commands::compile::config_dir;
use crate::config::load_config;
use crate::core::compile::{resolve_path, TableCompiler};
use crate::domain::Result;
use crate::rules::{descriptor, RuleFamily, RuleStore, TableInfo};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let base_dir = config_dir(config_path);
        let compiler = match TableCompiler::new(&config, &base_dir) {
            Ok(c) => {
                println!("✅ Rules file loaded ({} rules)", c.store().len());
                for family in RuleFamily::ALL {
                    let ids = c.store().rule_ids(family);
                    if !ids.is_empty() {
                        println!("   {family}: {}", ids.join(", "));
                    }
                }
                c
            }
            Err(e) => {
                println!("❌ Failed to load rules file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let mut failures = 0usize;
        for table in &config.tables {
            let info_path = resolve_path(&base_dir, &table.info_path);
            let result = TableInfo::from_file(&info_path)
                .and_then(|info| unbound_in_table(compiler.store(), &info));

            match result {
                Ok(unbound) if unbound.is_empty() => println!("  ✅ {}", table.name),
                Ok(unbound) => {
                    failures += 1;
                    println!("  ❌ {}: unbound placeholders {}", table.name, unbound.join(", "));
                }
                Err(e) => {
                    failures += 1;
                    println!("  ❌ {}: {e}", table.name);
                }
            }
        }

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dialect: {}", config.deid.dialect);
        println!("  Pipeline: {}", config.deid.pipeline.describe());
        println!("  Rules: {}", config.deid.rules_path);
        println!("  Output Directory: {}", config.output.directory);
        println!(
            "  Manifest: {}",
            if config.output.manifest {
                config.output.manifest_path.as_str()
            } else {
                "disabled"
            }
        );
        println!("  Tables: {}", config.tables.len());
        println!();

        if failures == 0 {
            println!("✅ Configuration is valid");
            Ok(0)
        } else {
            println!("❌ {failures} table specification(s) failed validation");
            Ok(2)
        }
    }
}

/// Resolve every descriptor of a table; lists `<label> :<name>` per unbound placeholder
fn unbound_in_table(store: &RuleStore, info: &TableInfo) -> Result<Vec<String>> {
    let mut unbound = Vec::new();
    for family in info.families() {
        let descriptors = info.descriptors(family).unwrap_or_default();
        let call = descriptor::resolve(store, family, descriptors)?;
        for args in &call.args {
            for name in descriptor::unbound_placeholders(family, args) {
                unbound.push(format!("{} :{name}", args.label));
            }
        }
    }
    Ok(unbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_missing_config() {
        let args = ValidateArgs {};
        assert_eq!(args.execute("does-not-exist.toml").unwrap(), 2);
    }

    #[test]
    fn test_validate_reports_bad_reference() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("deid.toml"),
            r#"
[deid]
rules_path = "rules.json"

[[tables]]
name = "person"
info_path = "person.json"
columns = ["person_id", "race"]
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("rules.json"), r#"{"generalize": {}}"#).unwrap();
        std::fs::write(
            dir.path().join("person.json"),
            r#"{"generalize": [{"rules": "@race", "fields": ["race"], "into": "Other"}]}"#,
        )
        .unwrap();

        let config_path = dir.path().join("deid.toml");
        let code = ValidateArgs {}
            .execute(config_path.to_str().unwrap())
            .unwrap();
        assert_eq!(code, 2);
    }

    fn compute_workspace(template: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("deid.toml"),
            r#"
[deid]
rules_path = "rules.json"

[[tables]]
name = "person"
info_path = "person.json"
columns = ["person_id", "birth_datetime"]
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("rules.json"),
            serde_json::json!({"compute": {"year": [{"apply": template}]}}).to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("person.json"),
            r#"{"compute": [{"rules": "@compute.year", "fields": ["year_of_birth"], "value_field": "birth_datetime"}]}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_validate_accepts_bound_template() {
        let dir = compute_workspace("EXTRACT(YEAR FROM :value_field)");
        let config_path = dir.path().join("deid.toml");
        let code = ValidateArgs {}
            .execute(config_path.to_str().unwrap())
            .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_validate_reports_unbound_placeholder() {
        let dir = compute_workspace("EXTRACT(YEAR FROM :value_field) + :offset");
        let config_path = dir.path().join("deid.toml");
        let code = ValidateArgs {}
            .execute(config_path.to_str().unwrap())
            .unwrap();
        assert_eq!(code, 2);

        let info = TableInfo::from_file(dir.path().join("person.json")).unwrap();
        let store = RuleStore::from_file(
            crate::rules::Pipeline::default(),
            dir.path().join("rules.json"),
        )
        .unwrap();
        assert_eq!(
            unbound_in_table(&store, &info).unwrap(),
            vec!["compute.year :offset".to_string()]
        );
    }
}
