//! Config validation CLI tool
//!
//! Validates a focusguard configuration file and, optionally, a JSON rule
//! batch, and reports any errors.

use focusguard_config::{ConfigError, parse_rule_batch};
use focusguard_util::{default_config_path, format_duration_millis};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config <config-file> [rules.json]");
            eprintln!();
            eprintln!("Validates a focusguard configuration file and an optional rule batch.");
            eprintln!();
            eprintln!("Default config location: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml rules.json");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    let config = match focusguard_config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        focusguard_config::CURRENT_CONFIG_VERSION
                    );
                }
                other => eprintln!("{}", other),
            }
            return ExitCode::from(1);
        }
    };

    println!("✓ Configuration is valid");
    println!();
    println!("Summary:");
    println!("  Config version: {}", focusguard_config::CURRENT_CONFIG_VERSION);
    println!("  Store: {}", config.service.store_path().display());
    println!(
        "  Bypass duration: {}",
        format_duration_millis(config.bypass.duration_millis)
    );
    println!("  Ignored resources: {}", config.enforcement.ignored_resources.len());

    let Some(rules_path) = args.get(2) else {
        return ExitCode::SUCCESS;
    };

    let content = match std::fs::read_to_string(rules_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: Failed to read rule batch {}: {}", rules_path, e);
            return ExitCode::from(1);
        }
    };

    match parse_rule_batch(&content) {
        Ok(rules) => {
            println!();
            println!("Rules ({}):", rules.len());
            for rule in &rules {
                let apps: Vec<&str> = rule.target_apps().iter().map(|r| r.as_str()).collect();
                println!(
                    "  - {} [{}, priority {}]: {}",
                    rule.id(),
                    rule.window().type_tag(),
                    rule.priority(),
                    apps.join(", ")
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Rule batch rejected: {}", e);
            ExitCode::from(1)
        }
    }
}
