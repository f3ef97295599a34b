//! Diagnostic command to check the SDK setup.

use configurator_client::HttpTransport;
use configurator_core::config::LifetimeMode;
use configurator_core::Config;

pub fn run() -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    let config_dir = Config::config_dir();
    println!("Config directory: {:?}", config_dir);
    if config_dir.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (defaults and environment are used)");
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            println!("\n  ✗ {}", e);
            println!("\nDiagnostics complete.");
            return Ok(());
        }
    };

    println!("\nEngine: {}", config.engine.base_url);
    for line in checks(&config) {
        println!("{}", line);
    }

    println!("\nDiagnostics complete.");
    Ok(())
}

/// Human-readable check results for a loaded configuration.
fn checks(config: &Config) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("\nValidation:".to_string());
    let result = config.validate();
    if result.is_ok() && result.warnings().is_empty() {
        lines.push("  ✓ Configuration is valid".to_string());
    }
    for issue in result.errors() {
        lines.push(format!("  ✗ {}: {}", issue.field, issue.message));
    }
    for issue in result.warnings() {
        lines.push(format!("  ! {}: {}", issue.field, issue.message));
    }

    lines.push("\nSession lifetime:".to_string());
    match config.lifetime.mode {
        LifetimeMode::ApiKey => {
            lines.push("  Mode: api_key".to_string());
            let env_var = config
                .engine
                .api_key_env
                .as_deref()
                .unwrap_or("CONFIGURATOR_API_KEY");
            if config.engine.resolve_api_key().is_some() {
                lines.push("  ✓ API key is available".to_string());
            } else {
                lines.push(format!("  ✗ API key is not set (engine.api_key or {})", env_var));
            }
        }
        LifetimeMode::Delegated => {
            lines.push("  Mode: delegated".to_string());
            for (name, url) in [
                ("create", &config.lifetime.create_session_url),
                ("close", &config.lifetime.close_session_url),
            ] {
                match url {
                    Some(url) => lines.push(format!("  ✓ {} endpoint: {}", name, url)),
                    None => lines.push(format!("  ✗ {} endpoint is not set", name)),
                }
            }
        }
    }

    lines.push("\nTransport:".to_string());
    match HttpTransport::from_config(config) {
        Ok(transport) => lines.push(format!(
            "  ✓ Ready ({} lifetime, {}s timeout)",
            transport.lifetime_name(),
            config.engine.timeout_secs
        )),
        Err(e) => lines.push(format!("  ✗ {}", e)),
    }

    lines
}
