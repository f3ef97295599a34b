//! Configuration management commands.

use configurator_core::Config;

use crate::ConfigAction;

const MASK: &str = "********";

pub fn handle(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", render_masked(&config)?);
        }
        ConfigAction::Path => {
            println!(
                "User config:    {}",
                Config::config_dir().join("config.toml").display()
            );
            println!("Project config: .configurator/config.toml");
            println!("Local config:   .configurator/config.local.toml");
            println!("Environment:    CONFIGURATOR_* (nested keys split on __)");
        }
    }
    Ok(())
}

/// TOML rendering with the API key hidden.
fn render_masked(config: &Config) -> anyhow::Result<String> {
    let mut config = config.clone();
    if config.engine.api_key.is_some() {
        config.engine.api_key = Some(MASK.to_string());
    }
    Ok(config.to_toml()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_masked() {
        let mut config = Config::default();
        config.engine.api_key = Some("secret-key".to_string());

        let rendered = render_masked(&config).unwrap();
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains(MASK));
        assert!(rendered.contains("[engine]"));
    }

    #[test]
    fn test_missing_api_key_stays_missing() {
        let rendered = render_masked(&Config::default()).unwrap();
        assert!(!rendered.contains(MASK));
    }
}
