use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the config at `path`, falling back to defaults when the file is
/// missing or invalid.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> anyhow::Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("failed to parse config")?;
    Ok(AppConfig::from(tables))
}

pub fn serialize_config(config: &AppConfig) -> anyhow::Result<String> {
    let tables = ConfigTables::from(config);
    toml::to_string_pretty(&tables).context("failed to serialize config")
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = serialize_config(config)?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Saved config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use crate::language::{DEFAULT_WORD_PATTERN, RuleProvider};
    use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.language, "es");
    }

    #[test]
    fn reads_sections_and_clamps() {
        let config = parse_config(
            r#"
[reading]
page_size = 100000
language = "fr"

[narration]
rate = 9.0
pitch = -1.0

[logging]
log_level = "debug"

[languages.fr]
word_pattern = "\\p{L}+"
"#,
        )
        .unwrap();
        assert_eq!(config.page_size, MAX_PAGE_SIZE);
        assert_eq!(config.language, "fr");
        assert_eq!(config.target_language, "en");
        assert_eq!(config.rate, 4.0);
        assert_eq!(config.pitch, 0.0);
        assert_eq!(config.log_level, LogLevel::Debug);

        let fr = config.rules_for("fr").unwrap();
        assert_eq!(fr.word_pattern, r"\p{L}+");
        assert_eq!(fr.split_pattern, "");
        assert_eq!(
            config.rules_for("es").unwrap().word_pattern,
            DEFAULT_WORD_PATTERN
        );
        assert!(config.rules_for("xx").is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_config("[reading\npage_size = 3").is_err());
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = AppConfig {
            page_size: 40,
            voice: Some("es-ES".to_string()),
            ..AppConfig::default()
        };
        let text = serialize_config(&config).unwrap();
        assert!(text.contains("[reading]"));
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");
        assert_eq!(load_config(&path), AppConfig::default());

        let config = AppConfig {
            page_size: 30,
            ..AppConfig::default()
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).page_size, 30);
    }
}
