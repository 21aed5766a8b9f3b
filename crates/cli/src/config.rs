use anyhow::{Context, Result};
use loansplit_core::{CompanyId, Preferences, UserId};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "loansplit.toml";

/// Contents of `loansplit.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub company_id: i64,
    pub user_id: i64,
    /// Used until the user saves preferences of their own.
    pub preferences: Preferences,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            company_id: 1,
            user_id: 1,
            preferences: Preferences::default(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    pub fn company(&self) -> CompanyId {
        CompanyId(self.company_id)
    }

    pub fn user(&self) -> UserId {
        UserId(self.user_id)
    }
}

pub struct Paths {
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
}

impl Paths {
    pub fn resolve(explicit_config: Option<&Path>) -> Result<Self> {
        let project_dirs = directories::ProjectDirs::from("com", "loansplit", "LoanSplit")
            .context("Failed to get app directory")?;
        let config_file = match explicit_config {
            Some(path) => path.to_path_buf(),
            None => project_dirs.config_dir().join(CONFIG_FILE),
        };
        Ok(Self {
            config_file,
            data_dir: project_dirs.data_dir().to_path_buf(),
        })
    }
}

/// Reads the config file, falling back to defaults when it does not exist.
pub fn load(paths: &Paths) -> Result<Config> {
    if !paths.config_file.exists() {
        tracing::debug!(path = %paths.config_file.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&paths.config_file)
        .with_context(|| format!("Failed to read {}", paths.config_file.display()))?;
    Config::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loansplit_core::Money;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.company(), CompanyId(1));
        assert!(config.preferences.prompts_enabled);
    }

    #[test]
    fn parses_preferences_table() {
        let config = Config::from_toml(
            r#"
            database = "/tmp/books.db"
            user_id = 4

            [preferences]
            auto_split = true
            minimum_amount = "25.00"
            confidence_threshold = 0.8
            default_interest_expense_account = "6000"
            "#,
        )
        .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("/tmp/books.db")));
        assert_eq!(config.user(), UserId(4));
        assert_eq!(config.company(), CompanyId(1));
        assert!(config.preferences.auto_split);
        assert_eq!(config.preferences.minimum_amount, Money::from_cents(2500));
        assert_eq!(config.preferences.default_interest_expense_account.as_deref(), Some("6000"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::from_toml("company_id = \"one\"").is_err());
    }
}
