//! Manage the app configuration by creating, loading and modifying the
//! settings file.

use std::{fs, io::Write, path::PathBuf};

use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::{self, PatternRule, Severity},
    error::{Error, Result},
    sandbox::BackendKind,
};

const DEFAULT_SETTING_FILE_NAME: &str = "settings.yaml";

/// Severities that block a submission outright when no override is given.
pub const DEFAULT_BLOCKING_SEVERITIES: [Severity; 1] = [Severity::High];

/// describe configuration folder
#[derive(Debug)]
pub struct Config {
    /// Configuration folder path.
    pub root_folder: PathBuf,
    /// settings file.
    pub setting_file_path: PathBuf,
}

/// Describe the configuration yaml
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Cap on execution time; also the default when a caller omits the
    /// timeout.
    #[serde(default = "default_max_execution_time_secs")]
    pub max_execution_time_secs: u64,
    /// Submissions with more than this many violations are blocked.
    #[serde(default = "default_violation_threshold")]
    pub violation_threshold: usize,
    /// Severities that block regardless of the violation count.
    #[serde(default = "default_blocking_severities")]
    pub blocking_severities: Vec<Severity>,
    /// Which sandbox backend runs accepted submissions.
    #[serde(default)]
    pub backend: BackendKind,
    /// Interpreter command for the worker backend.
    #[serde(default = "default_runtime_command")]
    pub runtime_command: String,
    /// Captured output is cut at this many bytes.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Submissions larger than this are rejected before analysis.
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,
    /// Submissions with more lines than this are rejected before analysis.
    #[serde(default = "default_max_code_lines")]
    pub max_code_lines: usize,
    /// List of rule ids to exclude from the active catalog.
    #[serde(default)]
    pub ignores_rule_ids: Vec<String>,
    /// Extra YAML rule files appended after the built-in catalog.
    #[serde(default)]
    pub custom_rules_dir: Option<PathBuf>,
}

const fn default_max_execution_time_secs() -> u64 {
    30
}
const fn default_violation_threshold() -> usize {
    5
}
fn default_blocking_severities() -> Vec<Severity> {
    DEFAULT_BLOCKING_SEVERITIES.to_vec()
}
fn default_runtime_command() -> String {
    "node".to_string()
}
const fn default_max_output_bytes() -> usize {
    8192
}
const fn default_max_code_bytes() -> usize {
    10_000
}
const fn default_max_code_lines() -> usize {
    1_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_execution_time_secs: default_max_execution_time_secs(),
            violation_threshold: default_violation_threshold(),
            blocking_severities: default_blocking_severities(),
            backend: BackendKind::default(),
            runtime_command: default_runtime_command(),
            max_output_bytes: default_max_output_bytes(),
            max_code_bytes: default_max_code_bytes(),
            max_code_lines: default_max_code_lines(),
            ignores_rule_ids: Vec::new(),
            custom_rules_dir: None,
        }
    }
}

impl Config {
    /// Get application setting config.
    ///
    /// # Errors
    ///
    /// Will return `Err` error return on load/save config
    pub fn new(path: Option<&str>) -> Result<Self> {
        let package_name = env!("CARGO_PKG_NAME");

        let config_folder = match path {
            Some(p) => PathBuf::from(p),
            None => match dirs::config_dir() {
                Some(p) => p.join(package_name),
                None => return Err(Error::Config("could not get directory path".to_string())),
            },
        };

        let setting_config = Self {
            setting_file_path: config_folder.join(DEFAULT_SETTING_FILE_NAME),
            root_folder: config_folder,
        };

        setting_config.create_config_folder()?;
        setting_config.manage_setting_file()?;
        debug!(configuration = ?setting_config, "configuration settings loaded");
        Ok(setting_config)
    }

    /// Convert user settings yaml to struct.
    ///
    /// # Errors
    ///
    /// Will return `Err` has an error when loading the config file
    pub fn get_settings_from_file(&self) -> Result<Settings> {
        Ok(serde_yaml::from_str(&fs::read_to_string(
            &self.setting_file_path,
        )?)?)
    }

    /// Manage setting folder & file.
    /// * Create default config yaml file if not exists.
    ///
    /// # Errors
    ///
    /// Will return `Err` file could not created or loaded
    pub fn manage_setting_file(&self) -> Result<()> {
        if fs::metadata(&self.setting_file_path).is_err() {
            debug!(path = %self.setting_file_path.display(), "setting file not found");
            self.save_settings_file_from_struct(&Settings::default())?;
        }
        debug!(settings = ?self.get_settings_from_file()?, "setting file loaded");
        Ok(())
    }

    /// Reset user configuration to the defaults.
    ///
    /// # Errors
    ///
    /// Will return `Err` when the settings file could not be written
    pub fn reset_config(&self) -> Result<()> {
        self.save_settings_file_from_struct(&Settings::default())
    }

    /// Create config folder if not exists.
    fn create_config_folder(&self) -> Result<()> {
        if let Err(err) = fs::create_dir_all(&self.root_folder) {
            return Err(Error::Config(format!("could not create folder: {err}")));
        }
        debug!(path = %self.root_folder.display(), "configuration folder ready");
        Ok(())
    }

    /// Convert the given settings to YAML format and write the file.
    fn save_settings_file_from_struct(&self, settings: &Settings) -> Result<()> {
        let content = serde_yaml::to_string(settings)?;
        let mut file = fs::File::create(&self.setting_file_path)?;
        file.write_all(content.as_bytes())?;
        debug!(path = %self.setting_file_path.display(), settings = ?settings, "settings file created");
        Ok(())
    }
}

impl Settings {
    /// Materialize the effective pattern catalog: built-in rules plus any
    /// custom rule files, minus the ignore list.
    ///
    /// # Errors
    ///
    /// Will return `Err` when the catalog or a custom rule file cannot be
    /// loaded
    pub fn active_rules(&self) -> Result<Vec<PatternRule>> {
        let mut rules = catalog::get_all()?;
        if let Some(ref dir) = self.custom_rules_dir {
            rules.extend(catalog::load_custom_rules(dir)?);
        }
        Ok(rules
            .into_iter()
            .filter(|r| !self.ignores_rule_ids.contains(&r.id))
            .collect())
    }

    /// The block policy slice of the settings.
    #[must_use]
    pub fn block_policy(&self) -> crate::analyzer::BlockPolicy {
        crate::analyzer::BlockPolicy {
            violation_threshold: self.violation_threshold,
            blocking_severities: self.blocking_severities.clone(),
        }
    }
}

#[cfg(test)]
mod test_config {
    use std::path::Path;

    use super::*;

    fn initialize_config_folder(temp_dir: &Path) -> Config {
        Config::new(Some(&temp_dir.join("app").display().to_string()))
            .expect("Failed to create new config")
    }

    #[test]
    fn can_create_new_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = initialize_config_folder(temp_dir.path());
        assert!(config.root_folder.is_dir());
        assert!(config.setting_file_path.is_file());
    }

    #[test]
    fn default_settings_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = initialize_config_folder(temp_dir.path());

        let settings = config.get_settings_from_file().unwrap();
        assert_eq!(settings.max_execution_time_secs, 30);
        assert_eq!(settings.violation_threshold, 5);
        assert_eq!(settings.blocking_severities, vec![Severity::High]);
        assert_eq!(settings.backend, BackendKind::Worker);
        assert_eq!(settings.runtime_command, "node");
    }

    #[test]
    fn partial_settings_file_gets_defaults() {
        let settings: Settings = serde_yaml::from_str("violation_threshold: 3\n").unwrap();
        assert_eq!(settings.violation_threshold, 3);
        assert_eq!(settings.max_execution_time_secs, 30);
        assert_eq!(settings.backend, BackendKind::Worker);
    }

    #[test]
    fn backend_parses_lowercase() {
        let settings: Settings = serde_yaml::from_str("backend: isolate\n").unwrap();
        assert_eq!(settings.backend, BackendKind::Isolate);
    }

    #[test]
    fn active_rules_honors_ignore_list() {
        let settings = Settings {
            ignores_rule_ids: vec!["injection:eval_call".to_string()],
            ..Default::default()
        };
        let rules = settings.active_rules().unwrap();
        assert!(rules.iter().all(|r| r.id != "injection:eval_call"));
        assert!(rules.iter().any(|r| r.id == "network:fetch_call"));
    }

    #[test]
    fn active_rules_appends_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extra.yaml"),
            r###"
- id: custom:miner
  test: coinhive
  description: "Embedded miner"
  from: custom
  severity: high
"###,
        )
        .unwrap();
        let settings = Settings {
            custom_rules_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let rules = settings.active_rules().unwrap();
        // custom rules come after the built-ins
        assert_eq!(rules.last().unwrap().id, "custom:miner");
    }

    #[test]
    fn can_reset_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = initialize_config_folder(temp_dir.path());

        let mut settings = config.get_settings_from_file().unwrap();
        settings.violation_threshold = 1;
        config.save_settings_file_from_struct(&settings).unwrap();
        assert_eq!(
            config.get_settings_from_file().unwrap().violation_threshold,
            1
        );

        config.reset_config().unwrap();
        assert_eq!(
            config.get_settings_from_file().unwrap().violation_threshold,
            5
        );
    }
}
