//! Layered configuration
//!
//! Sources, lowest to highest priority:
//! 1. built-in defaults
//! 2. config file (`--config`, or `config.toml` in the platform config dir)
//! 3. `BATCHPRINT__*` environment variables (`BATCHPRINT__SETTINGS__COPIES=2`)
//! 4. command-line flags (applied by the caller)
//!
//! ```toml
//! log_dir = "~/.local/state/batchprint"
//!
//! [settings]
//! use_default_printer = true
//! copies = 1
//! duplex = "long-edge"
//! paper_size = "A4"
//! excel_orientation_mode = "ask"
//!
//! [rules]
//! pdf = "LaserA"
//! xlsx = "Plotter"
//!
//! [backends]
//! soffice_program = "/usr/bin/soffice"
//! office_timeout_secs = 900
//! ```

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use batchprint_core::domain::{PrintSettings, RuleSet};
use batchprint_infra_system::constants::{
    DEFAULT_LPSTAT_PROGRAM, DEFAULT_LP_PROGRAM, DEFAULT_OFFICE_TIMEOUT_SECS,
    DEFAULT_PDF_TIMEOUT_SECS, DEFAULT_SOFFICE_PROGRAM,
};

pub const ENV_PREFIX: &str = "BATCHPRINT";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: PrintSettings,
    /// Extension (with or without the dot) -> printer name
    pub rules: BTreeMap<String, String>,
    pub backends: BackendConfig,
    /// Directory for daily rolling log files; no file logging when unset
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub lp_program: String,
    pub lpstat_program: String,
    pub soffice_program: String,
    pub pdf_timeout_secs: u64,
    pub office_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            lp_program: DEFAULT_LP_PROGRAM.to_string(),
            lpstat_program: DEFAULT_LPSTAT_PROGRAM.to_string(),
            soffice_program: DEFAULT_SOFFICE_PROGRAM.to_string(),
            pdf_timeout_secs: DEFAULT_PDF_TIMEOUT_SECS,
            office_timeout_secs: DEFAULT_OFFICE_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load from `path` (must exist) or the default location (optional)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(expand(path)).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Rule table in core form. Config rules only override the built-in
    /// (empty) entries.
    pub fn rule_set(&self) -> RuleSet {
        let mut rules = RuleSet::default();
        for (extension, printer) in &self.rules {
            rules.set_rule(extension, printer.clone());
        }
        rules
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(|dir| expand(Path::new(dir)))
    }
}

/// `<config dir>/batchprint/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "batchprint").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Expand a leading `~`
pub fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
