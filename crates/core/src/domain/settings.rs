// Print Settings (explicit configuration value handed to the JobManager)

use crate::domain::error::DomainError;
use crate::domain::job::DuplexMode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How Excel page orientation is chosen at print time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Every sheet gets the orientation its used range suggests
    #[default]
    Auto,
    /// Analyze first, then apply only to the jobs the user picked
    Ask,
    /// Leave the workbook's own page setup alone
    None,
}

impl OrientationMode {
    /// Only `Ask` needs the pre-analysis pass before a run
    pub fn needs_analysis(self) -> bool {
        self == OrientationMode::Ask
    }

    /// Whether the Excel backend should rotate sheets for this job
    pub fn applies_to(self, excel_auto_orientation: bool) -> bool {
        match self {
            OrientationMode::Auto => true,
            OrientationMode::Ask => excel_auto_orientation,
            OrientationMode::None => false,
        }
    }
}

impl FromStr for OrientationMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(OrientationMode::Auto),
            "ask" => Ok(OrientationMode::Ask),
            "none" | "off" => Ok(OrientationMode::None),
            _ => Err(DomainError::InvalidOrientationMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for OrientationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrientationMode::Auto => write!(f, "auto"),
            OrientationMode::Ask => write!(f, "ask"),
            OrientationMode::None => write!(f, "none"),
        }
    }
}

/// User-level print defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintSettings {
    pub use_default_printer: bool,
    pub selected_printer: String,
    pub copies: u32,
    pub duplex: DuplexMode,
    pub paper_size: String,
    pub excel_orientation_mode: OrientationMode,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            use_default_printer: true,
            selected_printer: String::new(),
            copies: 1,
            duplex: DuplexMode::Off,
            paper_size: String::new(),
            excel_orientation_mode: OrientationMode::Auto,
        }
    }
}
