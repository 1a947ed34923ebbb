// Print Job Domain Model

use crate::domain::error::DomainError;
use crate::domain::failure::FailureCategory;
use crate::domain::settings::PrintSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Job ID (UUID v4 in production)
pub type JobId = String;

/// Document family, derived once from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Pdf,
    Word,
    Excel,
    Ppt,
    Unknown,
}

impl FileType {
    /// Detect the file type from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        match extension_of(path).as_str() {
            ".pdf" => FileType::Pdf,
            ".doc" | ".docx" => FileType::Word,
            ".xls" | ".xlsx" | ".xlsm" => FileType::Excel,
            ".ppt" | ".pptx" => FileType::Ppt,
            _ => FileType::Unknown,
        }
    }

    pub fn is_supported(self) -> bool {
        self != FileType::Unknown
    }

    pub fn label(self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Word => "Word",
            FileType::Excel => "Excel",
            FileType::Ppt => "PowerPoint",
            FileType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Duplex (two-sided) printing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplexMode {
    // Aliases accept the labels older settings files were written with
    #[default]
    #[serde(alias = "Off")]
    Off,
    #[serde(alias = "Long Edge")]
    LongEdge,
    #[serde(alias = "Short Edge")]
    ShortEdge,
}

impl DuplexMode {
    pub fn label(self) -> &'static str {
        match self {
            DuplexMode::Off => "Off",
            DuplexMode::LongEdge => "Long edge",
            DuplexMode::ShortEdge => "Short edge",
        }
    }
}

impl std::fmt::Display for DuplexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplexMode::Off => write!(f, "off"),
            DuplexMode::LongEdge => write!(f, "long-edge"),
            DuplexMode::ShortEdge => write!(f, "short-edge"),
        }
    }
}

impl FromStr for DuplexMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "off" | "none" | "simplex" => Ok(DuplexMode::Off),
            "long-edge" | "long" => Ok(DuplexMode::LongEdge),
            "short-edge" | "short" => Ok(DuplexMode::ShortEdge),
            _ => Err(DomainError::InvalidDuplex(s.to_string())),
        }
    }
}

/// Job Status
///
/// WAITING -> PRINTING -> {SUCCESS, FAILED}, WAITING -> CANCELLED,
/// and any state back to WAITING through an explicit reset.
/// SKIPPED is never produced by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Waiting,
    Printing,
    Success,
    Failed,
    Cancelled,
    Skipped,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Waiting => "Waiting",
            JobStatus::Printing => "Printing",
            JobStatus::Success => "Success",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Skipped => "Skipped",
        }
    }

    /// Whether `next` is a transition the state machine expects.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (_, Waiting) => true,
            (Waiting, Printing) | (Waiting, Cancelled) | (Waiting, Skipped) => true,
            (Printing, Success) | (Printing, Failed) => true,
            // A retried run starts from a status that was not reset yet
            (Failed, Printing) | (Cancelled, Printing) | (Success, Printing) => true,
            (Failed, Cancelled) | (Cancelled, Cancelled) | (Success, Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Waiting => write!(f, "WAITING"),
            JobStatus::Printing => write!(f, "PRINTING"),
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Cancelled => write!(f, "CANCELLED"),
            JobStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// One document queued for printing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub file_path: PathBuf,
    pub file_type: FileType,

    // Output options
    pub printer_name: String, // empty = resolve automatically
    pub copies: u32,
    pub duplex: DuplexMode,
    pub paper_size: String, // empty = printer default
    pub manual_printer: bool,
    pub enabled: bool,

    // Execution state
    pub status: JobStatus,
    pub message: String,
    pub summary: Option<FailureCategory>,

    // Excel only
    pub excel_sheets: Vec<String>, // empty = all sheets
    pub excel_auto_orientation: bool,
}

impl PrintJob {
    /// Create a new job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `file_path` - Normalized absolute path of the document
    /// * `printer_name` - Printer resolved for this file (empty = automatic)
    /// * `settings` - Current defaults for copies, duplex and paper size
    pub fn new(
        id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        printer_name: impl Into<String>,
        settings: &PrintSettings,
    ) -> Self {
        let file_path = file_path.into();
        let file_type = FileType::from_path(&file_path);
        Self {
            id: id.into(),
            file_path,
            file_type,
            printer_name: printer_name.into(),
            copies: settings.copies.max(1),
            duplex: settings.duplex,
            paper_size: settings.paper_size.clone(),
            manual_printer: false,
            enabled: true,
            status: JobStatus::Waiting,
            message: String::new(),
            summary: None,
            excel_sheets: Vec::new(),
            excel_auto_orientation: false,
        }
    }

    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercase extension including the leading dot (".pdf")
    pub fn extension(&self) -> String {
        extension_of(&self.file_path)
    }

    pub fn display_printer(&self) -> &str {
        if self.printer_name.is_empty() {
            "Auto"
        } else {
            &self.printer_name
        }
    }

    /// Classification label shown next to the file type
    pub fn auto_label(&self) -> &'static str {
        match self.extension().as_str() {
            ".pdf" => "PDF document",
            ".doc" | ".docx" => "Word document",
            ".xls" | ".xlsx" | ".xlsm" => "Excel workbook",
            ".ppt" | ".pptx" => "PowerPoint deck",
            _ => "Unknown",
        }
    }

    pub fn display_sheets(&self) -> String {
        if self.file_type != FileType::Excel {
            return String::new();
        }
        if self.excel_sheets.is_empty() {
            return "All sheets".to_string();
        }
        let joined = self.excel_sheets.join(", ");
        if joined.chars().count() <= 20 {
            joined
        } else {
            let head: String = joined.chars().take(17).collect();
            format!("{}...", head)
        }
    }

    /// Clear status, message and summary (retry / reset)
    pub fn reset_status(&mut self) {
        self.status = JobStatus::Waiting;
        self.message.clear();
        self.summary = None;
    }
}

/// Lowercase extension with leading dot, or empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
