// Sort columns for the job list

use crate::domain::{DomainError, PrintJob};
use std::str::FromStr;

/// The eight sortable columns, in list-view order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Enabled,
    FileName,
    FilePath,
    FileType,
    AutoLabel,
    Sheets,
    Printer,
    Status,
}

/// Comparable key. A column always produces the same variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum SortKey {
    Flag(bool),
    Text(String),
}

impl SortColumn {
    pub const ALL: [SortColumn; 8] = [
        SortColumn::Enabled,
        SortColumn::FileName,
        SortColumn::FilePath,
        SortColumn::FileType,
        SortColumn::AutoLabel,
        SortColumn::Sheets,
        SortColumn::Printer,
        SortColumn::Status,
    ];

    /// Case-insensitive key for `job`
    pub(crate) fn key(self, job: &PrintJob) -> SortKey {
        let text = match self {
            SortColumn::Enabled => return SortKey::Flag(job.enabled),
            SortColumn::FileName => job.file_name(),
            SortColumn::FilePath => job.file_path.to_string_lossy().into_owned(),
            SortColumn::FileType => job.file_type.label().to_string(),
            SortColumn::AutoLabel => job.auto_label().to_string(),
            SortColumn::Sheets => job.display_sheets(),
            SortColumn::Printer => job.display_printer().to_string(),
            SortColumn::Status => job.status.label().to_string(),
        };
        SortKey::Text(text.to_lowercase())
    }

    pub fn name(self) -> &'static str {
        match self {
            SortColumn::Enabled => "enabled",
            SortColumn::FileName => "name",
            SortColumn::FilePath => "path",
            SortColumn::FileType => "type",
            SortColumn::AutoLabel => "label",
            SortColumn::Sheets => "sheets",
            SortColumn::Printer => "printer",
            SortColumn::Status => "status",
        }
    }
}

impl FromStr for SortColumn {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortColumn::ALL
            .into_iter()
            .find(|column| column.name() == wanted)
            .ok_or_else(|| DomainError::InvalidSortColumn(s.to_string()))
    }
}

impl std::fmt::Display for SortColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
