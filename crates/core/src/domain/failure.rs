// Failure Classification
//
// Maps raw backend error text to a short category for compact list views.
// Cosmetic only: nothing branches on the result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    RenderingDependencyMissing,
    OfficeAutomationDependencyMissing,
    FileNotFound,
    PrinterUnreachable,
    PermissionDenied,
    PrintFailed,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FailureCategory::RenderingDependencyMissing => "rendering dependency missing",
            FailureCategory::OfficeAutomationDependencyMissing => {
                "office automation dependency missing"
            }
            FailureCategory::FileNotFound => "file not found",
            FailureCategory::PrinterUnreachable => "cannot reach printer",
            FailureCategory::PermissionDenied => "insufficient permission",
            FailureCategory::PrintFailed => "print failed",
        };
        f.write_str(text)
    }
}

const RENDERING_LIBRARIES: &[&str] = &["pymupdf", "fitz", "pdfium", "ghostscript"];
const REQUIREMENT_PHRASES: &[&str] = &["required", "必要", "not installed"];
const OFFICE_AUTOMATION: &[&str] = &["pywin32", "win32com", "soffice", "libreoffice"];
const FILE_NOT_FOUND: &[&str] = &["file not found", "ファイルが見つかりません", "no such file"];
const PRINTER: &[&str] = &["printer", "プリンター"];
const PERMISSION: &[&str] = &["access is denied", "permission denied", "権限"];

type Predicate = fn(&str) -> bool;

/// Ordered (predicate, category) pairs. First match wins; order matters
/// because markers overlap (a rendering library message may also mention
/// a file or a printer).
const CLASSIFIERS: &[(Predicate, FailureCategory)] = &[
    (
        rendering_dependency_missing,
        FailureCategory::RenderingDependencyMissing,
    ),
    (
        office_automation_missing,
        FailureCategory::OfficeAutomationDependencyMissing,
    ),
    (file_not_found, FailureCategory::FileNotFound),
    (printer_problem, FailureCategory::PrinterUnreachable),
    (permission_problem, FailureCategory::PermissionDenied),
];

/// Classify a failure message (case-insensitive substring matching)
pub fn classify_failure(message: &str) -> FailureCategory {
    let text = message.to_lowercase();
    CLASSIFIERS
        .iter()
        .find(|(matches, _)| matches(&text))
        .map(|(_, category)| *category)
        .unwrap_or(FailureCategory::PrintFailed)
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

fn rendering_dependency_missing(text: &str) -> bool {
    contains_any(text, RENDERING_LIBRARIES) && contains_any(text, REQUIREMENT_PHRASES)
}

fn office_automation_missing(text: &str) -> bool {
    contains_any(text, OFFICE_AUTOMATION)
}

fn file_not_found(text: &str) -> bool {
    contains_any(text, FILE_NOT_FOUND)
}

fn printer_problem(text: &str) -> bool {
    contains_any(text, PRINTER)
}

fn permission_problem(text: &str) -> bool {
    contains_any(text, PERMISSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_is_permission() {
        assert_eq!(
            classify_failure("Access is denied"),
            FailureCategory::PermissionDenied
        );
    }

    #[test]
    fn test_pywin32_is_office_automation() {
        assert_eq!(
            classify_failure("Excel printing requires pywin32"),
            FailureCategory::OfficeAutomationDependencyMissing
        );
    }

    #[test]
    fn test_rendering_marker_needs_requirement_phrase() {
        assert_eq!(
            classify_failure("PyMuPDF is required for PDF printing"),
            FailureCategory::RenderingDependencyMissing
        );
        // Library named without a requirement phrase falls through
        assert_eq!(
            classify_failure("fitz crashed while rasterizing"),
            FailureCategory::PrintFailed
        );
    }

    #[test]
    fn test_order_wins_over_later_markers() {
        // Mentions both a rendering library requirement and a printer
        assert_eq!(
            classify_failure("pdfium required before the printer can be used"),
            FailureCategory::RenderingDependencyMissing
        );
        // Mentions both a missing file and a printer
        assert_eq!(
            classify_failure("file not found while contacting printer"),
            FailureCategory::FileNotFound
        );
    }

    #[test]
    fn test_other_categories() {
        assert_eq!(
            classify_failure("lp: The printer or class does not exist."),
            FailureCategory::PrinterUnreachable
        );
        assert_eq!(
            classify_failure("open /tmp/x.pdf: Permission denied"),
            FailureCategory::PermissionDenied
        );
        assert_eq!(
            classify_failure("ファイルが見つかりません。"),
            FailureCategory::FileNotFound
        );
        assert_eq!(classify_failure(""), FailureCategory::PrintFailed);
        assert_eq!(FailureCategory::PrintFailed.to_string(), "print failed");
    }
}
