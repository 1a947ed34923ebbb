// Infrastructure constants (no magic values)

/// Grace period between SIGTERM and SIGKILL for a timed-out command
pub const GRACEFUL_KILL_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_LP_PROGRAM: &str = "lp";
pub const DEFAULT_LPSTAT_PROGRAM: &str = "lpstat";
pub const DEFAULT_SOFFICE_PROGRAM: &str = "soffice";

/// Wall-clock limit for one `lp` submission
pub const DEFAULT_PDF_TIMEOUT_SECS: u64 = 300;

/// Wall-clock limit for one LibreOffice conversion
pub const DEFAULT_OFFICE_TIMEOUT_SECS: u64 = 600;

/// Limit for quick queries such as `lpstat -d`
pub const QUERY_TIMEOUT_SECS: u64 = 10;

// Spreadsheet geometry (Excel defaults)
pub const DEFAULT_COLUMN_WIDTH_CHARS: f64 = 8.43;
pub const DEFAULT_ROW_HEIGHT_POINTS: f64 = 15.0;
/// Largest sheet a workbook may declare
pub const MAX_COLUMNS: u32 = 16_384;
pub const MAX_ROWS: u32 = 1_048_576;
/// One character of column width at the default font (7 px at 96 dpi)
pub const POINTS_PER_COLUMN_CHAR: f64 = 5.25;
