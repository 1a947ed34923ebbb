// Printer Rules (extension -> printer override)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extensions that get an empty rule out of the box
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".xlsm", ".ppt", ".pptx",
];

/// A single rule. An empty printer means "use the default printer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub printer: String,
}

impl Rule {
    pub fn new(printer: impl Into<String>) -> Self {
        Self {
            printer: printer.into(),
        }
    }
}

/// Rule mapping keyed by lowercase extension (".pdf")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Rule>", into = "BTreeMap<String, Rule>")]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn get(&self, extension: &str) -> Option<&Rule> {
        self.rules.get(&normalize_extension(extension))
    }

    pub fn set_rule(&mut self, extension: &str, printer: impl Into<String>) {
        self.rules
            .insert(normalize_extension(extension), Rule::new(printer));
    }

    pub fn remove_rule(&mut self, extension: &str) -> Option<Rule> {
        self.rules.remove(&normalize_extension(extension))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let rules = SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| (ext.to_string(), Rule::default()))
            .collect();
        Self { rules }
    }
}

impl From<BTreeMap<String, Rule>> for RuleSet {
    fn from(map: BTreeMap<String, Rule>) -> Self {
        let rules = map
            .into_iter()
            .map(|(ext, rule)| (normalize_extension(&ext), rule))
            .collect();
        Self { rules }
    }
}

impl From<RuleSet> for BTreeMap<String, Rule> {
    fn from(set: RuleSet) -> Self {
        set.rules
    }
}

/// "PDF" / "pdf" / ".PDF" -> ".pdf"
pub fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}
