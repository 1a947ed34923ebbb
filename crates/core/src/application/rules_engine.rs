//! Rules Engine - resolves the printer for a file from its extension

use crate::domain::job::extension_of;
use crate::domain::RuleSet;
use std::path::Path;

/// Extension -> printer resolution over a read-only rule mapping
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: RuleSet,
}

impl RulesEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Swap in a reloaded mapping
    pub fn replace_rules(&mut self, rules: RuleSet) {
        self.rules = rules;
    }

    /// Printer for `file_path`: a non-empty rule for its extension, otherwise
    /// `default_printer` unchanged. Missing or empty rules never fail.
    pub fn resolve_printer(&self, file_path: &Path, default_printer: &str) -> String {
        match self.rules.get(&extension_of(file_path)) {
            Some(rule) if !rule.printer.is_empty() => rule.printer.clone(),
            _ => default_printer.to_string(),
        }
    }
}
