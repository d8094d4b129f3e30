//! The dangerous-construct pattern catalog.
//!
//! Rules live in YAML files under the `rules/` folder, grouped by concern
//! (injection, network, filesystem, ...). `build.rs` concatenates them into
//! a single document that is embedded into the binary and parsed once.

use std::sync::OnceLock;

use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use serde_regex;

use crate::error::Result;

/// String with all rules from the `rules` folder (prepared in build.rs) in
/// YAML format.
const ALL_RULES: &str = include_str!(concat!(env!("OUT_DIR"), "/all-rules.yaml"));

/// Severity level of a rule — determines how dangerous a matched construct is.
///
/// The natural ordering (`Low < Medium < High`) is used by the blocking
/// policy: any violation at a blocking severity rejects the submission
/// outright, regardless of how many rules matched in total.
#[derive(
    Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Describe single pattern rule
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PatternRule {
    pub id: String,
    /// test is a regex that we check each source line against.
    #[serde(with = "serde_regex")]
    pub test: Regex,
    /// description of what is risky about this construct
    pub description: String,
    /// the group of the rule, see files in the `rules` folder
    pub from: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Return a cached reference to all built-in pattern rules.
///
/// The YAML is parsed and regexes are compiled exactly once (on first call).
/// Subsequent calls return a reference to the cached static slice. A corrupt
/// built-in catalog is a build defect and fatal to the process.
pub(crate) fn all_rules_cached() -> &'static [PatternRule] {
    static RULES: OnceLock<Vec<PatternRule>> = OnceLock::new();
    RULES.get_or_init(|| serde_yaml::from_str(ALL_RULES).expect("built-in rules are valid YAML"))
}

/// Return all built-in scriptgate pattern rules, in catalog order.
///
/// # Errors
/// when has an error when parsing the rule str to [`PatternRule`] list
pub fn get_all() -> Result<Vec<PatternRule>> {
    Ok(all_rules_cached().to_vec())
}

/// Load custom rules from YAML files in a directory.
///
/// Custom rules are appended after the built-ins, so their violations sort
/// after built-in violations on the same line.
///
/// # Errors
/// When a file cannot be read or parsed.
pub fn load_custom_rules(rules_dir: &std::path::Path) -> Result<Vec<PatternRule>> {
    let mut custom_rules = Vec::new();
    if !rules_dir.is_dir() {
        return Ok(custom_rules);
    }
    let entries = std::fs::read_dir(rules_dir)?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            let content = std::fs::read_to_string(&path)?;
            let rules: Vec<PatternRule> = serde_yaml::from_str(&content)?;
            custom_rules.extend(rules);
        }
    }
    Ok(custom_rules)
}

/// Validate rule definitions and return a list of warning messages.
///
/// Currently checks:
/// - empty rule ids
/// - duplicate rule ids across the catalog
#[must_use]
pub fn validate_rules(rules: &[PatternRule]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for rule in rules {
        if rule.id.is_empty() {
            warnings.push(format!(
                "rule in group {:?} has an empty id ({})",
                rule.from, rule.description
            ));
            continue;
        }
        if !seen.insert(rule.id.as_str()) {
            warnings.push(format!("duplicate rule id {:?}", rule.id));
        }
    }
    warnings
}
