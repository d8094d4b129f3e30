//! Static security analysis of submitted source text.
//!
//! The analyzer never evaluates the source. It tests every catalog rule
//! against every line and applies the blocking policy to what matched, so
//! its verdict is advisory: it cannot be tricked into running code, and by
//! the same token it cannot see through encoding or obfuscation.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{PatternRule, Severity};

/// Penalty added to the complexity score per matched violation.
const VIOLATION_WEIGHT: usize = 10;
/// Weight of a function definition in the complexity score.
const FUNCTION_WEIGHT: usize = 5;
/// Weight of a class definition in the complexity score.
const CLASS_WEIGHT: usize = 3;
/// Upper bound of the complexity score.
const MAX_COMPLEXITY: usize = 100;

fn function_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bfunction\b|=>").expect("valid construct regex"))
}

fn class_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bclass\s+[A-Za-z_$]").expect("valid construct regex"))
}

/// One rule match on one source line.
///
/// Created per (line, matching rule) pair and never mutated afterwards;
/// a line matching several rules produces one violation per rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityViolation {
    /// 1-based line number the rule matched on.
    pub line_number: usize,
    /// Id of the matched rule.
    pub rule_id: String,
    pub description: String,
    pub severity: Severity,
}

/// The analyzer's verdict for one candidate script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub allowed: bool,
    /// Violations in document order: by line, then by rule catalog order.
    pub violations: Vec<SecurityViolation>,
    /// Bounded heuristic in `[0, 100]`.
    pub complexity_score: u8,
}

/// The allow/block policy applied to a finished scan.
#[derive(Debug, Clone)]
pub struct BlockPolicy {
    /// Submissions with more than this many violations are blocked even if
    /// no single violation is at a blocking severity.
    pub violation_threshold: usize,
    /// Any violation at one of these severities blocks the submission.
    pub blocking_severities: Vec<Severity>,
}

impl Default for BlockPolicy {
    fn default() -> Self {
        Self {
            violation_threshold: 5,
            blocking_severities: vec![Severity::High],
        }
    }
}

/// Scans source text against a pattern catalog and renders a verdict.
///
/// The analyzer holds shared read-only state only; `analyze` is a pure
/// function of its input and can be called concurrently from any number of
/// requests.
#[derive(Debug, Clone)]
pub struct Analyzer {
    rules: Arc<Vec<PatternRule>>,
    policy: BlockPolicy,
}

impl Analyzer {
    #[must_use]
    pub fn new(rules: Vec<PatternRule>, policy: BlockPolicy) -> Self {
        Self {
            rules: Arc::new(rules),
            policy,
        }
    }

    /// Build an analyzer over the built-in catalog with the default policy.
    ///
    /// # Errors
    /// When the built-in catalog cannot be loaded.
    pub fn with_builtin_rules() -> crate::Result<Self> {
        Ok(Self::new(crate::catalog::get_all()?, BlockPolicy::default()))
    }

    #[must_use]
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Scan `source` and produce a [`SecurityReport`].
    ///
    /// Single pass over the lines; every rule is tested against every line,
    /// so rule ordering never changes which violations are found, only the
    /// order they are reported in. Empty source yields an allowed report
    /// with a zero score.
    #[must_use]
    pub fn analyze(&self, source: &str) -> SecurityReport {
        let mut violations = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            for rule in self.rules.iter() {
                if rule.test.is_match(line) {
                    debug!(rule = %rule.id, line = idx + 1, "pattern matched");
                    violations.push(SecurityViolation {
                        line_number: idx + 1,
                        rule_id: rule.id.clone(),
                        description: rule.description.clone(),
                        severity: rule.severity,
                    });
                }
            }
        }

        let complexity_score = complexity_score(source, violations.len());
        let allowed = self.is_allowed(&violations);

        SecurityReport {
            allowed,
            violations,
            complexity_score,
        }
    }

    fn is_allowed(&self, violations: &[SecurityViolation]) -> bool {
        if violations
            .iter()
            .any(|v| self.policy.blocking_severities.contains(&v.severity))
        {
            return false;
        }
        violations.len() <= self.policy.violation_threshold
    }
}

/// Bounded complexity heuristic: 10 per violation, plus lines/10, plus 5 per
/// function definition and 3 per class definition, clamped to `[0, 100]`.
fn complexity_score(source: &str, violation_count: usize) -> u8 {
    let lines = source.lines().count();
    let functions = function_def_regex().find_iter(source).count();
    let classes = class_def_regex().find_iter(source).count();

    let raw = violation_count * VIOLATION_WEIGHT
        + lines / 10
        + functions * FUNCTION_WEIGHT
        + classes * CLASS_WEIGHT;

    u8::try_from(raw.min(MAX_COMPLEXITY)).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod test_analyzer {
    use super::*;

    fn analyzer() -> Analyzer {
        Analyzer::with_builtin_rules().unwrap()
    }

    #[test]
    fn empty_source_is_allowed_with_zero_score() {
        let report = analyzer().analyze("");
        assert!(report.allowed);
        assert!(report.violations.is_empty());
        assert_eq!(report.complexity_score, 0);
    }

    #[test]
    fn line_matching_multiple_rules_produces_one_violation_per_rule() {
        // eval() and fetch() on the same line
        let report = analyzer().analyze("eval(fetch('http://x'))");
        let on_line_one: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.line_number == 1)
            .map(|v| v.rule_id.as_str())
            .collect();
        assert!(on_line_one.contains(&"injection:eval_call"));
        assert!(on_line_one.contains(&"network:fetch_call"));
    }

    #[test]
    fn violations_are_in_document_order() {
        let source = "fetch('http://x')\neval('1')";
        let report = analyzer().analyze(source);
        let lines: Vec<usize> = report.violations.iter().map(|v| v.line_number).collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn complexity_counts_functions_and_classes() {
        // 2 lines => 0 length term, one arrow fn (5) and one class (3)
        let source = "const f = (a) => a + 1;\nclass Point {}";
        let report = analyzer().analyze(source);
        assert!(report.allowed);
        assert_eq!(report.complexity_score, 8);
    }

    #[test]
    fn complexity_is_clamped_to_100() {
        let source = "eval('x')\n".repeat(30);
        let report = analyzer().analyze(&source);
        assert_eq!(report.complexity_score, 100);
    }

    #[test]
    fn threshold_blocks_only_above_limit() {
        let policy = BlockPolicy {
            violation_threshold: 2,
            blocking_severities: vec![Severity::High],
        };
        let rules = crate::catalog::get_all().unwrap();
        let analyzer = Analyzer::new(rules, policy);

        // two medium violations: at the threshold, still allowed
        let at_limit = "require('left-pad')\ndocument.write('<b>')";
        assert!(analyzer.analyze(at_limit).allowed);

        // three medium violations: above the threshold, blocked
        let above_limit = "require('left-pad')\ndocument.write('<b>')\nnew WebSocket('ws://x')";
        assert!(!analyzer.analyze(above_limit).allowed);
    }

    #[test]
    fn custom_catalog_is_honored() {
        let rules: Vec<PatternRule> = serde_yaml::from_str(
            r###"
- id: test:forbidden_word
  test: forbidden
  description: "test rule"
  from: test
  severity: high
"###,
        )
        .unwrap();
        let analyzer = Analyzer::new(rules, BlockPolicy::default());
        assert!(!analyzer.analyze("this is forbidden").allowed);
        assert!(analyzer.analyze("eval('ignored by this catalog')").allowed);
    }
}
