//! Tier 1: Pure logic tests — no I/O, no sandbox needed.
//!
//! These test the computational core: pattern matching against the built-in
//! catalog, the blocking policy, and the complexity heuristic.

use scriptgate::{Analyzer, Severity};

fn analyzer() -> Analyzer {
    Analyzer::with_builtin_rules().unwrap()
}

// ---------------------------------------------------------------------------
// High-severity constructs always block
// ---------------------------------------------------------------------------

#[test]
fn test_high_severity_constructs_block() {
    let cases = [
        "eval('1 + 1')",
        "EVAL('case folded')",
        "new Function('return 1')",
        "fetch('http://example.com')",
        "FETCH ('http://example.com')",
        "process.env.SECRET",
        "while(true) {}",
        "while ( TRUE ) {}",
        "for(;;) {}",
    ];
    for source in cases {
        let report = analyzer().analyze(source);
        assert!(!report.allowed, "expected block for {source:?}");
        assert!(
            report
                .violations
                .iter()
                .any(|v| v.severity == Severity::High),
            "expected a high-severity violation for {source:?}, got {:?}",
            report.violations
        );
    }
}

#[test]
fn test_empty_source_is_allowed() {
    let report = analyzer().analyze("");
    assert!(report.allowed);
    assert!(report.violations.is_empty());
    assert_eq!(report.complexity_score, 0);
}

#[test]
fn test_plain_script_is_allowed() {
    let report = analyzer().analyze("let x = 1; console.log(x);");
    assert!(report.allowed);
    assert!(
        report.violations.is_empty(),
        "unexpected violations: {:?}",
        report.violations
    );
}

// ---------------------------------------------------------------------------
// Violation-count threshold
// ---------------------------------------------------------------------------

const SIX_MEDIUM_LINES: &str = "setTimeout(tick, 100)
new WebSocket('ws://example')
axios.get(url)
require('left-pad')
document.write('<b>hi</b>')
el.innerHTML = markup";

#[test]
fn test_six_medium_violations_exceed_threshold() {
    let report = analyzer().analyze(SIX_MEDIUM_LINES);
    assert_eq!(report.violations.len(), 6, "{:?}", report.violations);
    assert!(report
        .violations
        .iter()
        .all(|v| v.severity == Severity::Medium));
    assert!(!report.allowed, "count over threshold must block");
}

#[test]
fn test_five_medium_violations_stay_allowed() {
    // drop the last line: five matches, at the threshold, still allowed
    let five: String = SIX_MEDIUM_LINES
        .lines()
        .take(5)
        .collect::<Vec<_>>()
        .join("\n");
    let report = analyzer().analyze(&five);
    assert_eq!(report.violations.len(), 5, "{:?}", report.violations);
    assert!(report.allowed);
}

// ---------------------------------------------------------------------------
// Report shape
// ---------------------------------------------------------------------------

#[test]
fn test_violations_carry_one_based_line_numbers() {
    let report = analyzer().analyze("let ok = 1;\neval('x')");
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].line_number, 2);
    assert_eq!(report.violations[0].rule_id, "injection:eval_call");
}

#[test]
fn test_line_matching_two_rules_reports_both() {
    let report = analyzer().analyze("eval(fetch('http://x'))");
    let ids: Vec<&str> = report
        .violations
        .iter()
        .map(|v| v.rule_id.as_str())
        .collect();
    assert!(ids.contains(&"injection:eval_call"), "{ids:?}");
    assert!(ids.contains(&"network:fetch_call"), "{ids:?}");
    assert!(report.violations.iter().all(|v| v.line_number == 1));
}

#[test]
fn test_analyze_is_idempotent_for_a_fixed_input() {
    let analyzer = analyzer();
    let source = "require('x')\neval('y')";
    assert_eq!(analyzer.analyze(source), analyzer.analyze(source));
}

#[test]
fn test_blocked_source_stays_blocked_with_more_high_lines() {
    let analyzer = analyzer();
    let base = "eval('x')";
    assert!(!analyzer.analyze(base).allowed);
    let appended = format!("{base}\nwhile(true) {{}}");
    assert!(!analyzer.analyze(&appended).allowed);
}

#[test]
fn test_complexity_reflects_violations_and_length() {
    // one violation (10) + 1 line (0) + no fn/class
    let report = analyzer().analyze("require('x')");
    assert_eq!(report.complexity_score, 10);
}
