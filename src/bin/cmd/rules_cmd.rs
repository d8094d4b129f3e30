use std::fmt::Write;

use clap::{Arg, ArgMatches, Command};
use console::style;
use scriptgate::{Result, Settings, Severity};

use super::CmdExit;

pub fn command() -> Command {
    Command::new("rules")
        .about("List the active pattern rules")
        .arg(
            Arg::new("group")
                .short('g')
                .long("group")
                .help("Filter rules by group (injection, network, ...)"),
        )
}

pub fn run(matches: &ArgMatches, settings: &Settings) -> Result<CmdExit> {
    let group_filter = matches.get_one::<String>("group");
    let rules = settings.active_rules()?;

    let mut out = String::new();
    let mut shown = 0;
    for rule in &rules {
        if let Some(group) = group_filter {
            if &rule.from != group {
                continue;
            }
        }
        shown += 1;
        let severity = match rule.severity {
            Severity::High => style(rule.severity).red().bold(),
            Severity::Medium => style(rule.severity).yellow(),
            Severity::Low => style(rule.severity).dim(),
        };
        let _ = writeln!(
            out,
            "{:<30} {:<8} {}",
            style(&rule.id).bold(),
            severity,
            rule.description
        );
    }
    let _ = writeln!(out, "\n{shown} of {} rules shown", rules.len());

    Ok(CmdExit {
        code: exitcode::OK,
        message: Some(out),
    })
}
