use clap::{Arg, ArgMatches, Command};
use scriptgate::{Analyzer, Result, Settings};

use super::CmdExit;

pub fn command() -> Command {
    Command::new("analyze")
        .about("Scan a submission and print the security report (nothing is executed)")
        .arg(
            Arg::new("code")
                .short('c')
                .long("code")
                .help("Submission source inline"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .help("Read the submission from a file")
                .conflicts_with("code"),
        )
}

pub fn run(matches: &ArgMatches, settings: &Settings) -> Result<CmdExit> {
    let source = super::read_source(matches)?;
    let analyzer = Analyzer::new(settings.active_rules()?, settings.block_policy());
    let report = analyzer.analyze(&source);

    Ok(CmdExit {
        code: if report.allowed { exitcode::OK } else { 1 },
        message: Some(serde_json::to_string_pretty(&report)?),
    })
}
