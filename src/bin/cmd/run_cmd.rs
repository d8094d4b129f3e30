use clap::{value_parser, Arg, ArgMatches, Command};
use scriptgate::{Error, Gate, Result, Settings};

use super::CmdExit;

pub fn command() -> Command {
    Command::new("run")
        .about("Gate a submission: analyze, then execute if allowed")
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
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Execution timeout in seconds (clamped to the configured cap)")
                .value_parser(value_parser!(u64)),
        )
}

pub fn run(matches: &ArgMatches, settings: &Settings) -> Result<CmdExit> {
    let source = super::read_source(matches)?;
    let timeout = matches.get_one::<u64>("timeout").copied();

    let gate = Gate::from_settings(settings)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Sandbox(format!("could not start runtime: {e}")))?;
    let outcome = runtime.block_on(gate.submit(&source, timeout))?;

    Ok(CmdExit {
        code: outcome.exit_code,
        message: Some(serde_json::to_string_pretty(&outcome)?),
    })
}
