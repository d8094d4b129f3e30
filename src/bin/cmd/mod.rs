pub mod analyze_cmd;
pub mod default;
pub mod rules_cmd;
pub mod run_cmd;

use clap::ArgMatches;
use scriptgate::Result;

/// Exit payload of a subcommand: process exit code plus an optional message
/// printed before exiting.
pub struct CmdExit {
    pub code: i32,
    pub message: Option<String>,
}

/// Resolve the submission source: inline `--code`, a `--file` path, or
/// stdin when neither is given.
pub fn read_source(matches: &ArgMatches) -> Result<String> {
    if let Some(code) = matches.get_one::<String>("code") {
        return Ok(code.clone());
    }
    if let Some(path) = matches.get_one::<String>("file") {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
    Ok(buf)
}
