use clap::{crate_version, Arg, Command};

pub fn command() -> Command {
    Command::new("scriptgate")
        .version(crate_version!())
        .about("Gate untrusted script submissions behind a security scan and an execution deadline")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Path to the configuration folder"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .help("Log filter, e.g. debug or scriptgate=trace (overrides RUST_LOG)"),
        )
}
