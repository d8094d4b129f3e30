mod cmd;

use std::process::exit;

use scriptgate::Config;
use tracing_subscriber::EnvFilter;

const DEFAULT_ERR_EXIT_CODE: i32 = 1;

fn main() {
    let app = cmd::default::command()
        .subcommand(cmd::analyze_cmd::command())
        .subcommand(cmd::run_cmd::command())
        .subcommand(cmd::rules_cmd::command());

    let matches = app.get_matches();

    let filter = matches.get_one::<String>("log").map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        |log| EnvFilter::new(log.clone()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // load configuration
    let config = match Config::new(matches.get_one::<String>("config").map(String::as_str)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Loading config error: {err}");
            exit(DEFAULT_ERR_EXIT_CODE)
        }
    };

    let settings = match config.get_settings_from_file() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not load settings from file: {e}");
            exit(DEFAULT_ERR_EXIT_CODE)
        }
    };

    let res = match matches.subcommand() {
        None => Err(scriptgate::Error::Config("command not found".to_string())),
        Some(tup) => match tup {
            ("analyze", subcommand_matches) => cmd::analyze_cmd::run(subcommand_matches, &settings),
            ("run", subcommand_matches) => cmd::run_cmd::run(subcommand_matches, &settings),
            ("rules", subcommand_matches) => cmd::rules_cmd::run(subcommand_matches, &settings),
            _ => unreachable!(),
        },
    };

    let exit_with = match res {
        Ok(cmd) => {
            if let Some(message) = cmd.message {
                println!("{message}");
            }
            cmd.code
        }
        Err(e) => {
            eprintln!("{e}");
            DEFAULT_ERR_EXIT_CODE
        }
    };
    exit(exit_with)
}
