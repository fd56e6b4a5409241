//! Command-line entrypoint for the TIL translator.
//!
//! Parses a command and its flags, then hands the unit file to the driver.

use crate::projects::driver::translate_unit_file;
use crate::til_frontend::Flag;
use crate::til_frontend::display_messages::{print_formatted_error, print_til_messages};
use saying::say;
use std::env;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    // Translates every procedure and dumps the resulting graphs
    Build(PathBuf),

    // Translates every procedure but only reports errors and warnings
    Check(PathBuf),

    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    config: Option<PathBuf>,
    flags: Vec<Flag>,
}

pub fn start_cli() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help(false);
        return;
    }

    let command = match get_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return;
        }
    };

    let options = match get_flags(&args[2..]) {
        Ok(options) => options,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return;
        }
    };

    let (path, dump) = match command {
        Command::Help => {
            print_help(false);
            return;
        }
        Command::Build(path) => (path, true),
        Command::Check(path) => (path, false),
    };

    match translate_unit_file(&path, options.config.as_deref(), &options.flags, dump) {
        Ok(report) => {
            let show_warnings = !options.flags.contains(&Flag::DisableWarnings);
            print_til_messages(&report.messages, show_warnings);

            if report.messages.has_errors() {
                say!(Red "\nTranslation finished with errors");
            }
        }
        Err(e) => print_formatted_error(&e),
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") => Ok(Command::Help),

        Some("build") => match args.get(1) {
            Some(path) if !path.starts_with("--") => Ok(Command::Build(PathBuf::from(path))),
            _ => Err(String::from("Missing unit file for 'build'")),
        },

        Some("check") => match args.get(1) {
            Some(path) if !path.starts_with("--") => Ok(Command::Check(PathBuf::from(path))),
            _ => Err(String::from("Missing unit file for 'check'")),
        },

        Some(other) => Err(format!("Invalid command: '{other}'")),
        None => Err(String::from("No command given")),
    }
}

fn get_flags(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut index = 0usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --config"));
                };
                if path.starts_with("--") {
                    return Err(String::from("Missing value for --config"));
                }
                options.config = Some(PathBuf::from(path));
                index += 2;
                continue;
            }
            "--sequential" => options.flags.push(Flag::Sequential),
            "--no-dump" => options.flags.push(Flag::NoDump),
            "--hide-warnings" => options.flags.push(Flag::DisableWarnings),
            "--hide-timers" => options.flags.push(Flag::DisableTimers),
            _ if arg.starts_with("--") => {
                return Err(format!("Unknown flag: '{arg}'"));
            }
            _ => {}
        }
        index += 1;
    }

    Ok(options)
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "til - typed IR translation for CFG dumps");
        say!("Usage: ", Bold "<command> ", Italic "<unit.json> [flags]");
    }
    say!(Green Bold "\nCommands:");
    say!("  build <unit.json>  - Translates every procedure and dumps the SSA graphs");
    say!("  check <unit.json>  - Translates every procedure and only reports problems");
    say!("  help               - Shows this message");

    say!(Green Bold "\nFlags:");
    say!("  --config <path>    (default: til.toml next to the unit file)");
    say!("  --sequential");
    say!("  --no-dump");
    say!("  --hide-warnings");
    say!("  --hide-timers");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
