use crate::til_frontend::til_errors::{ErrorType, TilError, TilMessages, error_type_to_str};
use crate::til_frontend::til_warnings::print_formatted_warning;
use saying::say;
use std::env;
use std::path::Path;

fn relative_display_path(path: &Path) -> String {
    match env::current_dir() {
        Ok(dir) => path
            .strip_prefix(&dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string(),
        Err(err) => {
            say!(Red "Failed to read the current directory while printing an error. ", err);
            path.to_string_lossy().to_string()
        }
    }
}

pub fn print_til_messages(messages: &TilMessages, show_warnings: bool) {
    for err in &messages.errors {
        print_formatted_error(err);
    }

    if !show_warnings {
        return;
    }

    for warning in &messages.warnings {
        print_formatted_warning(warning);
    }
}

pub fn print_formatted_error(e: &TilError) {
    if let Some(path) = &e.location.path {
        say!("\n(╯°□°)╯  ", Dark Magenta relative_display_path(path));
    }

    match e.error_type {
        ErrorType::File => {
            say!(Yellow "Can't find/read file or directory");
            say!(e.msg);
            return;
        }

        ErrorType::Config => {
            say!(Yellow "CONFIG FILE ISSUE - ");
            say!(Dark Yellow "Malformed til.toml, something doesn't make sense inside the config");
        }

        ErrorType::StructuralInconsistency => {
            say!(Yellow "TRAVERSAL ORDER BUG - ");
            say!(Dark Yellow "the CFG or its visit order broke the walker contract (not your code)");
        }

        ErrorType::WalkerInit | ErrorType::CallingContext | ErrorType::Input => {
            say!(Red error_type_to_str(&e.error_type));
        }
    }

    if let Some(procedure) = e.location.procedure {
        say!(Dark Magenta "Procedure ", Bright {procedure.to_string()});
    }
    if let Some(block) = e.location.block {
        say!(Dark Magenta "Block ", Bright {block.to_string()});
    }
    if let Some(expr) = e.location.expr {
        say!(Dark Magenta "Expression ", Bright {expr.to_string()});
    }

    say!(Red e.msg);

    for (key, value) in &e.metadata {
        say!("  ", Blue #key, ": ", value);
    }
}
