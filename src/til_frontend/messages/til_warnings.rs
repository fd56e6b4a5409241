use crate::til_frontend::til_errors::TilLocation;
use saying::say;

#[derive(Clone, Debug)]
pub struct TilWarning {
    pub msg: String,
    pub location: TilLocation,
    pub warning_kind: WarningKind,
}

impl TilWarning {
    pub fn new(msg: &str, location: TilLocation, warning_kind: WarningKind) -> TilWarning {
        TilWarning {
            msg: msg.to_owned(),
            location,
            warning_kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningKind {
    // An expression kind with no translation rule, replaced by a placeholder node
    UnsupportedExpression,

    // Procedure left out of the run by the driver's block limit
    SkippedProcedure,

    // An annotated call whose arguments don't fit the callee, emitted as a plain call
    ArityMismatch,
}

pub fn print_formatted_warning(w: &TilWarning) {
    say!(Yellow Bold "WARNING: ");
    match w.warning_kind {
        WarningKind::UnsupportedExpression => {
            say!("Unsupported expression '", w.msg, "'");
        }
        WarningKind::SkippedProcedure => {
            say!("Skipped procedure: ", w.msg);
        }
        WarningKind::ArityMismatch => {
            say!("Attribute not substituted: ", w.msg);
        }
    }

    if let Some(expr) = w.location.expr {
        say!(Dark Magenta "  at expression ", Bright {expr.to_string()});
    }
}
