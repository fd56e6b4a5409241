use crate::til_frontend::source::source_nodes::{CfgBlockId, DeclId, ExprId};
use crate::til_frontend::til_warnings::TilWarning;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// The final set of errors and warnings from one translation run
#[derive(Debug, Default)]
pub struct TilMessages {
    pub errors: Vec<TilError>,
    pub warnings: Vec<TilWarning>,
}

impl TilMessages {
    pub fn new() -> Self {
        TilMessages::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Eq, Hash, PartialEq, Clone, Copy)]
pub enum ErrorMetaDataKey {
    CompilationStage,
    PrimarySuggestion,
    Callback,
}

/// Where in the source graph something went wrong.
/// Every part is optional since errors can come from the driver before any CFG exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilLocation {
    pub path: Option<PathBuf>,
    pub procedure: Option<DeclId>,
    pub block: Option<CfgBlockId>,
    pub expr: Option<ExprId>,
}

impl TilLocation {
    pub fn at_expr(expr: ExprId) -> Self {
        TilLocation {
            expr: Some(expr),
            ..TilLocation::default()
        }
    }

    pub fn at_path(path: &Path) -> Self {
        TilLocation {
            path: Some(path.to_path_buf()),
            ..TilLocation::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TilError {
    pub msg: String,
    pub location: TilLocation,
    pub error_type: ErrorType,
    pub metadata: HashMap<ErrorMetaDataKey, &'static str>,
}

impl TilError {
    pub fn new(msg: impl Into<String>, location: TilLocation, error_type: ErrorType) -> TilError {
        TilError {
            msg: msg.into(),
            location,
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: &'static str) {
        self.metadata.insert(key, value);
    }

    /// Tags the error with the procedure it came from, unless it already has one.
    pub fn with_procedure(mut self, procedure: DeclId) -> Self {
        if self.location.procedure.is_none() {
            self.location.procedure = Some(procedure);
        }
        self
    }

    /// The visit order broke one of the walker's guarantees.
    /// Always a bug in whoever produced the CFG or the order, never in the analysed code.
    pub fn new_structural_error(msg: impl Into<String>, location: TilLocation) -> Self {
        let mut error = TilError::new(msg, location, ErrorType::StructuralInconsistency);
        error.new_metadata_entry(ErrorMetaDataKey::CompilationStage, "SSA Construction");
        error
    }

    pub fn new_walker_init_error(msg: impl Into<String>, location: TilLocation) -> Self {
        let mut error = TilError::new(msg, location, ErrorType::WalkerInit);
        error.new_metadata_entry(ErrorMetaDataKey::CompilationStage, "CFG Walker Init");
        error.new_metadata_entry(
            ErrorMetaDataKey::PrimarySuggestion,
            "The procedure is skipped. Check that it has a CFG and a named declaration",
        );
        error
    }

    pub fn new_input_error(msg: impl Into<String>, location: TilLocation) -> Self {
        TilError::new(msg, location, ErrorType::Input)
    }

    pub fn file_error(path: &Path, msg: impl Into<String>) -> Self {
        TilError::new(msg, TilLocation::at_path(path), ErrorType::File)
    }
}

impl fmt::Display for TilError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", error_type_to_str(&self.error_type), self.msg)
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    WalkerInit,
    StructuralInconsistency,
    CallingContext,
    Input,
    File,
    Config,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::WalkerInit => "Walker Init Failure",
        ErrorType::StructuralInconsistency => "Structural Inconsistency",
        ErrorType::CallingContext => "Calling Context",
        ErrorType::Input => "Malformed Input",
        ErrorType::File => "File Error",
        ErrorType::Config => "Malformed Config",
    }
}

/// Returns a new TilError for a calling context that does not fit its declaration.
///
/// Usage:
/// `return_context_error!("message", location, { PrimarySuggestion => "..." })`;
#[macro_export]
macro_rules! return_context_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::til_frontend::til_errors::TilError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::til_frontend::til_errors::ErrorType::CallingContext,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::til_frontend::til_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::til_frontend::til_errors::TilError::new(
            $msg,
            $location,
            $crate::til_frontend::til_errors::ErrorType::CallingContext,
        ))
    };
}

/// Returns a new TilError for a malformed til.toml
///
/// Usage: `return_config_error!(path, "message")`;
#[macro_export]
macro_rules! return_config_error {
    ($path:expr, $msg:expr) => {
        return Err($crate::til_frontend::til_errors::TilError::new(
            $msg,
            $crate::til_frontend::til_errors::TilLocation::at_path($path),
            $crate::til_frontend::til_errors::ErrorType::Config,
        ))
    };
}

/// Returns a new TilError
///
/// Usage: `return_file_error!(path, "message")`;
#[macro_export]
macro_rules! return_file_error {
    ($path:expr, $msg:expr) => {{
        return Err($crate::til_frontend::til_errors::TilError::file_error(
            $path, $msg,
        ));
    }};
}
