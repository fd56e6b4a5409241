//! Runs the SSA translation over every procedure of a translation unit file.
//!
//! Procedures are independent: each one gets its own `AnalysisContext` and builder, so the
//! unit is shared read-only and the work can be spread over rayon's pool.

use crate::projects::settings::{Config, DriverConfig};
use crate::return_file_error;
use crate::til_frontend::Flag;
use crate::til_frontend::sexpr_builder::{BuildOutput, build_cfg};
use crate::til_frontend::source::analysis_context::AnalysisContext;
use crate::til_frontend::source::source_cfg::SourceCfg;
use crate::til_frontend::source::source_nodes::{DeclId, SourceAst};
use crate::til_frontend::til::til_display::render_scfg;
use crate::til_frontend::til_errors::{ErrorType, TilError, TilLocation, TilMessages};
use crate::til_frontend::til_warnings::{TilWarning, WarningKind};
use crate::timer_log;
use rayon::prelude::*;
use saying::say;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Instant;

// ----------------------
//      Input Format
// ----------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    #[serde(default)]
    pub decl: Option<DeclId>,

    #[serde(default)]
    pub cfg: Option<SourceCfg>,
}

/// One JSON input file: the shared declarations and expressions plus the procedures to translate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    #[serde(flatten)]
    pub ast: SourceAst,

    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl TranslationUnit {
    pub fn from_json_str(source: &str, path: &Path) -> Result<TranslationUnit, TilError> {
        let unit: TranslationUnit = match serde_json::from_str(source) {
            Ok(unit) => unit,
            Err(e) => {
                return Err(TilError::new_input_error(
                    format!("Invalid translation unit: {e}"),
                    TilLocation::at_path(path),
                ));
            }
        };

        if let Err(reason) = unit.ast.validate() {
            return Err(TilError::new_input_error(reason, TilLocation::at_path(path)));
        }

        Ok(unit)
    }

    pub fn load(path: &Path) -> Result<TranslationUnit, TilError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => return_file_error!(path, format!("Could not read translation unit: {e}")),
        };

        TranslationUnit::from_json_str(&source, path)
    }
}

// ----------------------
//        Results
// ----------------------

#[derive(Debug)]
pub enum ProcedureOutcome {
    Built(BuildOutput),

    // Not walked at all (no CFG, anonymous, too big). Reported as a warning.
    Skipped(String),

    Failed(TilError),
}

#[derive(Debug)]
pub struct ProcedureResult {
    pub decl: Option<DeclId>,
    pub name: String,
    pub outcome: ProcedureOutcome,
}

#[derive(Debug, Default)]
pub struct DriverReport {
    pub results: Vec<ProcedureResult>,
    pub messages: TilMessages,
}

impl DriverReport {
    pub fn built(&self) -> impl Iterator<Item = (&ProcedureResult, &BuildOutput)> {
        self.results.iter().filter_map(|result| match &result.outcome {
            ProcedureOutcome::Built(output) => Some((result, output)),
            _ => None,
        })
    }

    pub fn num_built(&self) -> usize {
        self.built().count()
    }
}

// ----------------------
//        Running
// ----------------------

/// Translates every procedure of `unit`. Failures of one procedure never stop the others.
pub fn run_unit(unit: &TranslationUnit, config: &DriverConfig) -> DriverReport {
    let run = |procedure: &Procedure| translate_procedure(&unit.ast, procedure, config.max_blocks);

    let results: Vec<ProcedureResult> = if config.parallel {
        unit.procedures.par_iter().map(run).collect()
    } else {
        unit.procedures.iter().map(run).collect()
    };

    let mut messages = TilMessages::new();
    for result in &results {
        let location = TilLocation {
            procedure: result.decl,
            ..TilLocation::default()
        };

        match &result.outcome {
            ProcedureOutcome::Built(output) => {
                for warning in &output.warnings {
                    let mut warning = warning.clone();
                    warning.location.procedure = result.decl;
                    messages.warnings.push(warning);
                }
            }
            ProcedureOutcome::Skipped(reason) => {
                messages.warnings.push(TilWarning::new(
                    &format!("{}: {reason}", result.name),
                    location,
                    WarningKind::SkippedProcedure,
                ));
            }
            ProcedureOutcome::Failed(error) => messages.errors.push(error.clone()),
        }
    }

    DriverReport { results, messages }
}

fn translate_procedure(
    ast: &SourceAst,
    procedure: &Procedure,
    max_blocks: usize,
) -> ProcedureResult {
    let name = match procedure.decl {
        Some(decl) => ast.decl_name(decl),
        None => String::from("<anonymous>"),
    };

    let outcome = match &procedure.cfg {
        Some(cfg) if cfg.num_blocks() > max_blocks => ProcedureOutcome::Skipped(format!(
            "{} blocks is over the limit of {max_blocks}",
            cfg.num_blocks()
        )),
        cfg => {
            let ctx = AnalysisContext::new(ast, cfg.as_ref(), procedure.decl);
            match build_cfg(&ctx) {
                Ok(output) => ProcedureOutcome::Built(output),
                Err(error) if error.error_type == ErrorType::WalkerInit => {
                    ProcedureOutcome::Skipped(error.msg)
                }
                Err(error) => ProcedureOutcome::Failed(error),
            }
        }
    };

    ProcedureResult {
        decl: procedure.decl,
        name,
        outcome,
    }
}

/// Loads the unit and its config, translates it and prints the dumps the config asks for.
pub fn translate_unit_file(
    path: &Path,
    config_path: Option<&Path>,
    flags: &[Flag],
    dump: bool,
) -> Result<DriverReport, TilError> {
    let time = Instant::now();

    let mut config = Config::resolve(config_path, path)?;
    if flags.contains(&Flag::Sequential) {
        config.driver.parallel = false;
    }
    if flags.contains(&Flag::NoDump) {
        config.dump.enabled = false;
    }

    let unit = TranslationUnit::load(path)?;
    timer_log!(time, "Unit loaded in: ");

    let report = run_unit(&unit, &config.driver);

    if dump && config.dump.enabled {
        let options = config.dump.display_options();
        for (_, output) in report.built() {
            let rendered = render_scfg(&output.scfg, Some(&unit.ast), &options);
            say!("\n", rendered);
        }
    }

    if !flags.contains(&Flag::DisableTimers) {
        let built = report.num_built().to_string();
        let total = unit.procedures.len().to_string();
        say!(
            Green "\nTranslated ",
            Green built,
            Green " of ",
            Green total,
            Green " procedures in: ",
            Green #time.elapsed()
        );
    }

    Ok(report)
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
