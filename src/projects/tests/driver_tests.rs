//! Tests for running whole translation units.

use super::{
    DriverReport, Procedure, ProcedureOutcome, TranslationUnit, run_unit, translate_unit_file,
};
use crate::projects::settings::{CONFIG_FILE_NAME, DriverConfig};
use crate::til_frontend::Flag;
use crate::til_frontend::source::source_cfg::SourceCfg;
use crate::til_frontend::source::source_nodes::{CfgBlockId, ExprId, ExprKind};
use crate::til_frontend::test_support::{UnitBuilder, straight_line, while_loop};
use crate::til_frontend::til_errors::ErrorType;
use crate::til_frontend::til_warnings::WarningKind;
use std::fs;
use std::path::Path;

const QUIET: [Flag; 2] = [Flag::NoDump, Flag::DisableTimers];

// Two procedures that always build: a straight line and a loop
fn two_procedure_unit() -> TranslationUnit {
    let mut unit = UnitBuilder::new();

    let (first, params) = unit.function("first", &["a"]);
    let read_a = unit.read(params[0]);
    let mut first_cfg = straight_line();
    let entry = first_cfg.entry;
    first_cfg.push_statement(entry, read_a);

    let (second, params) = unit.function("second", &["c"]);
    let condition = unit.read(params[0]);
    let mut shape = while_loop();
    shape.cfg.set_terminator(shape.header, condition);

    TranslationUnit {
        ast: unit.ast,
        procedures: vec![
            Procedure {
                decl: Some(first),
                cfg: Some(first_cfg),
            },
            Procedure {
                decl: Some(second),
                cfg: Some(shape.cfg),
            },
        ],
    }
}

fn config(max_blocks: usize, parallel: bool) -> DriverConfig {
    DriverConfig {
        max_blocks,
        parallel,
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let unit = two_procedure_unit();

    let sequential = run_unit(&unit, &config(100, false));
    let parallel = run_unit(&unit, &config(100, true));

    assert_eq!(sequential.num_built(), 2);
    assert_eq!(parallel.num_built(), 2);
    assert!(!sequential.messages.has_errors());

    // Results keep the order of the procedures in the unit
    let names: Vec<&str> = parallel.results.iter().map(|result| result.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);

    let phis = |report: &DriverReport| -> Vec<usize> {
        report.built().map(|(_, output)| output.scfg.num_phis()).collect()
    };
    assert_eq!(phis(&sequential), phis(&parallel));
}

#[test]
fn procedures_without_a_body_or_over_the_limit_are_skipped() {
    let mut unit = UnitBuilder::new();
    let (declared_only, _) = unit.function("declared_only", &[]);
    let (big, _) = unit.function("big", &[]);

    let translation_unit = TranslationUnit {
        ast: unit.ast,
        procedures: vec![
            Procedure {
                decl: Some(declared_only),
                cfg: None,
            },
            Procedure {
                decl: Some(big),
                cfg: Some(while_loop().cfg),
            },
        ],
    };

    let report = run_unit(&translation_unit, &config(3, false));

    assert_eq!(report.num_built(), 0);
    assert!(!report.messages.has_errors());
    assert!(
        report
            .results
            .iter()
            .all(|result| matches!(result.outcome, ProcedureOutcome::Skipped(_)))
    );

    let warnings = &report.messages.warnings;
    assert_eq!(warnings.len(), 2);
    assert!(
        warnings
            .iter()
            .all(|warning| warning.warning_kind == WarningKind::SkippedProcedure)
    );
    assert!(warnings[0].msg.starts_with("declared_only: "));
    assert!(warnings[1].msg.contains("over the limit of 3"));
    assert_eq!(warnings[1].location.procedure, Some(big));
}

#[test]
fn broken_procedure_fails_alone() {
    let mut translation_unit = two_procedure_unit();

    // B3 claims B0 as a predecessor, but B0 never lists B3 as a successor
    let mut unit = UnitBuilder {
        ast: translation_unit.ast.clone(),
    };
    let (broken, _) = unit.function("broken", &[]);
    translation_unit.ast = unit.ast;

    let mut cfg = SourceCfg::new();
    let (entry, exit) = (cfg.entry, cfg.exit);
    let middle = cfg.add_block();
    let tail = cfg.add_block();
    cfg.add_edge(entry, middle);
    cfg.add_edge(middle, tail);
    cfg.add_edge(tail, exit);
    cfg.blocks[tail.index()].preds.insert(0, Some(entry));

    translation_unit.procedures.push(Procedure {
        decl: Some(broken),
        cfg: Some(cfg),
    });

    let report = run_unit(&translation_unit, &config(100, true));

    assert_eq!(report.num_built(), 2);
    assert_eq!(report.messages.errors.len(), 1);

    let error = &report.messages.errors[0];
    assert_eq!(error.error_type, ErrorType::StructuralInconsistency);
    assert_eq!(error.location.procedure, Some(broken));
    assert_eq!(error.location.block, Some(CfgBlockId(3)));
}

#[test]
fn translation_warnings_carry_their_procedure() {
    let mut unit = UnitBuilder::new();
    let (function, _) = unit.function("odd", &[]);
    let lambda = unit.other("lambda");
    let mut cfg = straight_line();
    let entry = cfg.entry;
    cfg.push_statement(entry, lambda);

    let translation_unit = TranslationUnit {
        ast: unit.ast,
        procedures: vec![Procedure {
            decl: Some(function),
            cfg: Some(cfg),
        }],
    };

    let report = run_unit(&translation_unit, &config(100, false));
    let warning = &report.messages.warnings[0];

    assert_eq!(warning.warning_kind, WarningKind::UnsupportedExpression);
    assert_eq!(warning.location.procedure, Some(function));
    assert_eq!(warning.location.expr, Some(lambda));
}

#[test]
fn self_referencing_statement_does_not_abort_the_unit() {
    let mut translation_unit = two_procedure_unit();

    let mut unit = UnitBuilder {
        ast: translation_unit.ast.clone(),
    };
    let (cyclic, _) = unit.function("cyclic", &[]);
    let next = ExprId(unit.ast.exprs.len() as u32);
    let looped = unit.expr(ExprKind::Paren { inner: next });
    translation_unit.ast = unit.ast;

    let mut cfg = straight_line();
    let entry = cfg.entry;
    cfg.push_statement(entry, looped);
    translation_unit.procedures.push(Procedure {
        decl: Some(cyclic),
        cfg: Some(cfg),
    });

    let report = run_unit(&translation_unit, &config(100, true));

    assert_eq!(report.num_built(), 3);
    assert!(!report.messages.has_errors());
    assert_eq!(report.messages.warnings.len(), 1);

    let warning = &report.messages.warnings[0];
    assert_eq!(warning.warning_kind, WarningKind::UnsupportedExpression);
    assert_eq!(warning.location.procedure, Some(cyclic));
    assert_eq!(warning.location.expr, Some(looped));
}

// ------------------------
//   Files
// ------------------------

#[test]
fn unit_file_round_trips_through_json_and_translates() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("unit.json");

    let unit = two_procedure_unit();
    let json = serde_json::to_string_pretty(&unit).expect("unit should serialize");
    fs::write(&path, json).expect("unit should be written");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "[driver]\nmax_blocks = 4\n")
        .expect("config should be written");

    assert_eq!(TranslationUnit::load(&path).expect("unit should load"), unit);

    // The loop has five blocks, so the config beside the unit skips it
    let report = translate_unit_file(&path, None, &QUIET, true).expect("translation should run");
    assert_eq!(report.num_built(), 1);
    assert_eq!(report.messages.warnings.len(), 1);
}

#[test]
fn malformed_unit_files_are_input_errors() {
    let path = Path::new("unit.json");

    let error = TranslationUnit::from_json_str("{ \"decls\": 3 }", path)
        .expect_err("decls must be a list");
    assert_eq!(error.error_type, ErrorType::Input);
    assert_eq!(error.location.path.as_deref(), Some(path));

    let misplaced = r#"{
        "decls": [{ "id": 1, "name": "f", "kind": { "type": "var" } }],
        "procedures": []
    }"#;
    let error = TranslationUnit::from_json_str(misplaced, path)
        .expect_err("ids must match positions");
    assert_eq!(error.error_type, ErrorType::Input);
    assert!(error.msg.contains("stored at position 0"));
}

#[test]
fn missing_unit_file_is_a_file_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("nowhere.json");

    let error = translate_unit_file(&path, None, &QUIET, false).expect_err("file does not exist");
    assert_eq!(error.error_type, ErrorType::File);
}
