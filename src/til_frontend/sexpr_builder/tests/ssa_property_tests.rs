//! Property tests: randomly shaped diamond chains and loops always end up with complete phis
//! whose values line up with the predecessor that supplied them.

use crate::til_frontend::source::source_cfg::SourceCfg;
use crate::til_frontend::source::source_nodes::{CfgBlockId, ExprId};
use crate::til_frontend::test_support::{UnitBuilder, bb, build, is_int, while_loop};
use crate::til_frontend::til::til_nodes::{PhiStatus, SExpr, SExprId, Scfg};
use proptest::prelude::*;

// Value x should have at some join: a literal, or the value read at an earlier join
#[derive(Debug, Clone, Copy, PartialEq)]
enum Expected {
    Int(i64),
    AtJoin(usize),
}

fn branch_assignment() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(-50i64..50)
}

fn diamond_chain() -> impl Strategy<Value = Vec<(Option<i64>, Option<i64>)>> {
    prop::collection::vec((branch_assignment(), branch_assignment()), 1..6)
}

fn loop_body() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(branch_assignment(), 0..5)
}

fn matches_expected(scfg: &Scfg, value: SExprId, expected: Expected, join_values: &[SExprId]) -> bool {
    match expected {
        Expected::Int(int) => is_int(scfg, value, int),
        Expected::AtJoin(join) => join_values.get(join) == Some(&value),
    }
}

fn all_phis_complete(scfg: &Scfg) -> bool {
    scfg.arena.iter().all(|(_, expr)| match expr {
        SExpr::Phi { values, status, .. } => {
            *status != PhiStatus::Incomplete && values.iter().all(Option::is_some)
        }
        _ => true,
    })
}

proptest! {
    /// Property: every join of a diamond chain merges exactly the values its two branches left behind
    #[test]
    fn prop_diamond_chain_phis_follow_branches(branches in diamond_chain()) {
        let mut unit = UnitBuilder::new();
        let (function, params) = unit.function("chain", &["c"]);
        let x = unit.var("x");
        let zero = unit.int(0);
        let declare_x = unit.declare(x, Some(zero));

        let mut cfg = SourceCfg::new();
        let (entry, exit) = (cfg.entry, cfg.exit);
        cfg.push_statement(entry, declare_x);

        let mut split = entry;
        let mut joins: Vec<(CfgBlockId, ExprId)> = Vec::new();

        for (then_value, else_value) in &branches {
            let condition = unit.read(params[0]);
            cfg.set_terminator(split, condition);

            let then_block = cfg.add_block();
            let else_block = cfg.add_block();
            let join = cfg.add_block();
            cfg.add_edge(split, then_block);
            cfg.add_edge(split, else_block);
            cfg.add_edge(then_block, join);
            cfg.add_edge(else_block, join);

            for (block, value) in [(then_block, then_value), (else_block, else_value)] {
                if let Some(value) = value {
                    let literal = unit.int(*value);
                    let assign = unit.assign(x, literal);
                    cfg.push_statement(block, assign);
                }
            }

            let read_x = unit.read(x);
            cfg.push_statement(join, read_x);
            joins.push((join, read_x));
            split = join;
        }
        cfg.add_edge(split, exit);

        let output = build(&unit.ast, &cfg, function);
        let scfg = &output.scfg;
        prop_assert!(all_phis_complete(scfg));

        let join_values: Vec<SExprId> = joins
            .iter()
            .map(|(_, read)| output.lookup_statement_value(*read).expect("join read should have a value"))
            .collect();

        let mut current = Expected::Int(0);
        for (index, (then_value, else_value)) in branches.iter().enumerate() {
            let (join, _) = joins[index];
            let arguments = &scfg.block(bb(join)).expect("join should exist").arguments;

            let then_expected = then_value.map_or(current, Expected::Int);
            let else_expected = else_value.map_or(current, Expected::Int);

            if then_value.is_none() && else_value.is_none() {
                prop_assert!(arguments.is_empty());
                prop_assert!(matches_expected(scfg, join_values[index], current, &join_values));
            } else {
                prop_assert_eq!(arguments.len(), 1);
                let phi = arguments[0];
                prop_assert_eq!(join_values[index], phi);
                prop_assert_eq!(scfg.arena.phi_status(phi), Some(PhiStatus::MultiVal));

                let values = scfg.arena.phi_values(phi).expect("argument should be a phi");
                prop_assert_eq!(values.len(), 2);
                prop_assert!(values[0].is_some_and(|value| matches_expected(scfg, value, then_expected, &join_values)));
                prop_assert!(values[1].is_some_and(|value| matches_expected(scfg, value, else_expected, &join_values)));

                current = Expected::AtJoin(index);
            }
        }
    }

    /// Property: the back edge of a loop always completes the header phi with the body's last value
    #[test]
    fn prop_loop_header_phi_completed_by_back_edge(body in loop_body()) {
        let mut unit = UnitBuilder::new();
        let (function, params) = unit.function("spin", &["c"]);
        let x = unit.var("x");
        let zero = unit.int(0);
        let declare_x = unit.declare(x, Some(zero));
        let condition = unit.read(params[0]);

        let mut shape = while_loop();
        let entry = shape.cfg.entry;
        shape.cfg.push_statement(entry, declare_x);
        shape.cfg.set_terminator(shape.header, condition);

        for value in &body {
            let stmt = match value {
                Some(value) => {
                    let literal = unit.int(*value);
                    unit.assign(x, literal)
                }
                None => unit.read(x),
            };
            shape.cfg.push_statement(shape.body, stmt);
        }

        let output = build(&unit.ast, &shape.cfg, function);
        let scfg = &output.scfg;
        prop_assert!(all_phis_complete(scfg));

        let header = scfg.block(bb(shape.header)).expect("header should exist");
        let phi_x = header
            .arguments
            .iter()
            .copied()
            .find(|argument| scfg.arena.variable_decl(*argument) == Some(x))
            .expect("header should have a phi for x");

        let values = scfg.arena.phi_values(phi_x).expect("argument should be a phi");
        prop_assert!(values[0].is_some_and(|value| is_int(scfg, value, 0)));

        match body.iter().rev().flatten().next() {
            Some(last) => {
                prop_assert!(values[1].is_some_and(|value| is_int(scfg, value, *last)));
                prop_assert_eq!(scfg.arena.phi_status(phi_x), Some(PhiStatus::MultiVal));
            }
            None => {
                prop_assert_eq!(values[1], Some(phi_x));
                prop_assert_eq!(scfg.arena.phi_status(phi_x), Some(PhiStatus::SingleVal));
            }
        }
    }
}
