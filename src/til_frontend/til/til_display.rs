//! TIL Display
//!
//! Human-readable dump of a finished `Scfg`. Only used for debugging and the CLI `build`
//! output; nothing downstream parses it.

use crate::til_frontend::source::source_nodes::{DeclId, SourceAst};
use crate::til_frontend::til::til_nodes::{
    BasicBlock, PhiStatus, SExpr, SExprId, Scfg, Terminator, VariableKind,
};
use std::fmt::Write as _;

// Apply chains and nested operators can get deep on generated input
const MAX_EXPR_RENDER_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct TilDisplayOptions {
    pub show_instructions: bool,
    pub show_phi_status: bool,
    pub show_edges: bool,
}

impl Default for TilDisplayOptions {
    fn default() -> Self {
        Self {
            show_instructions: true,
            show_phi_status: true,
            show_edges: true,
        }
    }
}

#[derive(Clone, Copy)]
pub struct TilDisplayContext<'a> {
    scfg: &'a Scfg,
    ast: Option<&'a SourceAst>,
    options: TilDisplayOptions,
}

pub fn render_scfg(scfg: &Scfg, ast: Option<&SourceAst>, options: &TilDisplayOptions) -> String {
    TilDisplayContext::new(scfg)
        .with_ast(ast)
        .with_options(*options)
        .render_scfg()
}

/// Renders one expression with declaration names resolved through `ast`.
pub fn render_sexpr(scfg: &Scfg, ast: Option<&SourceAst>, id: SExprId) -> String {
    TilDisplayContext::new(scfg).with_ast(ast).render_sexpr(id)
}

impl<'a> TilDisplayContext<'a> {
    pub fn new(scfg: &'a Scfg) -> Self {
        Self {
            scfg,
            ast: None,
            options: TilDisplayOptions::default(),
        }
    }

    pub fn with_ast(mut self, ast: Option<&'a SourceAst>) -> Self {
        self.ast = ast;
        self
    }

    pub fn with_options(mut self, options: TilDisplayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render_scfg(&self) -> String {
        let mut out = String::with_capacity(self.scfg.order.len() * 128);

        let name = match self.scfg.procedure {
            Some(decl) => self.decl_label(decl),
            None => String::from("<anonymous>"),
        };

        let _ = writeln!(
            out,
            "scfg {name} [entry: {}, exit: {}] {{",
            self.scfg.entry, self.scfg.exit
        );

        if self.scfg.order.is_empty() {
            out.push_str("  (no blocks)\n");
        }

        for block_id in &self.scfg.order {
            let Some(block) = self.scfg.block(*block_id) else {
                continue;
            };
            for line in self.render_block(block).lines() {
                let _ = writeln!(out, "  {line}");
            }
        }

        out.push('}');
        out
    }

    pub fn render_block(&self, block: &BasicBlock) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} (from {})", block.id, block.source);

        if self.options.show_edges {
            let _ = writeln!(out, "  preds: [{}]", join_ids(&block.predecessors));
            let _ = writeln!(out, "  succs: [{}]", join_ids(&block.successors));
        }

        if !block.arguments.is_empty() {
            out.push_str("  args:\n");
            for argument in &block.arguments {
                let _ = writeln!(out, "    {}", self.render_binding(*argument));
            }
        }

        if self.options.show_instructions && !block.instructions.is_empty() {
            out.push_str("  instructions:\n");
            for instruction in &block.instructions {
                let _ = writeln!(out, "    {}", self.render_binding(*instruction));
            }
        }

        out.push_str("  terminator: ");
        match &block.terminator {
            Some(terminator) => out.push_str(&self.render_terminator(terminator)),
            None => out.push_str("(none)"),
        }
        out.push('\n');

        out
    }

    pub fn render_terminator(&self, terminator: &Terminator) -> String {
        match terminator {
            Terminator::Return => String::from("return"),
            Terminator::Goto { target } => format!("goto {target}"),
            Terminator::Branch {
                condition,
                then_block,
                else_block,
            } => format!(
                "branch {} ? {then_block} : {else_block}",
                self.render_sexpr(*condition)
            ),
            Terminator::Switch { condition, targets } => format!(
                "switch {} [{}]",
                self.render_sexpr(*condition),
                join_ids(targets)
            ),
        }
    }

    /// `label = definition` for a block argument or instruction.
    pub fn render_binding(&self, variable: SExprId) -> String {
        let mut out = self.variable_label(variable);

        if let Some(SExpr::Variable {
            definition: Some(definition),
            ..
        }) = self.scfg.get(variable)
        {
            let _ = write!(out, " = {}", self.render_node(*definition, 0));
        }

        if self.options.show_phi_status {
            if let Some(status) = self.scfg.arena.phi_status(variable) {
                let _ = write!(out, " [{}]", phi_status_label(status));
            }
        }

        out
    }

    pub fn render_sexpr(&self, id: SExprId) -> String {
        self.render_node(id, 0)
    }

    fn render_node(&self, id: SExprId, depth: usize) -> String {
        if depth > MAX_EXPR_RENDER_DEPTH {
            return String::from("...");
        }

        let Some(expr) = self.scfg.get(id) else {
            return format!("<dangling {id}>");
        };

        let child = |child: SExprId| self.render_node(child, depth + 1);

        match expr {
            SExpr::Variable { .. } => self.variable_label(id),
            SExpr::Phi { values, .. } => {
                let values = values
                    .iter()
                    .map(|value| match value {
                        Some(value) => child(*value),
                        None => String::from("?"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("phi({values})")
            }
            SExpr::Literal(value) => value.to_string(),
            SExpr::LiteralPtr(decl) => format!("&{}", self.decl_label(*decl)),
            SExpr::Undefined => String::from("undefined"),
            SExpr::Unsupported { kind, .. } => format!("unsupported({kind})"),
            SExpr::Apply { .. } => {
                let (head, args) = self.flatten_apply(id);
                let args = args.into_iter().map(child).collect::<Vec<_>>().join(", ");
                format!("{}({args})", child(head))
            }
            SExpr::Project {
                record,
                field,
                arrow,
            } => {
                let access = if *arrow { "->" } else { "." };
                format!("{}{access}{}", child(*record), self.decl_label(*field))
            }
            SExpr::Call { target, .. } => match self.scfg.get(*target) {
                Some(SExpr::Apply { .. }) => format!("call {}", child(*target)),
                _ => format!("call {}()", child(*target)),
            },
            SExpr::Load { pointer } => format!("load {}", child(*pointer)),
            SExpr::Store { dest, source } => format!("store {} := {}", child(*dest), child(*source)),
            SExpr::ArrayIndex { array, index } => format!("{}[{}]", child(*array), child(*index)),
            SExpr::UnaryOp { op, operand } => format!("({}{})", op.as_str(), child(*operand)),
            SExpr::BinaryOp { op, lhs, rhs } => {
                format!("({} {} {})", child(*lhs), op.as_str(), child(*rhs))
            }
            SExpr::Cast { kind, operand } => format!("cast<{kind:?}>({})", child(*operand)),
            SExpr::IfThenElse {
                condition,
                then_expr,
                else_expr,
            } => format!(
                "({} ? {} : {})",
                child(*condition),
                child(*then_expr),
                child(*else_expr)
            ),
        }
    }

    // f(a)(b) is stored as Apply(Apply(f, a), b)
    fn flatten_apply(&self, id: SExprId) -> (SExprId, Vec<SExprId>) {
        let mut args = Vec::new();
        let mut head = id;

        while let Some(SExpr::Apply { function, arg }) = self.scfg.get(head) {
            args.push(*arg);
            head = *function;
        }

        args.reverse();
        (head, args)
    }

    pub fn variable_label(&self, id: SExprId) -> String {
        match self.scfg.get(id) {
            Some(SExpr::Variable {
                kind: VariableKind::SelfFun,
                ..
            }) => String::from("this"),
            Some(SExpr::Variable {
                kind: VariableKind::Fun,
                decl: Some(decl),
                ..
            }) => self.decl_label(*decl),
            Some(SExpr::Variable {
                decl: Some(decl), ..
            }) => format!("{}{id}", self.decl_label(*decl)),
            _ => id.to_string(),
        }
    }

    fn decl_label(&self, decl: DeclId) -> String {
        match self.ast {
            Some(ast) => ast.decl_name(decl),
            None => decl.to_string(),
        }
    }
}

fn join_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn phi_status_label(status: PhiStatus) -> &'static str {
    match status {
        PhiStatus::Incomplete => "incomplete",
        PhiStatus::SingleVal => "single",
        PhiStatus::MultiVal => "multi",
    }
}
