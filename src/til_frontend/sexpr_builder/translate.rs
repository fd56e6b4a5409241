//! Expression translation.
//!
//! One rule per source expression kind. Sub-expressions are translated under the same
//! calling context as their parent, except for substituted formals and receivers, which
//! are translated under the context of the call site that supplied them.

use crate::ssa_log;
use crate::til_frontend::sexpr_builder::{CallingContext, SExprBuilder};
use crate::til_frontend::source::source_nodes::{
    BinaryOpKind, CastKind, DeclId, DeclInit, ExprId, ExprKind, UnaryOpKind,
};
use crate::til_frontend::til::til_nodes::{SExpr, SExprId};
use crate::til_frontend::til_errors::TilLocation;
use crate::til_frontend::til_warnings::{TilWarning, WarningKind};

/// Deepest chain of nested sub-expressions translated before the innermost one becomes a placeholder.
pub const MAX_TRANSLATE_DEPTH: usize = 256;

impl<'a> SExprBuilder<'a> {
    /// Translates one source expression into an IR node.
    ///
    /// Outside of a calling context, expressions that were already translated as statements
    /// resolve to the recorded value instead of being translated again.
    pub fn translate(&mut self, expr: ExprId, ctx: Option<&CallingContext<'_>>) -> SExprId {
        if ctx.is_none() {
            if let Some(value) = self.statement_map.get(&expr) {
                return *value;
            }
        }

        // Source nodes can refer back to themselves
        if self.translate_depth >= MAX_TRANSLATE_DEPTH {
            return self.unsupported(expr, "expression nesting too deep");
        }

        self.translate_depth += 1;
        let value = self.translate_kind(expr, ctx);
        self.translate_depth -= 1;
        value
    }

    fn translate_kind(&mut self, expr: ExprId, ctx: Option<&CallingContext<'_>>) -> SExprId {
        let ast = self.ast;
        let Some(kind) = ast.expr_kind(expr) else {
            return self.unsupported(expr, "dangling expression id");
        };

        match kind {
            ExprKind::DeclRef { decl } => self.translate_decl_ref(*decl, ctx),
            ExprKind::This => self.translate_this(ctx),
            ExprKind::Member { base, field, arrow } => {
                self.translate_member(*base, *field, *arrow, ctx)
            }

            ExprKind::Call { callee, args } | ExprKind::MemberCall { callee, args } => {
                self.translate_call(expr, *callee, args, ctx)
            }

            ExprKind::OperatorCall {
                callee,
                args,
                operator,
            } => {
                // Smart pointer access names the pointee when talking about capabilities
                if self.capability_mode && (operator == "*" || operator == "->") {
                    if let Some(object) = args.first() {
                        return self.translate(*object, ctx);
                    }
                }
                self.translate_call(expr, *callee, args, ctx)
            }

            ExprKind::Unary { op, operand } => self.translate_unary(expr, *op, *operand, ctx),
            ExprKind::Binary { op, lhs, rhs } => self.translate_binary(expr, *op, *lhs, *rhs, ctx),
            ExprKind::Cast { kind, operand } => self.translate_cast(*kind, *operand, ctx),

            ExprKind::ArraySubscript { base, index } => {
                let array = self.translate(*base, ctx);
                let index = self.translate(*index, ctx);
                self.alloc(SExpr::ArrayIndex { array, index })
            }

            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.translate(*condition, ctx);
                let then_expr = self.translate(*then_expr, ctx);
                let else_expr = self.translate(*else_expr, ctx);
                self.alloc(SExpr::IfThenElse {
                    condition,
                    then_expr,
                    else_expr,
                })
            }

            // `c ?: e` evaluates c once and uses it as the true value
            ExprKind::BinaryConditional {
                condition,
                else_expr,
            } => {
                let condition = self.translate(*condition, ctx);
                let else_expr = self.translate(*else_expr, ctx);
                self.alloc(SExpr::IfThenElse {
                    condition,
                    then_expr: condition,
                    else_expr,
                })
            }

            ExprKind::DeclStmt { decls } => self.translate_decl_stmt(decls, ctx),
            ExprKind::Paren { inner } => self.translate(*inner, ctx),
            ExprKind::Literal { value } => self.alloc(SExpr::Literal(value.clone())),
            ExprKind::Other { kind } => self.unsupported(expr, kind.as_str()),
        }
    }

    // ------------------------
    //   Names
    // ------------------------

    fn translate_decl_ref(&mut self, decl: DeclId, ctx: Option<&CallingContext<'_>>) -> SExprId {
        if let Some(arg) = self.substituted_arg(decl, ctx) {
            let prev = ctx.and_then(|ctx| ctx.prev);
            return self.translate(arg, prev);
        }

        let decl = self.resolve_decl(decl);
        match self.lookup_var_decl(decl) {
            Some(value) => value,
            None => self.alloc(SExpr::LiteralPtr(decl)),
        }
    }

    fn translate_this(&mut self, ctx: Option<&CallingContext<'_>>) -> SExprId {
        if let Some(ctx) = ctx {
            if let Some(self_arg) = ctx.self_arg {
                return self.translate(self_arg, ctx.prev);
            }
        }
        self.scfg.self_var
    }

    fn translate_member(
        &mut self,
        base: ExprId,
        field: DeclId,
        arrow: bool,
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        let ast = self.ast;
        let implicit_receiver = matches!(
            ast.expr_kind(ast.ignore_parens_and_transparent_casts(base)),
            Some(ExprKind::This)
        );

        // A substituted receiver is accessed the way the call site accessed it
        let arrow = match ctx {
            Some(ctx) if implicit_receiver && ctx.self_arg.is_some() => ctx.self_arrow,
            _ => arrow,
        };

        let record = self.translate(base, ctx);
        self.alloc(SExpr::Project {
            record,
            field,
            arrow,
        })
    }

    /// Actual argument that replaces `decl` when it is a formal of the context's function.
    fn substituted_arg(&self, decl: DeclId, ctx: Option<&CallingContext<'_>>) -> Option<ExprId> {
        let ctx = ctx?;
        let ast = self.ast;
        let (function, index) = ast.param_info(ast.canonical_decl(decl))?;

        if ast.canonical_decl(function) != ast.canonical_decl(ctx.attr_decl) {
            return None;
        }
        ctx.arg(index)
    }

    // Parameters of a redeclaration are renamed to the canonical function's parameters
    fn resolve_decl(&self, decl: DeclId) -> DeclId {
        let ast = self.ast;
        let decl = ast.canonical_decl(decl);
        let Some((function, index)) = ast.param_info(decl) else {
            return decl;
        };

        match ast
            .function_params(ast.canonical_decl(function))
            .and_then(|params| params.get(index))
        {
            Some(param) => *param,
            None => decl,
        }
    }

    // ------------------------
    //   Calls
    // ------------------------

    fn translate_call(
        &mut self,
        call: ExprId,
        callee: ExprId,
        args: &[ExprId],
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        if self.capability_mode {
            if let Some(value) = self.translate_returned_attr(call, callee, ctx) {
                return value;
            }
        }

        let mut target = self.translate(callee, ctx);
        for arg in args {
            let arg = self.translate(*arg, ctx);
            target = self.alloc(SExpr::Apply {
                function: target,
                arg,
            });
        }

        self.alloc(SExpr::Call {
            target,
            source: Some(call),
        })
    }

    /// Replaces a call to an annotated function with the value its attribute names.
    /// Returns None when the callee has no such attribute or the call doesn't fit it.
    fn translate_returned_attr(
        &mut self,
        call: ExprId,
        callee: ExprId,
        ctx: Option<&CallingContext<'_>>,
    ) -> Option<SExprId> {
        let ast = self.ast;
        let function = ast.callee_decl(callee)?;
        let attr = ast.returned_attr(function)?;

        match CallingContext::from_call(ast, call, function, ctx) {
            Ok(frame) => {
                ssa_log!(
                    "  attribute hop through ",
                    ast.decl_name(function),
                    " at depth ",
                    frame.depth().to_string()
                );
                Some(self.translate_attr_expr(attr, Some(&frame)))
            }
            Err(error) => {
                let location = TilLocation {
                    block: self.current_source,
                    expr: Some(call),
                    ..TilLocation::default()
                };
                self.warnings.push(TilWarning::new(
                    &error.msg,
                    location,
                    WarningKind::ArityMismatch,
                ));
                None
            }
        }
    }

    // ------------------------
    //   Operators
    // ------------------------

    fn translate_unary(
        &mut self,
        expr: ExprId,
        op: UnaryOpKind,
        operand: ExprId,
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        match op {
            UnaryOpKind::PreInc
            | UnaryOpKind::PreDec
            | UnaryOpKind::PostInc
            | UnaryOpKind::PostDec => {
                self.unsupported(expr, format!("unary operator {}", op.as_str()))
            }

            UnaryOpKind::Deref | UnaryOpKind::AddrOf | UnaryOpKind::Plus => {
                self.translate(operand, ctx)
            }

            UnaryOpKind::Minus | UnaryOpKind::Not | UnaryOpKind::LNot => {
                let operand = self.translate(operand, ctx);
                self.alloc(SExpr::UnaryOp { op, operand })
            }
        }
    }

    fn translate_binary(
        &mut self,
        expr: ExprId,
        op: BinaryOpKind,
        lhs: ExprId,
        rhs: ExprId,
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        match op {
            BinaryOpKind::Assign => self.translate_assign(None, lhs, rhs, ctx),

            BinaryOpKind::PtrMemD | BinaryOpKind::PtrMemI => {
                self.unsupported(expr, format!("binary operator {}", op.as_str()))
            }

            // The left side is a separate statement in the CFG
            BinaryOpKind::Comma => self.translate(rhs, ctx),

            _ => match op.compound_base() {
                Some(base) => self.translate_assign(Some(base), lhs, rhs, ctx),
                None => {
                    let lhs = self.translate(lhs, ctx);
                    let rhs = self.translate(rhs, ctx);
                    self.alloc(SExpr::BinaryOp { op, lhs, rhs })
                }
            },
        }
    }

    /// `lhs = rhs`, or `lhs op= rhs` when `compound` names the operator.
    ///
    /// A local with a slot gets a new SSA value. Anything else is written through a store.
    fn translate_assign(
        &mut self,
        compound: Option<BinaryOpKind>,
        lhs: ExprId,
        rhs: ExprId,
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        let ast = self.ast;
        let target = ast.ignore_parens_and_transparent_casts(lhs);
        let local = match ast.expr_kind(target) {
            Some(ExprKind::DeclRef { decl }) if self.substituted_arg(*decl, ctx).is_none() => {
                let decl = self.resolve_decl(*decl);
                self.slot_of(decl).map(|_| decl)
            }
            _ => None,
        };

        let mut dest = None;
        let mut value = self.translate(rhs, ctx);

        if let Some(op) = compound {
            let current = match local.and_then(|decl| self.lookup_var_decl(decl)) {
                Some(current) => current,
                None => {
                    let pointer = self.translate(lhs, ctx);
                    dest = Some(pointer);
                    self.alloc(SExpr::Load { pointer })
                }
            };

            let combined = self.alloc(SExpr::BinaryOp {
                op,
                lhs: current,
                rhs: value,
            });
            value = self.bind_value(combined, local);
        }

        if let Some(decl) = local {
            let value = self.bind_value(value, Some(decl));
            return self.update_var_decl(decl, value);
        }

        let dest = match dest {
            Some(dest) => dest,
            None => self.translate(lhs, ctx),
        };
        self.alloc(SExpr::Store {
            dest,
            source: value,
        })
    }

    fn translate_cast(
        &mut self,
        kind: CastKind,
        operand: ExprId,
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        match kind {
            CastKind::LValueToRValue => self.translate_read(operand, ctx),
            kind if kind.is_transparent() => self.translate(operand, ctx),
            _ => {
                let operand = self.translate(operand, ctx);
                self.alloc(SExpr::Cast { kind, operand })
            }
        }
    }

    // Reading a local yields its SSA value. Memory without one is loaded.
    fn translate_read(&mut self, operand: ExprId, ctx: Option<&CallingContext<'_>>) -> SExprId {
        if self.capability_mode {
            return self.translate(operand, ctx);
        }

        let ast = self.ast;
        let target = ast.ignore_parens_and_transparent_casts(operand);
        if let Some(ExprKind::DeclRef { decl }) = ast.expr_kind(target) {
            if self.substituted_arg(*decl, ctx).is_some() {
                return self.translate(operand, ctx);
            }
            if let Some(value) = self.lookup_var_decl(self.resolve_decl(*decl)) {
                return value;
            }
        }

        let pointer = self.translate(operand, ctx);
        self.alloc(SExpr::Load { pointer })
    }

    // ------------------------
    //   Declarations
    // ------------------------

    fn translate_decl_stmt(
        &mut self,
        decls: &[DeclInit],
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        let mut last = None;

        for DeclInit { decl, init } in decls {
            let value = match init {
                Some(init) => self.translate(*init, ctx),
                None => self.alloc(SExpr::Undefined),
            };

            let value = self.bind_value(value, Some(*decl));
            last = Some(self.add_var_decl(*decl, value));
        }

        match last {
            Some(value) => value,
            None => self.alloc(SExpr::Undefined),
        }
    }
}
