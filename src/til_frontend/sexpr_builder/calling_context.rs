//! Calling contexts for attribute translation.
//!
//! An attribute such as "returns the lock held by `a.mu`" is written in the callee's scope.
//! To use it at a call site, the callee's formals have to be replaced with the caller's
//! actual arguments. A `CallingContext` frame carries that substitution. Frames are borrowed
//! from the Rust stack and chained outwards through `prev`, so a frame can never outlive the
//! call site that pushed it and a chain can't loop.

use crate::return_context_error;
use crate::til_frontend::sexpr_builder::SExprBuilder;
use crate::til_frontend::source::source_nodes::{DeclId, ExprId, ExprKind, SourceAst};
use crate::til_frontend::til::til_nodes::SExprId;
use crate::til_frontend::til_errors::{TilError, TilLocation};

#[derive(Debug, Clone, Copy)]
pub struct CallingContext<'a> {
    /// Declaration the attribute is attached to
    pub attr_decl: DeclId,

    /// Receiver at the call site, if the callee is a method
    pub self_arg: Option<ExprId>,

    /// True when the receiver was reached through a pointer
    pub self_arrow: bool,

    /// Actual arguments at the call site, one per formal of `attr_decl`
    pub fun_args: Option<&'a [ExprId]>,

    /// The context the call site itself was translated in
    pub prev: Option<&'a CallingContext<'a>>,
}

impl<'a> CallingContext<'a> {
    pub fn new(
        ast: &SourceAst,
        attr_decl: DeclId,
        self_arg: Option<ExprId>,
        self_arrow: bool,
        fun_args: Option<&'a [ExprId]>,
        prev: Option<&'a CallingContext<'a>>,
    ) -> Result<Self, TilError> {
        let params = ast
            .function_params(ast.canonical_decl(attr_decl))
            .or_else(|| ast.function_params(attr_decl));

        if let (Some(args), Some(params)) = (fun_args, params) {
            if args.len() != params.len() {
                return_context_error!(
                    format!(
                        "{} takes {} argument(s) but the call site passes {}",
                        ast.decl_name(attr_decl),
                        params.len(),
                        args.len()
                    ),
                    TilLocation::default(),
                    {
                        CompilationStage => "Attribute Translation",
                        PrimarySuggestion => "Check that the call expression lists every argument of the annotated function",
                    }
                );
            }
        }

        Ok(CallingContext {
            attr_decl,
            self_arg,
            self_arrow,
            fun_args,
            prev,
        })
    }

    /// Frame for evaluating `attr_decl`'s attribute at the call expression `call`.
    ///
    /// Plain calls pass their arguments. Member calls also pass the object they are called on.
    /// Member operator calls carry the receiver as their first argument.
    pub fn from_call(
        ast: &'a SourceAst,
        call: ExprId,
        attr_decl: DeclId,
        prev: Option<&'a CallingContext<'a>>,
    ) -> Result<Self, TilError> {
        let location = TilLocation::at_expr(call);

        match ast.expr_kind(call) {
            Some(ExprKind::Call { args, .. }) => {
                CallingContext::new(ast, attr_decl, None, false, Some(args.as_slice()), prev)
                    .map_err(|error| at(error, location))
            }

            Some(ExprKind::MemberCall { callee, args }) => {
                let callee = ast.ignore_parens_and_transparent_casts(*callee);
                let (self_arg, self_arrow) = match ast.expr_kind(callee) {
                    Some(ExprKind::Member { base, arrow, .. }) => (Some(*base), *arrow),
                    _ => (None, false),
                };

                CallingContext::new(
                    ast,
                    attr_decl,
                    self_arg,
                    self_arrow,
                    Some(args.as_slice()),
                    prev,
                )
                .map_err(|error| at(error, location))
            }

            Some(ExprKind::OperatorCall { args, .. }) if ast.is_method(ast.canonical_decl(attr_decl)) => {
                let Some((receiver, rest)) = args.split_first() else {
                    return_context_error!(
                        "Member operator call has no receiver argument",
                        location
                    );
                };

                CallingContext::new(ast, attr_decl, Some(*receiver), false, Some(rest), prev)
                    .map_err(|error| at(error, location))
            }

            Some(ExprKind::OperatorCall { args, .. }) => {
                CallingContext::new(ast, attr_decl, None, false, Some(args.as_slice()), prev)
                    .map_err(|error| at(error, location))
            }

            _ => return_context_error!(
                format!("{call} is not a call expression"),
                location
            ),
        }
    }

    /// Number of frames in the chain, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.prev;
        while let Some(frame) = current {
            depth += 1;
            current = frame.prev;
        }
        depth
    }

    /// Actual argument for the formal at `index`, if this frame carries arguments.
    pub fn arg(&self, index: usize) -> Option<ExprId> {
        self.fun_args?.get(index).copied()
    }
}

fn at(mut error: TilError, location: TilLocation) -> TilError {
    if error.location.expr.is_none() {
        error.location.expr = location.expr;
    }
    error
}

// ----------------------------
//   Attribute Translation
// ----------------------------

impl<'a> SExprBuilder<'a> {
    /// Translates an attribute expression in capability mode.
    /// Annotated callees inside it are substituted instead of being emitted as calls.
    pub fn translate_attr_expr(
        &mut self,
        attr: ExprId,
        ctx: Option<&CallingContext<'_>>,
    ) -> SExprId {
        let saved = self.capability_mode;
        self.capability_mode = true;
        let value = self.translate(attr, ctx);
        self.capability_mode = saved;
        value
    }

    /// Translates `attr`, written in the scope of `attr_decl`, as if it were inlined at `call`.
    ///
    /// `prev` is the context the call site itself is being translated in, if any.
    pub fn translate_attr_at_call(
        &mut self,
        call: ExprId,
        attr_decl: DeclId,
        attr: ExprId,
        prev: Option<&CallingContext<'_>>,
    ) -> Result<SExprId, TilError> {
        let ast = self.ast;
        let ctx = CallingContext::from_call(ast, call, attr_decl, prev)?;
        Ok(self.translate_attr_expr(attr, Some(&ctx)))
    }
}
