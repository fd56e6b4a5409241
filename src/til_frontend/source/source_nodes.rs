//! Read-only source model for one translation unit.
//!
//! Declarations and expression nodes are stored densely: the id of a node is its index in
//! `SourceAst::decls` / `SourceAst::exprs`. Producers either build the model through
//! `add_decl` / `add_expr` or deserialize it, in which case `validate` must pass before
//! anything walks it.

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================================
// IDs
// ==========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CfgBlockId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl CfgBlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for CfgBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

// ==========================================================
// Declarations
// ==========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub id: DeclId,

    #[serde(default)]
    pub name: Option<String>,

    pub kind: DeclKind,

    // Redeclarations point at the first declaration of the same entity
    #[serde(default)]
    pub canonical: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeclKind {
    Var,

    Param {
        function: DeclId,
        index: usize,
    },

    Field,

    Function {
        #[serde(default)]
        params: Vec<DeclId>,

        /// Expression of a "value returned under this lock" style attribute.
        /// Evaluated in the callee's scope, so it only makes sense under a calling context.
        #[serde(default)]
        returned: Option<ExprId>,

        #[serde(default)]
        is_method: bool,
    },

    Destructor,
}

// ==========================================================
// Expressions
// ==========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExprKind {
    DeclRef {
        decl: DeclId,
    },

    // Implicit receiver
    This,

    Member {
        base: ExprId,
        field: DeclId,
        #[serde(default)]
        arrow: bool,
    },

    Call {
        callee: ExprId,
        #[serde(default)]
        args: Vec<ExprId>,
    },

    // The callee is a Member expression whose base is the receiver
    MemberCall {
        callee: ExprId,
        #[serde(default)]
        args: Vec<ExprId>,
    },

    // Overloaded operator. For member operators args[0] is the receiver.
    OperatorCall {
        callee: ExprId,
        #[serde(default)]
        args: Vec<ExprId>,
        #[serde(default)]
        operator: String,
    },

    Unary {
        op: UnaryOpKind,
        operand: ExprId,
    },

    Binary {
        op: BinaryOpKind,
        lhs: ExprId,
        rhs: ExprId,
    },

    Cast {
        kind: CastKind,
        operand: ExprId,
    },

    ArraySubscript {
        base: ExprId,
        index: ExprId,
    },

    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },

    // `c ?: e`
    BinaryConditional {
        condition: ExprId,
        else_expr: ExprId,
    },

    DeclStmt {
        decls: Vec<DeclInit>,
    },

    Paren {
        inner: ExprId,
    },

    Literal {
        value: LiteralValue,
    },

    // Anything the source model has no structured form for
    Other {
        kind: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclInit {
    pub decl: DeclId,
    #[serde(default)]
    pub init: Option<ExprId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(value) => write!(f, "{value}"),
            LiteralValue::Float(value) => write!(f, "{value:?}"),
            LiteralValue::Bool(value) => write!(f, "{value}"),
            LiteralValue::Str(value) => write!(f, "{value:?}"),
            LiteralValue::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOpKind {
    Minus,
    Plus,
    Not,
    LNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOpKind::Minus => "-",
            UnaryOpKind::Plus => "+",
            UnaryOpKind::Not => "~",
            UnaryOpKind::LNot => "!",
            UnaryOpKind::Deref => "*",
            UnaryOpKind::AddrOf => "&",
            UnaryOpKind::PreInc | UnaryOpKind::PostInc => "++",
            UnaryOpKind::PreDec | UnaryOpKind::PostDec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LAnd,
    LOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    PtrMemD,
    PtrMemI,
    Comma,
}

impl BinaryOpKind {
    /// The plain operator behind a compound assignment (`+=` -> `+`).
    pub fn compound_base(self) -> Option<BinaryOpKind> {
        let base = match self {
            BinaryOpKind::AddAssign => BinaryOpKind::Add,
            BinaryOpKind::SubAssign => BinaryOpKind::Sub,
            BinaryOpKind::MulAssign => BinaryOpKind::Mul,
            BinaryOpKind::DivAssign => BinaryOpKind::Div,
            BinaryOpKind::RemAssign => BinaryOpKind::Rem,
            BinaryOpKind::ShlAssign => BinaryOpKind::Shl,
            BinaryOpKind::ShrAssign => BinaryOpKind::Shr,
            BinaryOpKind::AndAssign => BinaryOpKind::BitAnd,
            BinaryOpKind::XorAssign => BinaryOpKind::BitXor,
            BinaryOpKind::OrAssign => BinaryOpKind::BitOr,
            _ => return None,
        };
        Some(base)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOpKind::Add => "+",
            BinaryOpKind::Sub => "-",
            BinaryOpKind::Mul => "*",
            BinaryOpKind::Div => "/",
            BinaryOpKind::Rem => "%",
            BinaryOpKind::Shl => "<<",
            BinaryOpKind::Shr => ">>",
            BinaryOpKind::Lt => "<",
            BinaryOpKind::Gt => ">",
            BinaryOpKind::Le => "<=",
            BinaryOpKind::Ge => ">=",
            BinaryOpKind::Eq => "==",
            BinaryOpKind::Ne => "!=",
            BinaryOpKind::BitAnd => "&",
            BinaryOpKind::BitXor => "^",
            BinaryOpKind::BitOr => "|",
            BinaryOpKind::LAnd => "&&",
            BinaryOpKind::LOr => "||",
            BinaryOpKind::Assign => "=",
            BinaryOpKind::AddAssign => "+=",
            BinaryOpKind::SubAssign => "-=",
            BinaryOpKind::MulAssign => "*=",
            BinaryOpKind::DivAssign => "/=",
            BinaryOpKind::RemAssign => "%=",
            BinaryOpKind::ShlAssign => "<<=",
            BinaryOpKind::ShrAssign => ">>=",
            BinaryOpKind::AndAssign => "&=",
            BinaryOpKind::XorAssign => "^=",
            BinaryOpKind::OrAssign => "|=",
            BinaryOpKind::PtrMemD => ".*",
            BinaryOpKind::PtrMemI => "->*",
            BinaryOpKind::Comma => ",",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    LValueToRValue,
    NoOp,
    DerivedToBase,
    UncheckedDerivedToBase,
    ArrayToPointerDecay,
    FunctionToPointerDecay,
    IntegralCast,
    FloatingCast,
    IntegralToFloating,
    FloatingToIntegral,
    PointerToBoolean,
    IntegralToBoolean,
    BitCast,
    Other,
}

impl CastKind {
    // Casts that never change the value as far as the IR is concerned
    pub fn is_transparent(self) -> bool {
        matches!(
            self,
            CastKind::NoOp
                | CastKind::DerivedToBase
                | CastKind::UncheckedDerivedToBase
                | CastKind::ArrayToPointerDecay
                | CastKind::FunctionToPointerDecay
        )
    }
}

// ==========================================================
// Translation unit
// ==========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceAst {
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub exprs: Vec<Expr>,
}

impl SourceAst {
    pub fn new() -> Self {
        SourceAst::default()
    }

    pub fn add_decl(&mut self, name: Option<&str>, kind: DeclKind) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Decl {
            id,
            name: name.map(str::to_owned),
            kind,
            canonical: None,
        });
        id
    }

    pub fn add_expr(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { id, kind });
        id
    }

    pub fn decl(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.index())
    }

    pub fn decl_mut(&mut self, id: DeclId) -> Option<&mut Decl> {
        self.decls.get_mut(id.index())
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    pub fn expr_kind(&self, id: ExprId) -> Option<&ExprKind> {
        self.expr(id).map(|expr| &expr.kind)
    }

    /// Checks that every node sits at the index its id names.
    /// Deserialized units can be in any order, so the driver calls this before walking.
    pub fn validate(&self) -> Result<(), String> {
        for (index, decl) in self.decls.iter().enumerate() {
            if decl.id.index() != index {
                return Err(format!(
                    "declaration {} is stored at position {index}",
                    decl.id
                ));
            }
        }

        for (index, expr) in self.exprs.iter().enumerate() {
            if expr.id.index() != index {
                return Err(format!(
                    "expression {} is stored at position {index}",
                    expr.id
                ));
            }
        }

        Ok(())
    }

    /// Follows the canonical link once. Canonical declarations point at themselves.
    pub fn canonical_decl(&self, id: DeclId) -> DeclId {
        match self.decl(id).and_then(|decl| decl.canonical) {
            Some(canonical) => canonical,
            None => id,
        }
    }

    pub fn decl_name(&self, id: DeclId) -> String {
        match self.decl(id).and_then(|decl| decl.name.as_deref()) {
            Some(name) => name.to_owned(),
            None => id.to_string(),
        }
    }

    pub fn param_info(&self, id: DeclId) -> Option<(DeclId, usize)> {
        match self.decl(id)?.kind {
            DeclKind::Param { function, index } => Some((function, index)),
            _ => None,
        }
    }

    pub fn function_params(&self, id: DeclId) -> Option<&[DeclId]> {
        match &self.decl(id)?.kind {
            DeclKind::Function { params, .. } => Some(params),
            _ => None,
        }
    }

    pub fn returned_attr(&self, id: DeclId) -> Option<ExprId> {
        match self.decl(self.canonical_decl(id))?.kind {
            DeclKind::Function { returned, .. } => returned,
            _ => None,
        }
    }

    pub fn is_method(&self, id: DeclId) -> bool {
        matches!(
            self.decl(id).map(|decl| &decl.kind),
            Some(DeclKind::Function { is_method: true, .. })
        )
    }

    /// Skips parentheses and casts that do not change the value.
    pub fn ignore_parens_and_transparent_casts(&self, id: ExprId) -> ExprId {
        let mut current = id;

        // Bounded so a cyclic unit can't hang the caller
        for _ in 0..=self.exprs.len() {
            match self.expr_kind(current) {
                Some(ExprKind::Paren { inner }) => current = *inner,
                Some(ExprKind::Cast { kind, operand }) if kind.is_transparent() => {
                    current = *operand
                }
                _ => break,
            }
        }

        current
    }

    /// The declaration a call expression's callee names, if it names one directly.
    pub fn callee_decl(&self, callee: ExprId) -> Option<DeclId> {
        let callee = self.ignore_parens_and_transparent_casts(callee);
        match self.expr_kind(callee)? {
            ExprKind::DeclRef { decl } => Some(*decl),
            ExprKind::Member { field, .. } => Some(*field),
            _ => None,
        }
    }
}
