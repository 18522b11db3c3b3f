//! Node kinds of the Tarn syntax tree.
//!
//! Two closed enumerations describe the tree roles: [`ExprKind`] for
//! expressions and [`TypeKind`] for type annotations. Payloads that the
//! pretty-printer needs to reproduce literal text (operator spelling,
//! numeric base, decoded string value) live on the variant; structural
//! parts (operands, bodies, annotations) are children.

use tarn_common::Token;

/// The kind of a constant literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstKind {
    /// The `()` literal.
    Nothing,
    Boolean,
    /// A numeric literal written in the given base.
    Number { base: u32 },
    String,
    /// A message name, e.g. `.length` or the `+` in a desugared `a + b`.
    Symbol,
}

/// A constant literal: its kind and its decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub kind: ConstKind,
    pub value: String,
}

impl Constant {
    pub fn nothing() -> Self {
        Constant {
            kind: ConstKind::Nothing,
            value: String::new(),
        }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Constant {
            kind: ConstKind::Symbol,
            value: name.into(),
        }
    }
}

/// Short-circuiting boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn from_op(op: &str) -> Option<LogicOp> {
        match op {
            "and" => Some(LogicOp::And),
            "or" => Some(LogicOp::Or),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
        }
    }
}

/// Expression node kinds.
///
/// Child layout per kind (token children omitted):
///
/// | kind | expression children | type children |
/// |---|---|---|
/// | `Function` | body | input if `input`, then output if `output` |
/// | `StructField` | value | |
/// | `Unary`, `Nested`, `New`, `Repeat`, `Assignment` | operand | |
/// | `Call` | receiver, message | |
/// | `Binary`, `Logic` | lhs, rhs | |
/// | `If` | condition, then, else? | |
/// | `While` | condition, body | |
/// | `Return`, `Break` | value? | |
/// | `Local` | value | annotation? |
/// | `Locals` | locals | |
/// | `On` | body | input, output? |
/// | `Array`, `Struct`, `Block` | items | |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Constant(Constant),
    Reference { name: String },
    Array,
    Function { input: bool, output: bool },
    StructField { name: Option<String> },
    Struct,
    Nested,
    New,
    Unary { op: String },
    Call,
    Binary { op: String },
    Logic { op: LogicOp },
    If,
    Repeat,
    While,
    Assignment { name: String },
    Return,
    Break,
    Local { name: String, mutable: bool },
    Locals,
    On,
    Block,
}

impl ExprKind {
    /// Human-readable shape tag.
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Constant(_) => "constant",
            ExprKind::Reference { .. } => "reference",
            ExprKind::Array => "array",
            ExprKind::Function { .. } => "function",
            ExprKind::StructField { .. } => "struct-field",
            ExprKind::Struct => "struct",
            ExprKind::Nested => "nested",
            ExprKind::New => "new",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Call => "call",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Logic { .. } => "logic",
            ExprKind::If => "if",
            ExprKind::Repeat => "repeat",
            ExprKind::While => "while",
            ExprKind::Assignment { .. } => "assignment",
            ExprKind::Return => "return",
            ExprKind::Break => "break",
            ExprKind::Local { .. } => "local",
            ExprKind::Locals => "locals",
            ExprKind::On => "on",
            ExprKind::Block => "block",
        }
    }

    /// Surface forms that the desugar pass removes.
    pub fn is_surface_only(&self) -> bool {
        matches!(
            self,
            ExprKind::Function { .. }
                | ExprKind::Unary { .. }
                | ExprKind::Binary { .. }
                | ExprKind::While
        )
    }
}

/// Type node kinds.
///
/// | kind | children |
/// |---|---|
/// | `TypedField` | field type, default value expression? |
/// | `Compound` | typed fields |
/// | `Template` | type arguments |
/// | `FunctionType` | argument, result |
/// | `NestedType` | inner |
/// | `MergedType` | alternatives |
/// | `InlineDeclaration` | guard (when `symbol` is `None`), result |
/// | `InlineType` | inline declarations |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// `()`, the empty argument type.
    Empty,
    Simple { name: String },
    TypedField { name: Option<String> },
    Compound,
    Template { name: String },
    /// `$Name`; the stored name excludes the `$`.
    Parameter { name: String },
    FunctionType,
    NestedType,
    MergedType,
    InlineDeclaration { symbol: Option<String> },
    InlineType,
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Empty => "empty",
            TypeKind::Simple { .. } => "simple",
            TypeKind::TypedField { .. } => "typed-field",
            TypeKind::Compound => "compound",
            TypeKind::Template { .. } => "template",
            TypeKind::Parameter { .. } => "parameter",
            TypeKind::FunctionType => "function-type",
            TypeKind::NestedType => "nested-type",
            TypeKind::MergedType => "merged-type",
            TypeKind::InlineDeclaration { .. } => "inline-declaration",
            TypeKind::InlineType => "inline-type",
        }
    }
}

/// What a tree node is: a source token leaf, an expression, or a type.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Token(Token),
    Expr(ExprKind),
    Type(TypeKind),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Token(_) => "token",
            NodeKind::Expr(kind) => kind.name(),
            NodeKind::Type(kind) => kind.name(),
        }
    }

    pub fn as_expr(&self) -> Option<&ExprKind> {
        match self {
            NodeKind::Expr(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeKind> {
        match self {
            NodeKind::Type(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            NodeKind::Token(token) => Some(token),
            _ => None,
        }
    }
}

impl From<ExprKind> for NodeKind {
    fn from(kind: ExprKind) -> Self {
        NodeKind::Expr(kind)
    }
}

impl From<TypeKind> for NodeKind {
    fn from(kind: TypeKind) -> Self {
        NodeKind::Type(kind)
    }
}
