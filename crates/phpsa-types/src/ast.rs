//! AST node types consumed by the analyser.
//!
//! The tree is produced by an external parser; only the shapes the
//! inference engine and the rules look at are modelled here. Statement
//! bodies are walked by the driver and never reach the core, so closures
//! and methods carry their signatures only.
//!
//! Every expression carries a [`Span`] for diagnostics.
//! Large recursive types are boxed to keep enum sizes reasonable.

use serde::{Deserialize, Serialize};

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Names
// ══════════════════════════════════════════════════════════════════════════════

/// A variable name: `$foo` or `${expr}`.
#[derive(Debug, Clone, PartialEq)]
pub enum VarName {
    Named(String),
    Dynamic(Box<Expr>),
}

/// A class or function reference: a literal name (`Foo\Bar`, `self`,
/// `static`, `parent`, `strlen`) or an arbitrary expression (`$class`).
#[derive(Debug, Clone, PartialEq)]
pub enum NameRef {
    Named(String),
    Dynamic(Box<Expr>),
}

impl NameRef {
    /// The literal name, if this reference is not dynamic.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            NameRef::Named(name) => Some(name),
            NameRef::Dynamic(_) => None,
        }
    }
}

/// A member name after `->` or `::`: an identifier or `{$expr}`.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberName {
    Ident(String),
    Dynamic(Box<Expr>),
}

impl MemberName {
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            MemberName::Ident(name) => Some(name),
            MemberName::Dynamic(_) => None,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The variable name if this is a plain `$name` reference.
    pub fn as_variable_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(VarName::Named(name)) => Some(name),
            _ => None,
        }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Variables & literals ──
    /// `$name`
    Variable(VarName),
    /// `42`
    LNumber(i64),
    /// `3.14`
    DNumber(f64),
    /// `'hello'`
    String(String),
    /// `true`, `false`, `null`, `PHP_EOL`
    ConstFetch(String),
    /// `[1, 'a' => 2]`
    Array(Vec<ArrayItem>),

    // ── Operators ──
    /// `$a + $b`, `$a && $b`, ...
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `!$a`
    BooleanNot(Box<Expr>),
    /// `-$a`
    UnaryMinus(Box<Expr>),
    /// `+$a`
    UnaryPlus(Box<Expr>),
    /// `$a = $b`
    Assign { var: Box<Expr>, expr: Box<Expr> },
    /// `$a += $b`, `$a /= $b`, ...
    AssignOp {
        op: AssignOp,
        var: Box<Expr>,
        expr: Box<Expr>,
    },
    /// `(int) $a`
    Cast { kind: CastKind, expr: Box<Expr> },
    /// `$a instanceof Foo`
    Instanceof { expr: Box<Expr>, class: NameRef },

    // ── Objects & classes ──
    /// `new Foo($a)`
    New { class: NameRef, args: Vec<Arg> },
    /// `Foo::BAR`
    ClassConstFetch { class: NameRef, name: String },
    /// `$a->foo($b)`
    MethodCall {
        var: Box<Expr>,
        name: MemberName,
        args: Vec<Arg>,
    },
    /// `Foo::bar($b)`
    StaticCall {
        class: NameRef,
        name: MemberName,
        args: Vec<Arg>,
    },
    /// `$a->foo`
    PropertyFetch { var: Box<Expr>, name: MemberName },
    /// `Foo::$bar`
    StaticPropertyFetch { class: NameRef, name: MemberName },

    // ── Functions ──
    /// `foo($a)`
    FuncCall { name: NameRef, args: Vec<Arg> },
    /// `function ($a) use ($b) { ... }`
    Closure(Box<Closure>),
}

impl ExprKind {
    /// The node kind rules subscribe to.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            ExprKind::Variable(_) => NodeKind::Variable,
            ExprKind::LNumber(_) => NodeKind::LNumber,
            ExprKind::DNumber(_) => NodeKind::DNumber,
            ExprKind::String(_) => NodeKind::String,
            ExprKind::ConstFetch(_) => NodeKind::ConstFetch,
            ExprKind::Array(_) => NodeKind::Array,
            ExprKind::BinaryOp { .. } => NodeKind::BinaryOp,
            ExprKind::BooleanNot(_) => NodeKind::BooleanNot,
            ExprKind::UnaryMinus(_) => NodeKind::UnaryMinus,
            ExprKind::UnaryPlus(_) => NodeKind::UnaryPlus,
            ExprKind::Assign { .. } => NodeKind::Assign,
            ExprKind::AssignOp { .. } => NodeKind::AssignOp,
            ExprKind::Cast { .. } => NodeKind::Cast,
            ExprKind::Instanceof { .. } => NodeKind::Instanceof,
            ExprKind::New { .. } => NodeKind::New,
            ExprKind::ClassConstFetch { .. } => NodeKind::ClassConstFetch,
            ExprKind::MethodCall { .. } => NodeKind::MethodCall,
            ExprKind::StaticCall { .. } => NodeKind::StaticCall,
            ExprKind::PropertyFetch { .. } => NodeKind::PropertyFetch,
            ExprKind::StaticPropertyFetch { .. } => NodeKind::StaticPropertyFetch,
            ExprKind::FuncCall { .. } => NodeKind::FuncCall,
            ExprKind::Closure(_) => NodeKind::Closure,
        }
    }
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub value: Expr,
    pub by_ref: bool,
    /// `...$args`
    pub unpack: bool,
}

impl Arg {
    pub fn new(value: Expr) -> Self {
        Self {
            value,
            by_ref: false,
            unpack: false,
        }
    }

    pub fn unpacked(value: Expr) -> Self {
        Self {
            value,
            by_ref: false,
            unpack: true,
        }
    }
}

/// An entry of an array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
}

// ── Operators ────────────────────────────────────────────────────────────────

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Logical
    BooleanAnd,
    BooleanOr,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    // String
    Concat,
    // Comparison
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Smaller,
    SmallerOrEqual,
    Greater,
    GreaterOrEqual,
    Coalesce,
}

impl BinaryOp {
    /// Returns the operator as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::BooleanAnd => "&&",
            BinaryOp::BooleanOr => "||",
            BinaryOp::LogicalAnd => "and",
            BinaryOp::LogicalOr => "or",
            BinaryOp::LogicalXor => "xor",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Concat => ".",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Smaller => "<",
            BinaryOp::SmallerOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Coalesce => "??",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            BinaryOp::BooleanAnd
                | BinaryOp::BooleanOr
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr
                | BinaryOp::LogicalXor
        )
    }
}

/// Compound assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Plus => "+=",
            AssignOp::Minus => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::Pow => "**=",
            AssignOp::Concat => ".=",
        }
    }
}

/// Cast operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Double,
    String,
    Bool,
    Array,
    Object,
    Unset,
}

impl CastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CastKind::Int => "(int)",
            CastKind::Double => "(double)",
            CastKind::String => "(string)",
            CastKind::Bool => "(bool)",
            CastKind::Array => "(array)",
            CastKind::Object => "(object)",
            CastKind::Unset => "(unset)",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions & Methods
// ══════════════════════════════════════════════════════════════════════════════

/// A declared parameter type: `int`, `?Foo`, `self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHint {
    pub name: String,
    pub nullable: bool,
}

impl TypeHint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
        }
    }

    pub fn nullable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
        }
    }

    /// True for hints that never name a class.
    pub fn is_builtin(&self) -> bool {
        matches!(
            self.name.to_ascii_lowercase().as_str(),
            "int"
                | "float"
                | "string"
                | "bool"
                | "array"
                | "callable"
                | "iterable"
                | "void"
                | "object"
                | "mixed"
                | "self"
                | "static"
                | "parent"
        )
    }
}

/// A function, method or closure parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub by_ref: bool,
    pub variadic: bool,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
            by_ref: false,
            variadic: false,
            span,
        }
    }

    pub fn with_type(mut self, hint: TypeHint) -> Self {
        self.type_hint = Some(hint);
        self
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }

    /// True when the default value is the literal `null`.
    pub fn defaults_to_null(&self) -> bool {
        matches!(
            &self.default,
            Some(Expr { kind: ExprKind::ConstFetch(name), .. }) if name.eq_ignore_ascii_case("null")
        )
    }
}

/// `use ($a, &$b)` entry of a closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureUse {
    pub var: String,
    pub by_ref: bool,
}

/// `function (params) use (uses): ReturnType { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<Param>,
    pub uses: Vec<ClosureUse>,
    pub return_type: Option<TypeHint>,
    pub by_ref: bool,
    pub is_static: bool,
    pub span: Span,
}

/// Member visibility modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// A method declaration inside a class body.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

/// A node handed to rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Expr(&'a Expr),
    ClassMethod(&'a ClassMethod),
}

impl<'a> Node<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Expr(expr) => expr.kind.node_kind(),
            Node::ClassMethod(_) => NodeKind::ClassMethod,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Expr(expr) => expr.span,
            Node::ClassMethod(method) => method.span,
        }
    }

    pub fn as_expr(&self) -> Option<&'a Expr> {
        match self {
            Node::Expr(expr) => Some(expr),
            Node::ClassMethod(_) => None,
        }
    }
}

impl<'a> From<&'a Expr> for Node<'a> {
    fn from(expr: &'a Expr) -> Self {
        Node::Expr(expr)
    }
}

impl<'a> From<&'a ClassMethod> for Node<'a> {
    fn from(method: &'a ClassMethod) -> Self {
        Node::ClassMethod(method)
    }
}

/// Closed set of node kinds a rule can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Variable,
    LNumber,
    DNumber,
    String,
    ConstFetch,
    Array,
    BinaryOp,
    BooleanNot,
    UnaryMinus,
    UnaryPlus,
    Assign,
    AssignOp,
    Cast,
    Instanceof,
    New,
    ClassConstFetch,
    MethodCall,
    StaticCall,
    PropertyFetch,
    StaticPropertyFetch,
    FuncCall,
    Closure,
    ClassMethod,
}
