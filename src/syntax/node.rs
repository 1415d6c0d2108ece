//! Raw syntax nodes produced by the parser.
//!
//! These carry only the shape of the source and position metadata; every
//! static or runtime semantic lives in [`crate::ast`].

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn to(self, end: Span) -> Span {
        Span { end: end.end, ..self }
    }
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Template { quasis: Vec<String>, expressions: Vec<Expr> },
    Boolean(bool),
    Null,
    Identifier(String),
    This,
    Array(Vec<Option<ArrayElement>>),
    Object(Vec<PropertyDefinition>),
    Function(Box<FunctionNode>),
    Arrow(Box<FunctionNode>),
    Class(Box<ClassNode>),
    Member { object: Box<Expr>, property: MemberProperty },
    SuperMember(MemberProperty),
    SuperCall(Vec<ArrayElement>),
    NewTarget,
    Call { callee: Box<Expr>, arguments: Vec<ArrayElement> },
    New { callee: Box<Expr>, arguments: Vec<ArrayElement> },
    Unary(UnaryOp, Box<Expr>),
    Update { op: UpdateOp, prefix: bool, argument: Box<Expr> },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign { op: AssignOp, target: Box<Pattern>, value: Box<Expr> },
    Sequence(Vec<Expr>),
    Paren(Box<Expr>),
}

/// An element of an array literal or an argument list.
#[derive(Clone, Debug)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Name(String),
    Computed(Box<Expr>),
}

#[derive(Clone, Debug)]
pub enum PropertyName {
    Identifier(String),
    String(String),
    Number(f64),
    Computed(Box<Expr>),
}

#[derive(Clone, Debug)]
pub enum PropertyDefinition {
    KeyValue(PropertyName, Expr),
    Shorthand(String, Span),
    /// `{ a = 1 }`: only valid once the literal is reinterpreted as an assignment pattern.
    CoverInitialized(String, Expr, Span),
    Method(MethodNode),
    Spread(Expr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
    Constructor,
}

#[derive(Clone, Debug)]
pub struct MethodNode {
    pub key: PropertyName,
    pub kind: MethodKind,
    pub is_static: bool,
    pub function: FunctionNode,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum FunctionBodyNode {
    Block(Vec<Statement>),
    /// Concise arrow body.
    Expression(Box<Expr>),
}

#[derive(Clone, Debug)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FunctionBodyNode,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ClassNode {
    pub name: Option<String>,
    pub heritage: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ClassMember {
    Method(MethodNode),
    Field {
        key: PropertyName,
        is_static: bool,
        value: Option<Expr>,
        span: Span,
    },
    Empty(Span),
}

#[derive(Clone, Debug)]
pub enum Pattern {
    Identifier(String, Span),
    Array {
        elements: Vec<Option<PatternElement>>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    Object {
        properties: Vec<PatternProperty>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    /// Member-expression targets, only valid in assignment patterns.
    Expr(Box<Expr>),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(_, span) | Pattern::Array { span, .. } | Pattern::Object { span, .. } => *span,
            Pattern::Expr(expr) => expr.span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PatternElement {
    pub target: Pattern,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct PatternProperty {
    pub key: PropertyName,
    pub value: PatternElement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Delete,
    Void,
    TypeOf,
    Plus,
    Minus,
    BitNot,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    InstanceOf,
    In,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Binary(BinaryOp),
    Logical(LogicalOp),
}

#[derive(Clone, Debug)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug)]
pub struct VariableDeclarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Variable(VariableKind, Vec<VariableDeclarator>),
    Expression(Expr),
}

#[derive(Clone, Debug)]
pub enum ForHead {
    Variable(VariableKind, Pattern),
    Pattern(Pattern),
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StatementKind {
    Variable(VariableKind, Vec<VariableDeclarator>),
    Function(FunctionNode),
    Class(ClassNode),
    Expression(Expr),
    Block(Vec<Statement>),
    Empty,
    Debugger,
    If(Expr, Box<Statement>, Option<Box<Statement>>),
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Statement>,
    },
    ForIn(ForHead, Expr, Box<Statement>),
    ForOf(ForHead, Expr, Box<Statement>),
    While(Expr, Box<Statement>),
    DoWhile(Box<Statement>, Expr),
    Switch(Expr, Vec<SwitchCase>),
    Break(Option<String>),
    Continue(Option<String>),
    Labeled(String, Box<Statement>),
    Return(Option<Expr>),
    Throw(Expr),
    Try {
        block: Vec<Statement>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Statement>>,
    },
    Import(ImportDeclaration),
    Export(ExportDeclaration),
}

#[derive(Clone, Debug)]
pub enum ImportSpecifier {
    Default(String),
    Namespace(String),
    Named { imported: String, local: String },
}

#[derive(Clone, Debug)]
pub struct ImportDeclaration {
    pub specifiers: Vec<ImportSpecifier>,
    pub module: String,
}

#[derive(Clone, Debug)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

#[derive(Clone, Debug)]
pub enum ExportDeclaration {
    Named { specifiers: Vec<ExportSpecifier>, from: Option<String> },
    All { alias: Option<String>, from: String },
    Declaration(Box<Statement>),
    DefaultFunction(FunctionNode),
    DefaultClass(ClassNode),
    DefaultExpression(Expr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    Script,
    Module,
}

/// Parser output for one source file.
#[derive(Clone, Debug)]
pub struct Program {
    pub goal: Goal,
    pub body: Vec<Statement>,
    pub span: Span,
}
