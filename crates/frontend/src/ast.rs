use tools::errors::Position;

// Closed AST produced by the parser and walked by the evaluator. Every node
// carries the position of its first token so diagnostics can point at it.

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub declarations: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StatementKind,
    pub pos: Position,
}

impl Stmt {
    pub fn new(kind: StatementKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExpressionKind,
    pub pos: Position,
}

impl Expr {
    pub fn new(kind: ExpressionKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

/// Type as written in the source. Array sizes stay expressions, they are
/// only known once evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Int32,
    Float32,
    Bool,
    String,
    Rune,
    Array { size: Box<Expr>, elem: Box<TypeExpr> },
    Pointer(Box<TypeExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// `=` or one of the compound forms, which carry the arithmetic operator
/// they apply before storing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    // Literals. String and rune literals keep their raw source text between
    // the quotes, escapes are decoded at evaluation.
    IntLiteral(String),
    FloatLiteral(String),
    StringLiteral(String),
    RuneLiteral(String),
    BoolLiteral(bool),
    NilLiteral,

    Identifier(String),

    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    Logical {
        lhs: Box<Expr>,
        op: LogicalOp,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    // Pointers
    AddressOf(String),
    Deref(Box<Expr>),

    // Qualified callees such as `fmt.Println` are kept as a dotted name
    Call {
        callee: String,
        args: Vec<Expr>,
    },

    // Arrays
    Index {
        name: String,
        indices: Vec<Expr>,
    },
    ArrayLiteral {
        ty: TypeExpr,
        elements: Vec<Expr>,
    },
    // Nested `{...}` inside an array literal
    CompositeList(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Identifier(String),
    Deref(String),
    Index { name: String, indices: Vec<Expr> },
}

impl AssignTarget {
    pub fn name(&self) -> &str {
        match self {
            AssignTarget::Identifier(name)
            | AssignTarget::Deref(name)
            | AssignTarget::Index { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub pos: Position,
}

impl Param {
    // A parameter whose declared type starts with `*` receives the caller's
    // pointer as is
    pub fn by_pointer(&self) -> bool {
        matches!(self.ty, TypeExpr::Pointer(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDeclaration {
    pub name: String,
    pub params: Vec<Param>,
    pub return_types: Vec<TypeExpr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    // Each name keeps its own position for the symbol table
    VarDeclaration {
        names: Vec<(String, Position)>,
        var_type: Option<TypeExpr>,
        values: Vec<Expr>,
    },
    ConstDeclaration {
        name: String,
        var_type: Option<TypeExpr>,
        value: Expr,
    },
    ShortVarDeclaration {
        names: Vec<(String, Position)>,
        values: Vec<Expr>,
    },
    Assignment {
        target: AssignTarget,
        op: AssignOp,
        value: Expr,
    },
    IncDec {
        target: AssignTarget,
        op: IncDecOp,
    },
    Expression(Expr),
    Block(Vec<Stmt>),
    If {
        branches: Vec<IfBranch>,
        else_block: Option<Vec<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },
    Break,
    Continue,
    Return(Vec<Expr>),
    FnDeclaration(FnDeclaration),
}
