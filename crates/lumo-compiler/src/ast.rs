//! Syntax tree consumed by the compiler
//!
//! The tree is produced by an external parser. Its JSON form follows luaparse:
//! every node is an object tagged by `type`, with an optional `loc` span. Node
//! kinds the parser can produce but the compiler has no lowering rule for are
//! still modelled (as [`Unsupported`] payloads) so they are rejected with a
//! proper diagnostic instead of failing deserialization.

use std::fmt;

use serde::Deserialize;

/// Line/column position (1-based lines, 0-based columns, as luaparse reports them)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

/// Source span of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Location {
    /// Start of the node
    pub start: Position,
    /// End of the node
    pub end: Position,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// Root of a parsed source file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chunk {
    /// Top-level statements
    pub body: Vec<Statement>,
}

impl Chunk {
    /// Create a chunk from its statements
    pub fn new(body: Vec<Statement>) -> Self {
        Self { body }
    }

    /// Parse a luaparse JSON document
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A name
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Identifier {
    /// The name
    pub name: String,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

impl Identifier {
    /// Create an identifier without a source span
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loc: None,
        }
    }
}

/// Payload of a node kind that has no lowering rule
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Unsupported {
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

// ==================== Statements ====================

/// A statement
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    /// `local a, b = x, y`
    #[serde(rename = "LocalStatement")]
    Local(LocalStatement),
    /// `a, b.c = x, y`
    #[serde(rename = "AssignmentStatement")]
    Assignment(AssignmentStatement),
    /// `f(x)` in statement position
    #[serde(rename = "CallStatement")]
    Call(CallStatement),
    /// `if ... then ... elseif ... else ... end`
    #[serde(rename = "IfStatement")]
    If(IfStatement),
    /// `while cond do ... end`
    #[serde(rename = "WhileStatement")]
    While(WhileStatement),
    /// `break`
    #[serde(rename = "BreakStatement")]
    Break(BreakStatement),

    /// `function f() ... end`
    #[serde(rename = "FunctionDeclaration")]
    Function(Unsupported),
    /// `for i = a, b do ... end`
    #[serde(rename = "ForNumericStatement")]
    NumericFor(Unsupported),
    /// `for k, v in it do ... end`
    #[serde(rename = "ForGenericStatement")]
    GenericFor(Unsupported),
    /// `repeat ... until cond`
    #[serde(rename = "RepeatStatement")]
    Repeat(Unsupported),
    /// `do ... end`
    #[serde(rename = "DoStatement")]
    Do(Unsupported),
    /// `return ...`
    #[serde(rename = "ReturnStatement")]
    Return(Unsupported),
    /// `goto name`
    #[serde(rename = "GotoStatement")]
    Goto(Unsupported),
    /// `::name::`
    #[serde(rename = "LabelStatement")]
    Label(Unsupported),
}

impl Statement {
    /// Node kind as the parser names it
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "LocalStatement",
            Self::Assignment(_) => "AssignmentStatement",
            Self::Call(_) => "CallStatement",
            Self::If(_) => "IfStatement",
            Self::While(_) => "WhileStatement",
            Self::Break(_) => "BreakStatement",
            Self::Function(_) => "FunctionDeclaration",
            Self::NumericFor(_) => "ForNumericStatement",
            Self::GenericFor(_) => "ForGenericStatement",
            Self::Repeat(_) => "RepeatStatement",
            Self::Do(_) => "DoStatement",
            Self::Return(_) => "ReturnStatement",
            Self::Goto(_) => "GotoStatement",
            Self::Label(_) => "LabelStatement",
        }
    }

    /// Source span, if the parser recorded one
    pub fn loc(&self) -> Option<Location> {
        match self {
            Self::Local(s) => s.loc,
            Self::Assignment(s) => s.loc,
            Self::Call(s) => s.loc,
            Self::If(s) => s.loc,
            Self::While(s) => s.loc,
            Self::Break(s) => s.loc,
            Self::Function(u)
            | Self::NumericFor(u)
            | Self::GenericFor(u)
            | Self::Repeat(u)
            | Self::Do(u)
            | Self::Return(u)
            | Self::Goto(u)
            | Self::Label(u) => u.loc,
        }
    }

    /// `local names... = init...`
    pub fn local(names: &[&str], init: Vec<Expression>) -> Self {
        Self::Local(LocalStatement {
            variables: names.iter().map(|name| Identifier::new(*name)).collect(),
            init,
            loc: None,
        })
    }

    /// `targets... = init...`
    pub fn assign(variables: Vec<Expression>, init: Vec<Expression>) -> Self {
        Self::Assignment(AssignmentStatement {
            variables,
            init,
            loc: None,
        })
    }

    /// Call in statement position
    pub fn call(expression: Expression) -> Self {
        Self::Call(CallStatement {
            expression,
            loc: None,
        })
    }

    /// `while condition do body end`
    pub fn while_loop(condition: Expression, body: Vec<Statement>) -> Self {
        Self::While(WhileStatement {
            condition,
            body,
            loc: None,
        })
    }

    /// `if` statement from its clauses
    pub fn if_chain(clauses: Vec<Clause>) -> Self {
        Self::If(IfStatement { clauses, loc: None })
    }

    /// `break`
    pub fn break_loop() -> Self {
        Self::Break(BreakStatement { loc: None })
    }
}

/// `local` declaration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalStatement {
    /// Declared names
    pub variables: Vec<Identifier>,
    /// Initializers, paired with `variables` by index
    #[serde(default)]
    pub init: Vec<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// Assignment to names or table fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssignmentStatement {
    /// Assignment targets
    pub variables: Vec<Expression>,
    /// Values, paired with `variables` by index
    pub init: Vec<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// Call whose result is discarded
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallStatement {
    /// The call expression
    pub expression: Expression,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `if` statement
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IfStatement {
    /// Clauses in source order; an else clause, if any, comes last
    pub clauses: Vec<Clause>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// One branch of an `if` statement
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Clause {
    /// Leading `if cond then`
    #[serde(rename = "IfClause")]
    If(ConditionalClause),
    /// `elseif cond then`
    #[serde(rename = "ElseifClause")]
    ElseIf(ConditionalClause),
    /// Trailing `else`
    #[serde(rename = "ElseClause")]
    Else(ElseClause),
}

impl Clause {
    /// `if condition then body`
    pub fn when(condition: Expression, body: Vec<Statement>) -> Self {
        Self::If(ConditionalClause {
            condition,
            body,
            loc: None,
        })
    }

    /// `elseif condition then body`
    pub fn or_when(condition: Expression, body: Vec<Statement>) -> Self {
        Self::ElseIf(ConditionalClause {
            condition,
            body,
            loc: None,
        })
    }

    /// `else body`
    pub fn otherwise(body: Vec<Statement>) -> Self {
        Self::Else(ElseClause { body, loc: None })
    }

    /// Statements of this clause
    pub fn body(&self) -> &[Statement] {
        match self {
            Self::If(c) | Self::ElseIf(c) => &c.body,
            Self::Else(c) => &c.body,
        }
    }
}

/// Clause guarded by a condition
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionalClause {
    /// Guard
    pub condition: Expression,
    /// Statements
    pub body: Vec<Statement>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// Unconditional trailing clause
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElseClause {
    /// Statements
    pub body: Vec<Statement>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `while` loop
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WhileStatement {
    /// Loop condition
    pub condition: Expression,
    /// Loop body
    pub body: Vec<Statement>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `break`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BreakStatement {
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

// ==================== Expressions ====================

/// An expression
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    /// Variable reference
    Identifier(Identifier),
    /// Number literal
    NumericLiteral(NumericLiteral),
    /// String literal
    StringLiteral(StringLiteral),
    /// `true` / `false`
    BooleanLiteral(BooleanLiteral),
    /// `nil`
    NilLiteral(NilLiteral),
    /// `left op right`
    BinaryExpression(BinaryExpression),
    /// `f(a, b)`
    CallExpression(CallExpression),
    /// `f "text"`
    StringCallExpression(StringCallExpression),
    /// `f { ... }`
    TableCallExpression(TableCallExpression),
    /// `{ ... }`
    TableConstructorExpression(TableConstructor),
    /// `a.b`
    MemberExpression(MemberExpression),

    /// `function() ... end`
    #[serde(rename = "FunctionDeclaration")]
    Function(Unsupported),
    /// `...`
    VarargLiteral(Unsupported),
    /// `-x`, `not x`, `#x`
    UnaryExpression(Unsupported),
    /// `a and b`, `a or b`
    LogicalExpression(Unsupported),
    /// `a[k]`
    IndexExpression(Unsupported),
}

impl Expression {
    /// Node kind as the parser names it
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identifier(_) => "Identifier",
            Self::NumericLiteral(_) => "NumericLiteral",
            Self::StringLiteral(_) => "StringLiteral",
            Self::BooleanLiteral(_) => "BooleanLiteral",
            Self::NilLiteral(_) => "NilLiteral",
            Self::BinaryExpression(_) => "BinaryExpression",
            Self::CallExpression(_) => "CallExpression",
            Self::StringCallExpression(_) => "StringCallExpression",
            Self::TableCallExpression(_) => "TableCallExpression",
            Self::TableConstructorExpression(_) => "TableConstructorExpression",
            Self::MemberExpression(_) => "MemberExpression",
            Self::Function(_) => "FunctionDeclaration",
            Self::VarargLiteral(_) => "VarargLiteral",
            Self::UnaryExpression(_) => "UnaryExpression",
            Self::LogicalExpression(_) => "LogicalExpression",
            Self::IndexExpression(_) => "IndexExpression",
        }
    }

    /// Source span, if the parser recorded one
    pub fn loc(&self) -> Option<Location> {
        match self {
            Self::Identifier(e) => e.loc,
            Self::NumericLiteral(e) => e.loc,
            Self::StringLiteral(e) => e.loc,
            Self::BooleanLiteral(e) => e.loc,
            Self::NilLiteral(e) => e.loc,
            Self::BinaryExpression(e) => e.loc,
            Self::CallExpression(e) => e.loc,
            Self::StringCallExpression(e) => e.loc,
            Self::TableCallExpression(e) => e.loc,
            Self::TableConstructorExpression(e) => e.loc,
            Self::MemberExpression(e) => e.loc,
            Self::Function(u)
            | Self::VarargLiteral(u)
            | Self::UnaryExpression(u)
            | Self::LogicalExpression(u)
            | Self::IndexExpression(u) => u.loc,
        }
    }

    /// Variable reference
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(Identifier::new(name))
    }

    /// Number literal
    pub fn number(value: f64) -> Self {
        Self::NumericLiteral(NumericLiteral { value, loc: None })
    }

    /// String literal
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringLiteral(StringLiteral {
            value: value.into(),
            loc: None,
        })
    }

    /// Boolean literal
    pub fn boolean(value: bool) -> Self {
        Self::BooleanLiteral(BooleanLiteral { value, loc: None })
    }

    /// `nil`
    pub fn nil() -> Self {
        Self::NilLiteral(NilLiteral { loc: None })
    }

    /// `left operator right`
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::BinaryExpression(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            loc: None,
        })
    }

    /// `base(arguments...)`
    pub fn call(base: Expression, arguments: Vec<Expression>) -> Self {
        Self::CallExpression(CallExpression {
            base: Box::new(base),
            arguments,
            loc: None,
        })
    }

    /// `base "argument"`
    pub fn string_call(base: Expression, argument: impl Into<String>) -> Self {
        Self::StringCallExpression(StringCallExpression {
            base: Box::new(base),
            argument: Box::new(Self::string(argument)),
            loc: None,
        })
    }

    /// `base.name`
    pub fn member(base: Expression, name: impl Into<String>) -> Self {
        Self::MemberExpression(MemberExpression {
            indexer: Indexer::Dot,
            identifier: Identifier::new(name),
            base: Box::new(base),
            loc: None,
        })
    }

    /// `{ fields... }`
    pub fn table(fields: Vec<TableField>) -> Self {
        Self::TableConstructorExpression(TableConstructor { fields, loc: None })
    }
}

/// Number literal
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumericLiteral {
    /// Value
    pub value: f64,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// String literal
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StringLiteral {
    /// Decoded value
    pub value: String,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// Boolean literal
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BooleanLiteral {
    /// Value
    pub value: bool,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `nil`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NilLiteral {
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// Binary operators the parser can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BinaryOperator {
    /// `+`
    #[serde(rename = "+")]
    Add,
    /// `-`
    #[serde(rename = "-")]
    Sub,
    /// `*`
    #[serde(rename = "*")]
    Mul,
    /// `/`
    #[serde(rename = "/")]
    Div,
    /// `^`
    #[serde(rename = "^")]
    Pow,
    /// `%`
    #[serde(rename = "%")]
    Mod,
    /// `==`
    #[serde(rename = "==")]
    Eq,
    /// `~=`
    #[serde(rename = "~=")]
    Ne,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `..`
    #[serde(rename = "..")]
    Concat,
    /// `//`
    #[serde(rename = "//")]
    FloorDiv,
    /// `&`
    #[serde(rename = "&")]
    BitAnd,
    /// `|`
    #[serde(rename = "|")]
    BitOr,
    /// `~`
    #[serde(rename = "~")]
    BitXor,
    /// `<<`
    #[serde(rename = "<<")]
    Shl,
    /// `>>`
    #[serde(rename = ">>")]
    Shr,
}

impl BinaryOperator {
    /// Source spelling
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "~=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Concat => "..",
            Self::FloorDiv => "//",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "~",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

/// `left operator right`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinaryExpression {
    /// Operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `base(arguments...)`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallExpression {
    /// Callee
    pub base: Box<Expression>,
    /// Arguments in source order
    pub arguments: Vec<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `base "argument"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StringCallExpression {
    /// Callee
    pub base: Box<Expression>,
    /// The single string argument
    pub argument: Box<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `base { ... }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableCallExpression {
    /// Callee
    pub base: Box<Expression>,
    /// The single table constructor argument (luaparse names it `arguments`)
    pub arguments: Box<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// `{ fields... }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableConstructor {
    /// Fields in source order
    pub fields: Vec<TableField>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}

/// One field of a table constructor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum TableField {
    /// `[key] = value`
    #[serde(rename = "TableKey")]
    Keyed {
        /// Key expression
        key: Expression,
        /// Value expression
        value: Expression,
    },
    /// `name = value`
    #[serde(rename = "TableKeyString")]
    Named {
        /// Field name
        key: Identifier,
        /// Value expression
        value: Expression,
    },
    /// positional `value`
    #[serde(rename = "TableValue")]
    Positional {
        /// Value expression
        value: Expression,
    },
}

impl TableField {
    /// `[key] = value`
    pub fn keyed(key: Expression, value: Expression) -> Self {
        Self::Keyed { key, value }
    }

    /// `name = value`
    pub fn named(name: impl Into<String>, value: Expression) -> Self {
        Self::Named {
            key: Identifier::new(name),
            value,
        }
    }

    /// positional `value`
    pub fn positional(value: Expression) -> Self {
        Self::Positional { value }
    }
}

/// Member access separator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Indexer {
    /// `a.b`
    #[default]
    #[serde(rename = ".")]
    Dot,
    /// `a:b` (method call sugar)
    #[serde(rename = ":")]
    Colon,
}

/// `base.identifier`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemberExpression {
    /// Separator used in source
    #[serde(default)]
    pub indexer: Indexer,
    /// Member name
    pub identifier: Identifier,
    /// Object being indexed
    pub base: Box<Expression>,
    /// Source span
    #[serde(default)]
    pub loc: Option<Location>,
}
