use phf::phf_map;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static BINARY_OPERATORS: phf::Map<&'static str, BinOpKind> = phf_map! {
    "+" => BinOpKind::Add,
    "-" => BinOpKind::Sub,
    "*" => BinOpKind::Mul,
    "/" => BinOpKind::Slash,
    "DIV" => BinOpKind::Div,
    "MOD" => BinOpKind::Mod,
    "=" => BinOpKind::Equal,
    "<>" => BinOpKind::NotEqual,
    "<" => BinOpKind::LessThan,
    ">" => BinOpKind::GreaterThan,
    "<=" => BinOpKind::LessEqual,
    ">=" => BinOpKind::GreaterEqual,
    "AND" => BinOpKind::And,
    "OR" => BinOpKind::Or,
};

static UNARY_OPERATORS: phf::Map<&'static str, UnaryOpKind> = phf_map! {
    "NOT" => UnaryOpKind::Not,
    "MINUS" => UnaryOpKind::Neg,
    "-" => UnaryOpKind::Neg,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Program,
    Block,
    Declarations,
    Declaration,
    IdList,
    Identifier,
    BasicType,
    ArrayType,
    FunctionDeclarations,
    ProcedureDeclaration,
    FunctionDeclaration,
    FormalParameters,
    Parameter,
    CompoundStatement,
    StatementList,
    AssignmentStatement,
    IfStatement,
    WhileStatement,
    ForStatement,
    ReadStatement,
    WriteStatement,
    ProcedureCall,
    FunctionCall,
    ArgList,
    VariableAccess,
    ArrayAccess,
    BinaryOp,
    UnaryOp,
    IntegerConstant,
    RealConstant,
    StringConstant,
    BooleanConstant,
    Empty,
}

/// Scalar payload attached to a node: names, operator tokens, constant
/// values and array bounds all travel here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    Range(i64, i64),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum AstError {
    #[error("{kind:?} node is missing child {index}")]
    MissingChild { kind: NodeKind, index: usize },
    #[error("{0:?} node carries no usable literal")]
    MissingLiteral(NodeKind),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("unexpected {0:?} node")]
    UnexpectedKind(NodeKind),
}

/// A node of the tree handed over by the parser.
///
/// Children order is fixed per kind:
///
/// ```text
/// Program              = Block
/// Block                = Declarations? FunctionDeclarations? CompoundStatement   (by kind)
/// Declaration          = (IdList | Identifier) type
/// ArrayType[lo, hi]    = type
/// ProcedureDeclaration = (FormalParameters | Empty) Empty body?
/// FunctionDeclaration  = (FormalParameters | Empty) type body?
/// Parameter            = (IdList | Identifier) type
/// AssignmentStatement  = (VariableAccess | ArrayAccess) expr
/// IfStatement          = cond then else?
/// WhileStatement       = cond body
/// ForStatement[to]     = (VariableAccess | Identifier) start end body
/// FunctionCall[name]   = ArgList?
/// ArrayAccess[name]    = index
/// BinaryOp[op]         = left right
/// UnaryOp[op]          = operand
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Slash,
    Div,
    Mod,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl BinOpKind {
    pub fn parse(token: &str) -> Result<Self, AstError> {
        BINARY_OPERATORS
            .get(token.to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| AstError::UnknownOperator(token.to_string()))
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOpKind::Add
                | BinOpKind::Sub
                | BinOpKind::Mul
                | BinOpKind::Slash
                | BinOpKind::Div
                | BinOpKind::Mod
        )
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOpKind::Equal
                | BinOpKind::NotEqual
                | BinOpKind::LessThan
                | BinOpKind::GreaterThan
                | BinOpKind::LessEqual
                | BinOpKind::GreaterEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOpKind::And | BinOpKind::Or)
    }

    pub fn token(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Slash => "/",
            BinOpKind::Div => "DIV",
            BinOpKind::Mod => "MOD",
            BinOpKind::Equal => "=",
            BinOpKind::NotEqual => "<>",
            BinOpKind::LessThan => "<",
            BinOpKind::GreaterThan => ">",
            BinOpKind::LessEqual => "<=",
            BinOpKind::GreaterEqual => ">=",
            BinOpKind::And => "AND",
            BinOpKind::Or => "OR",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    Neg,
}

impl UnaryOpKind {
    pub fn parse(token: &str) -> Result<Self, AstError> {
        UNARY_OPERATORS
            .get(token.to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| AstError::UnknownOperator(token.to_string()))
    }
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            literal: None,
            line: None,
        }
    }

    pub fn leaf(kind: NodeKind, literal: Literal) -> Self {
        Self {
            kind,
            children: vec![],
            literal: Some(literal),
            line: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(NodeKind::Empty, vec![])
    }

    pub fn new_number(num: i64) -> Self {
        Self::leaf(NodeKind::IntegerConstant, Literal::Int(num))
    }

    pub fn new_boolean(value: bool) -> Self {
        Self::leaf(NodeKind::BooleanConstant, Literal::Bool(value))
    }

    pub fn new_string(s: &str) -> Self {
        Self::leaf(NodeKind::StringConstant, Literal::Str(s.to_string()))
    }

    pub fn new_ident(kind: NodeKind, name: &str) -> Self {
        Self::leaf(kind, Literal::Str(name.to_string()))
    }

    pub fn new_binary(op: &str, left: Node, right: Node) -> Self {
        Self::new(NodeKind::BinaryOp, vec![left, right]).with_literal(Literal::Str(op.to_string()))
    }

    pub fn new_unary(op: &str, operand: Node) -> Self {
        Self::new(NodeKind::UnaryOp, vec![operand]).with_literal(Literal::Str(op.to_string()))
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn child(&self, index: usize) -> Result<&Node, AstError> {
        self.children.get(index).ok_or(AstError::MissingChild {
            kind: self.kind,
            index,
        })
    }

    pub fn find_child(&self, kind: NodeKind) -> Option<&Node> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn name(&self) -> Result<&str, AstError> {
        match &self.literal {
            Some(Literal::Str(s)) => Ok(s),
            _ => Err(AstError::MissingLiteral(self.kind)),
        }
    }

    pub fn int_value(&self) -> Result<i64, AstError> {
        match self.literal {
            Some(Literal::Int(n)) => Ok(n),
            _ => Err(AstError::MissingLiteral(self.kind)),
        }
    }

    /// Boolean literals also come through as the strings `true`/`false`.
    pub fn bool_value(&self) -> Result<bool, AstError> {
        match &self.literal {
            Some(Literal::Bool(b)) => Ok(*b),
            Some(Literal::Str(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(Literal::Str(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(AstError::MissingLiteral(self.kind)),
        }
    }

    pub fn range(&self) -> Result<(i64, i64), AstError> {
        match self.literal {
            Some(Literal::Range(lo, hi)) => Ok((lo, hi)),
            _ => Err(AstError::MissingLiteral(self.kind)),
        }
    }

    pub fn bin_op(&self) -> Result<BinOpKind, AstError> {
        BinOpKind::parse(self.name()?)
    }

    pub fn unary_op(&self) -> Result<UnaryOpKind, AstError> {
        UnaryOpKind::parse(self.name()?)
    }

    /// Identifier nodes of a declaration's name list, which may be a flat
    /// `IdList` or a lone `Identifier`.
    pub fn identifiers(&self) -> &[Node] {
        if self.kind == NodeKind::IdList {
            &self.children
        } else {
            std::slice::from_ref(self)
        }
    }

    /// Argument expressions of a call, empty when there is no `ArgList`.
    pub fn args(&self) -> &[Node] {
        match self.children.first() {
            Some(list) if list.kind == NodeKind::ArgList => &list.children,
            _ => &[],
        }
    }

    pub fn is_integer_constant(&self) -> bool {
        self.kind == NodeKind::IntegerConstant && matches!(self.literal, Some(Literal::Int(_)))
    }
}
