use std::fmt;

use thiserror::Error;

use super::Ty;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SemanticError {
    #[error("'{0}' is already declared in this scope")]
    DuplicateDeclaration(String),
    #[error("'{0}' is not declared")]
    UndeclaredIdentifier(String),
    #[error("'{0}' is not indexable (neither an array nor a string)")]
    NotIndexable(String),
    #[error("type mismatch in {context}: expected '{expected}', found '{found}'")]
    TypeMismatch {
        context: String,
        expected: Ty,
        found: Ty,
    },
    #[error("'{name}' expects {expected} arguments, got {found}")]
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("condition of '{construct}' must be boolean, found '{found}'")]
    NonBooleanCondition { construct: &'static str, found: Ty },
    #[error("bounds of 'for' must be integers")]
    NonIntegerForBound,
    #[error("'{name}' is a {found}, not a {expected}")]
    WrongCallableKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("operator '{op}' requires numeric operands, found '{left}' and '{right}'")]
    NonNumericOperand { op: &'static str, left: Ty, right: Ty },
    #[error("operator '{0}' requires boolean operands")]
    NonBooleanOperand(&'static str),
    #[error("unary minus requires a number, found '{0}'")]
    NonNumericNegation(Ty),
    #[error("array index must be an integer, found '{0}'")]
    NonIntegerIndex(Ty),
    #[error("cannot read into a variable of type '{0}'")]
    InvalidReadTarget(Ty),
    #[error("invalid array range {lower}..{upper}")]
    InvalidRange { lower: i64, upper: i64 },
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("internal error during semantic analysis: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SemanticWarning {
    #[error("'{0}' may be used before being initialized")]
    UninitializedRead(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic<K> {
    pub line: Option<usize>,
    pub kind: K,
}

impl<K: fmt::Display> fmt::Display for Diagnostic<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[line {line}] {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Outcome of one analysis run. Errors and warnings keep discovery order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    pub errors: Vec<Diagnostic<SemanticError>>,
    pub warnings: Vec<Diagnostic<SemanticWarning>>,
}

impl Analysis {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
