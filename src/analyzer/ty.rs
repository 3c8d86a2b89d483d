use std::fmt;

use crate::ast::{AstError, Node, NodeKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    Integer,
    Real,
    Boolean,
    String,
    Array {
        elem: Box<Ty>,
        lower: i64,
        upper: i64,
    },
    /// Stands in for a value whose type could not be computed. Compatible
    /// with everything so one fault is reported once.
    Error,
}

impl Ty {
    pub fn from_name(name: &str) -> Option<Ty> {
        match name.to_ascii_lowercase().as_str() {
            "integer" => Some(Ty::Integer),
            "real" => Some(Ty::Real),
            "boolean" => Some(Ty::Boolean),
            "string" => Some(Ty::String),
            _ => None,
        }
    }

    /// `expected` accepts `self`: identical types, anything involving
    /// `Error`, and integer widening to real. Not symmetric.
    pub fn is_compatible(expected: &Ty, actual: &Ty) -> bool {
        match (expected, actual) {
            (Ty::Error, _) | (_, Ty::Error) => true,
            (e, a) if e == a => true,
            (Ty::Real, Ty::Integer) => true,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Integer | Ty::Real)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    pub fn get_inner(&self) -> Option<&Ty> {
        match self {
            Ty::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Number of storage slots a variable of this type occupies.
    pub fn slots(&self) -> i64 {
        match self {
            Ty::Array { lower, upper, .. } => {
                upper.saturating_sub(*lower).saturating_add(1).max(0)
            }
            _ => 1,
        }
    }

    /// First array range that is inverted or whose length does not fit an
    /// `i64`, searching element types too.
    pub fn invalid_range(&self) -> Option<(i64, i64)> {
        match self {
            Ty::Array { elem, lower, upper } => {
                let len = upper.checked_sub(*lower).and_then(|n| n.checked_add(1));
                if lower > upper || len.is_none() {
                    Some((*lower, *upper))
                } else {
                    elem.invalid_range()
                }
            }
            _ => None,
        }
    }

    pub fn lower_bound(&self) -> i64 {
        match self {
            Ty::Array { lower, .. } => *lower,
            _ => 0,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Integer => write!(f, "integer"),
            Ty::Real => write!(f, "real"),
            Ty::Boolean => write!(f, "boolean"),
            Ty::String => write!(f, "string"),
            Ty::Array { elem, lower, upper } => write!(f, "array[{lower}..{upper}] of {elem}"),
            Ty::Error => write!(f, "error"),
        }
    }
}

/// `Ok(None)` when the node names a type the language does not have.
pub fn type_of_node(node: &Node) -> Result<Option<Ty>, AstError> {
    match node.kind {
        NodeKind::BasicType => Ok(Ty::from_name(node.name()?)),
        NodeKind::ArrayType => {
            let (lower, upper) = node.range()?;
            let Some(elem) = type_of_node(node.child(0)?)? else {
                return Ok(None);
            };
            Ok(Some(Ty::Array {
                elem: Box::new(elem),
                lower,
                upper,
            }))
        }
        k => Err(AstError::UnexpectedKind(k)),
    }
}
