use std::fmt;

use crate::lexer::Position;
use crate::parser::TypeName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    String,
    /// Result of an expression whose error has already been reported.
    Error,
}

impl Ty {
    /// `Error` is compatible with every type so that one mistake is reported once.
    pub fn is_compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Error, _) | (_, Ty::Error) => true,
            (t1, t2) => t1 == t2,
        }
    }

    pub fn is_int_like(&self) -> bool {
        matches!(self, Ty::Int | Ty::Error)
    }
}

impl From<TypeName> for Ty {
    fn from(ty: TypeName) -> Self {
        match ty {
            TypeName::Int => Ty::Int,
            TypeName::String => Ty::String,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ty::Int => "Int",
            Ty::String => "String",
            Ty::Error => "<error>",
        };
        f.write_str(s)
    }
}

/// Outcome of typing one expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedValue {
    pub ty: Ty,
    pub pos: Position,
    /// Compile-time value, set for integer literals.
    pub value: Option<i32>,
}

impl TypedValue {
    pub fn new(ty: Ty, pos: Position) -> Self {
        Self {
            ty,
            pos,
            value: None,
        }
    }

    pub fn error(pos: Position) -> Self {
        Self::new(Ty::Error, pos)
    }
}
