use thiserror::Error;

use crate::lexer::Position;

use super::Ty;

/// A semantic diagnostic. `Display` yields the user-facing line
/// `"<Kind> [Line L, Column C]: <message>"`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("DuplicateDeclaration [{pos}]: variable '{name}' is already declared in this scope")]
    DuplicateDeclaration {
        name: String,
        pos: Position,
        previous: Position,
    },
    #[error("Undeclared [{pos}]: variable '{name}' is not declared")]
    Undeclared { name: String, pos: Position },
    #[error("TypeMismatch [{pos}]: expected '{expected}', found '{found}'")]
    TypeMismatch {
        expected: Ty,
        found: Ty,
        pos: Position,
    },
    #[error("InvalidConditionType [{pos}]: condition must be 'Int', found '{found}'")]
    InvalidConditionType { found: Ty, pos: Position },
    #[error("InvalidOperandType [{pos}]: operator '{op}' expects 'Int' operands, found {}", describe_operands(.operands))]
    InvalidOperandType {
        op: String,
        operands: Vec<Ty>,
        pos: Position,
    },
    #[error("ReadTargetTypeMismatch [{pos}]: variable '{name}' of type '{found}' cannot receive readLine(), expected 'String'")]
    ReadTargetTypeMismatch {
        name: String,
        found: Ty,
        pos: Position,
    },
}

fn describe_operands(operands: &[Ty]) -> String {
    operands
        .iter()
        .map(|ty| format!("'{}'", ty))
        .collect::<Vec<_>>()
        .join(" and ")
}

impl SemanticError {
    pub fn pos(&self) -> Position {
        match self {
            SemanticError::DuplicateDeclaration { pos, .. }
            | SemanticError::Undeclared { pos, .. }
            | SemanticError::TypeMismatch { pos, .. }
            | SemanticError::InvalidConditionType { pos, .. }
            | SemanticError::InvalidOperandType { pos, .. }
            | SemanticError::ReadTargetTypeMismatch { pos, .. } => *pos,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SemanticError::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            SemanticError::Undeclared { .. } => "Undeclared",
            SemanticError::TypeMismatch { .. } => "TypeMismatch",
            SemanticError::InvalidConditionType { .. } => "InvalidConditionType",
            SemanticError::InvalidOperandType { .. } => "InvalidOperandType",
            SemanticError::ReadTargetTypeMismatch { .. } => "ReadTargetTypeMismatch",
        }
    }
}
