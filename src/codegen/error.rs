use thiserror::Error;

use crate::analyzer::Ty;

/// Lowering failures. A program that passed semantic analysis never
/// produces one; they signal an inconsistent instruction stream.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("variable '{name}' has no machine type for '{ty}'")]
    UnknownType { name: String, ty: Ty },
    #[error("temporary @{0} is used before it is defined")]
    UnboundTemporary(usize),
    #[error("label ${0} is never defined")]
    UnboundLabel(usize),
    #[error("variable '{0}' has no storage slot")]
    UnboundVariable(String),
    #[error("cannot lower '{instruction}': {reason}")]
    UnsupportedOpcode { instruction: String, reason: String },
    #[error("label ${0} is defined more than once")]
    DuplicateLabel(usize),
}
