mod generator;
mod instruction;

pub use generator::*;
pub use instruction::*;
