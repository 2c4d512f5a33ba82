mod error;
mod lowering;
mod module;
mod runtime;

pub use error::*;
pub use lowering::*;
pub use module::*;
pub use runtime::*;
