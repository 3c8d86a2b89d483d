mod codegen;
mod error;
mod frame;
mod instruction;

pub use codegen::*;
pub use error::*;
pub use frame::*;
pub use instruction::*;
