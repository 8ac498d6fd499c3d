//! Built-in renderers.

pub mod jupyter;
pub mod linker;
pub mod number;

pub use jupyter::{CommandKernel, Jupyter, Kernel};
pub use linker::Linker;
pub use number::Number;
