//! Pattern namespacing and composition.

pub mod compose;
pub mod namespace;

pub use compose::{CellKind, ComposedPattern};
pub use namespace::{SEPARATOR, rename_pattern, render_name};
