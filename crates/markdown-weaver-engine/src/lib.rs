pub mod cell;
pub mod converter;
pub mod error;
pub mod numbering;
pub mod page;
pub mod parser;
pub mod pattern;
pub mod renderer;
pub mod renderers;
pub mod splitter;
pub mod timing;

// Re-export key types for easier usage
pub use cell::{Cell, Context};
pub use converter::{Converted, Converter, ConverterBuilder};
pub use error::{EngineError, Result};
pub use numbering::{Label, LabelMap, NumberingMode, split_label};
pub use page::{Page, PageMeta};
pub use parser::Parser;
pub use renderer::{ContentRenderer, Fragments, MarkdownRenderer, RenderPattern, Renderer};
pub use renderers::{CommandKernel, Jupyter, Kernel, Linker, Number};
pub use splitter::{Segment, Splitter};
pub use timing::format_duration;
