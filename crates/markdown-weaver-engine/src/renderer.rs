use markdown_weaver_config::Settings;
use pulldown_cmark::{Options, Parser as MarkdownParser, html};

use crate::cell::Cell;
use crate::error::Result;
use crate::splitter::Splitter;

/// Output pieces of one render call, concatenated by the caller.
pub type Fragments = Vec<String>;

/// A pattern together with the render function that handles its matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPattern {
    pub function: &'static str,
    pub pattern: String,
}

impl RenderPattern {
    pub fn new(function: &'static str, pattern: impl Into<String>) -> Self {
        Self {
            function,
            pattern: pattern.into(),
        }
    }
}

/// A unit that recognises its own patterns in the source and renders them.
///
/// Renderers are built with default settings, configured once by
/// [`crate::ConverterBuilder::build`], then used for any number of
/// documents.
pub trait Renderer {
    /// Lower-cased type name, the first part of every render name.
    fn type_name(&self) -> &'static str;

    /// Instance name; equal to the type name unless renamed.
    fn name(&self) -> &str {
        self.type_name()
    }

    fn patterns(&self) -> Vec<RenderPattern>;

    /// Render one matched cell with the render function `function`.
    ///
    /// The splitter is the one that produced `cell`; a renderer may pull
    /// further segments from it and push back what it does not consume.
    fn render<'s>(
        &mut self,
        function: &str,
        cell: &Cell<'_, 's>,
        splitter: &mut Splitter<'_, 's>,
    ) -> Result<Fragments>;

    fn settings(&self) -> &Settings;

    fn settings_mut(&mut self) -> &mut Settings;

    /// Merge caller settings over the defaults.
    fn configure(&mut self, update: &toml::Table) -> Result<()> {
        self.settings_mut().merge(update);
        Ok(())
    }

    /// Called before each document pass.
    fn begin(&mut self) {}

    /// Drop state accumulated across documents.
    fn reset(&mut self) {}

    /// Markup the host should add to the page around the converted output.
    fn extra_html(&self) -> Option<String> {
        None
    }
}

/// Markdown to HTML backend used for titles and block content.
pub trait ContentRenderer {
    fn render(&self, text: &str, extensions: &[String]) -> anyhow::Result<String>;
}

/// [`ContentRenderer`] backed by pulldown-cmark.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn options(extensions: &[String]) -> Options {
        let mut options = Options::empty();
        for extension in extensions {
            match extension.as_str() {
                "tables" => options.insert(Options::ENABLE_TABLES),
                "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
                "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
                "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
                "math" => options.insert(Options::ENABLE_MATH),
                "smarty" => options.insert(Options::ENABLE_SMART_PUNCTUATION),
                other => log::debug!("Unknown markdown extension '{other}' ignored"),
            }
        }
        options
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, text: &str, extensions: &[String]) -> anyhow::Result<String> {
        let parser = MarkdownParser::new_ext(text, Self::options(extensions));
        let mut out = String::new();
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

/// Render a one-line title and drop the paragraph wrapper.
pub fn render_inline(
    content: &dyn ContentRenderer,
    text: &str,
    extensions: &[String],
) -> anyhow::Result<String> {
    let rendered = content.render(text, extensions)?;
    let trimmed = rendered.trim_end();
    Ok(trimmed
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
        .unwrap_or(trimmed)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markdown_renderer_paragraph() {
        let html = MarkdownRenderer.render("Hello *world*", &[]).unwrap();
        assert_eq!(html, "<p>Hello <em>world</em></p>\n");
    }

    #[test]
    fn test_markdown_renderer_tables_extension() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        let plain = MarkdownRenderer.render(table, &[]).unwrap();
        let with_tables = MarkdownRenderer
            .render(table, &["tables".to_string()])
            .unwrap();

        assert!(!plain.contains("<table>"));
        assert!(with_tables.contains("<table>"));
        assert!(with_tables.contains("<td>1</td>"));
    }

    #[test]
    fn test_render_inline_strips_paragraph() {
        let title = render_inline(&MarkdownRenderer, "A **bold** title", &[]).unwrap();
        assert_eq!(title, "A <strong>bold</strong> title");
    }

    #[test]
    fn test_render_inline_keeps_other_blocks() {
        let title = render_inline(&MarkdownRenderer, "- item", &[]).unwrap();
        assert_eq!(title, "<ul>\n<li>item</li>\n</ul>");
    }
}
