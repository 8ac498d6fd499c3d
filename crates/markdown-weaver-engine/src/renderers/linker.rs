//! Cross references to numbered blocks.
//!
//! `{#label#}` anywhere in the text becomes a link to the block that
//! defined the label. Run it in a parser after the one holding [`Number`],
//! so every label of the document is known.
//!
//! [`Number`]: super::Number

use html_escape::encode_text;
use markdown_weaver_config::Settings;

use crate::cell::Cell;
use crate::error::Result;
use crate::numbering::{HEADER, SharedLabels, format_number, kind_prefix};
use crate::renderer::{Fragments, RenderPattern, Renderer};
use crate::splitter::Splitter;

pub const REFERENCE_PATTERN: &str = r"\{#(?P<label>\S+?)#\}";

pub struct Linker {
    settings: Settings,
    labels: SharedLabels,
    unresolved: Vec<String>,
}

impl Linker {
    pub fn new(labels: SharedLabels) -> Self {
        let mut settings = Settings::new();
        settings.set("class", "weaver-link");
        settings.set("kind_prefix", toml::Value::Table(toml::Table::new()));
        Self {
            settings,
            labels,
            unresolved: Vec::new(),
        }
    }

    /// References in the current document that matched no label.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    fn prefix(&self, kind: &str) -> String {
        self.settings
            .get_table("kind_prefix")
            .and_then(|table| table.get(kind))
            .and_then(toml::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| kind_prefix(kind))
    }

    fn render_reference(&mut self, cell: &Cell<'_, '_>) -> Fragments {
        let name = cell.context.get("label").unwrap_or_default();
        let class = self.settings.get_str("class").unwrap_or_default();

        let labels = self.labels.borrow();
        let Some(label) = labels.get(name) else {
            log::warn!("Unresolved reference '{name}'");
            self.unresolved.push(name.to_string());
            return vec![format!(
                "<span class=\"{class} unresolved\">{}</span>",
                encode_text(cell.source)
            )];
        };

        let number = format_number(&label.number_list);
        let text = if label.kind == HEADER {
            number
        } else {
            format!("{}{number}", self.prefix(&label.kind))
        };
        vec![format!(
            "<a href=\"#{}\" class=\"{class} {class}-{}\">{}</a>",
            label.id,
            label.kind,
            text.trim()
        )]
    }
}

impl Renderer for Linker {
    fn type_name(&self) -> &'static str {
        "linker"
    }

    fn patterns(&self) -> Vec<RenderPattern> {
        vec![RenderPattern::new("render_reference", REFERENCE_PATTERN)]
    }

    fn render<'s>(
        &mut self,
        function: &str,
        cell: &Cell<'_, 's>,
        _splitter: &mut Splitter<'_, 's>,
    ) -> Result<Fragments> {
        match function {
            "render_reference" => Ok(self.render_reference(cell)),
            _ => Ok(vec![cell.source.to_string()]),
        }
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn begin(&mut self) {
        self.unresolved.clear();
    }

    fn reset(&mut self) {
        self.begin();
    }
}
