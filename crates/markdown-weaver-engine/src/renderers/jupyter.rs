//! Executable code cells.
//!
//! A fenced block whose language has a kernel is executed and rendered as an
//! input cell followed by an output cell. `{{expr}}` inline code is replaced
//! by its result. Fences in other languages are left untouched.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context as _, bail};
use html_escape::encode_text;
use markdown_weaver_config::Settings;
use toml::Value;

use crate::cell::Cell;
use crate::error::Result;
use crate::renderer::{Fragments, RenderPattern, Renderer};
use crate::splitter::Splitter;

pub const FENCED_CODE_PATTERN: &str =
    r"(?ms)^```(?P<language>\w*)(?P<option>[^\n]*)\n(?P<code>.*?)\n```[ \t]*$\n?";

pub const INLINE_CODE_PATTERN: &str = r"\{\{(?P<code>.+?)\}\}";

/// Executes source code on behalf of [`Jupyter`].
pub trait Kernel {
    /// Run `code` written in `language` and return what it printed.
    fn execute(&mut self, language: &str, code: &str) -> anyhow::Result<String>;
}

/// [`Kernel`] that pipes each cell into a fresh interpreter process.
///
/// Cells do not share state: every execution starts a new process.
#[derive(Debug, Clone)]
pub struct CommandKernel {
    commands: BTreeMap<String, String>,
}

impl Default for CommandKernel {
    fn default() -> Self {
        Self::new([("python", "python3")])
    }
}

impl CommandKernel {
    pub fn new<I, K, V>(commands: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            commands: commands
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build from a `language = "command"` table, falling back to the
    /// defaults when the table is empty.
    pub fn from_table(table: &toml::Table) -> Self {
        let commands: BTreeMap<String, String> = table
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect();
        if commands.is_empty() {
            Self::default()
        } else {
            Self { commands }
        }
    }

    pub fn command(&self, language: &str) -> Option<&str> {
        self.commands.get(language).map(String::as_str)
    }
}

impl Kernel for CommandKernel {
    fn execute(&mut self, language: &str, code: &str) -> anyhow::Result<String> {
        let Some(command) = self.command(language) else {
            bail!("No kernel command for language '{language}'");
        };
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            bail!("Empty kernel command for language '{language}'");
        };

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run {command}"))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            bail!(
                "{command} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Display options given after the fence language, comma or space separated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CellOptions {
    hide_input: bool,
    hide_output: bool,
}

impl CellOptions {
    fn parse(option: &str) -> Self {
        let mut options = Self::default();
        for word in option.split([',', ' ', '\t']).filter(|w| !w.is_empty()) {
            match word {
                "hide" => {
                    options.hide_input = true;
                    options.hide_output = true;
                }
                "hide-input" => options.hide_input = true,
                "hide-output" => options.hide_output = true,
                other => log::debug!("Unknown cell option '{other}'"),
            }
        }
        options
    }
}

pub struct Jupyter {
    settings: Settings,
    kernel: Box<dyn Kernel>,
    executed: usize,
}

impl Jupyter {
    pub fn new(kernel: Box<dyn Kernel>) -> Self {
        let mut settings = Settings::new();
        let mut kernel_name = toml::Table::new();
        kernel_name.insert("python".to_string(), Value::from("python3"));
        settings.set("kernel_name", Value::Table(kernel_name));
        settings.set("default_language", "python");
        settings.set("stylesheet", "css/jupyter.css");

        Self {
            settings,
            kernel,
            executed: 0,
        }
    }

    /// Cells executed in the current document.
    pub fn executed(&self) -> usize {
        self.executed
    }

    fn has_kernel(&self, language: &str) -> bool {
        self.settings
            .get_table("kernel_name")
            .is_some_and(|table| table.contains_key(language))
    }

    fn execute(&mut self, language: &str, code: &str) -> Result<String> {
        let output = self.kernel.execute(language, code)?;
        self.executed += 1;
        Ok(output)
    }

    fn render_fenced_code(&mut self, cell: &Cell<'_, '_>) -> Result<Fragments> {
        let language = cell.context.get("language").unwrap_or_default();
        if !self.has_kernel(language) {
            return Ok(vec![cell.source.to_string()]);
        }
        let code = cell.context.get("code").unwrap_or_default();
        let options = CellOptions::parse(cell.context.get("option").unwrap_or_default());

        let output = self.execute(language, code)?;
        let output = output.trim_end();

        let mut fragments = Vec::new();
        if !options.hide_input {
            fragments.push(format!(
                "<div class=\"cell jupyter input\"><pre><code class=\"{language}\">{}</code></pre></div>\n",
                encode_text(code)
            ));
        }
        if !options.hide_output && !output.is_empty() {
            fragments.push(format!(
                "<div class=\"cell jupyter output\"><pre>{}</pre></div>\n",
                encode_text(output)
            ));
        }
        Ok(fragments)
    }

    fn render_inline_code(&mut self, cell: &Cell<'_, '_>) -> Result<Fragments> {
        let language = self
            .settings
            .get_str("default_language")
            .unwrap_or("python")
            .to_string();
        let code = cell.context.get("code").unwrap_or_default().trim();
        let output = self.execute(&language, code)?;
        Ok(vec![format!(
            "<span class=\"cell jupyter inline\">{}</span>",
            encode_text(output.trim())
        )])
    }
}

impl Renderer for Jupyter {
    fn type_name(&self) -> &'static str {
        "jupyter"
    }

    fn patterns(&self) -> Vec<RenderPattern> {
        vec![
            RenderPattern::new("render_fenced_code", FENCED_CODE_PATTERN),
            RenderPattern::new("render_inline_code", INLINE_CODE_PATTERN),
        ]
    }

    fn render<'s>(
        &mut self,
        function: &str,
        cell: &Cell<'_, 's>,
        _splitter: &mut Splitter<'_, 's>,
    ) -> Result<Fragments> {
        match function {
            "render_fenced_code" => self.render_fenced_code(cell),
            "render_inline_code" => self.render_inline_code(cell),
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
        self.executed = 0;
    }

    fn reset(&mut self) {
        self.begin();
    }

    fn extra_html(&self) -> Option<String> {
        let stylesheet = self.settings.get_str("stylesheet")?;
        if self.executed == 0 || stylesheet.is_empty() {
            return None;
        }
        Some(format!("<link rel=\"stylesheet\" href=\"{stylesheet}\">"))
    }
}
