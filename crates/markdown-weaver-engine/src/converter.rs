use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use markdown_weaver_config::Config;

use crate::error::{EngineError, Result};
use crate::page::{Page, PageMeta, read_source};
use crate::parser::Parser;
use crate::renderer::Renderer;
use crate::renderers::{Jupyter, Kernel, Linker, Number};
use crate::timing::format_duration;

/// Collects named renderer groups before they are configured.
#[derive(Default)]
pub struct ConverterBuilder {
    groups: Vec<(String, Vec<Box<dyn Renderer>>)>,
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default pipeline: code cells and numbering in `main`, then cross
    /// references in `link`.
    pub fn standard(kernel: Box<dyn Kernel>) -> Result<Self> {
        let number = Number::new();
        let labels = number.labels();
        Self::new()
            .register("main", vec![Box::new(Jupyter::new(kernel)), Box::new(number)])?
            .register("link", vec![Box::new(Linker::new(labels))])
    }

    /// Add a parser made of `renderers`; earlier renderers win ties.
    pub fn register(mut self, name: &str, renderers: Vec<Box<dyn Renderer>>) -> Result<Self> {
        if self.groups.iter().any(|(existing, _)| existing == name) {
            return Err(EngineError::DuplicateParser(name.to_string()));
        }
        self.groups.push((name.to_string(), renderers));
        Ok(self)
    }

    /// Configure every renderer once and compose the parsers.
    pub fn build(self, config: &Config) -> Result<Converter> {
        let empty = toml::Table::new();
        let mut parsers = Vec::with_capacity(self.groups.len());
        for (name, mut renderers) in self.groups {
            for renderer in &mut renderers {
                let settings = config.renderer(renderer.name()).unwrap_or(&empty);
                renderer.configure(settings)?;
            }
            parsers.push(Parser::new(&name, renderers)?);
        }
        Ok(Converter {
            parsers,
            pages: HashMap::new(),
            dirty: false,
        })
    }
}

/// Result of [`Converter::convert_from_file`].
#[derive(Debug)]
pub struct Converted<'a> {
    pub page: &'a Page,
    /// The page was unchanged and its previous output reused.
    pub cached: bool,
}

impl Converted<'_> {
    pub fn output(&self) -> &str {
        self.page.output()
    }
}

/// Runs parsers in order and caches converted pages by path.
#[derive(Debug)]
pub struct Converter {
    parsers: Vec<Parser>,
    pages: HashMap<PathBuf, Page>,
    dirty: bool,
}

impl Converter {
    pub fn parser(&self, name: &str) -> Result<&Parser> {
        self.parsers
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| EngineError::ParserNotFound(name.to_string()))
    }

    pub fn renderer(&self, parser: &str, name: &str) -> Result<&dyn Renderer> {
        self.parser(parser)?
            .renderer(name)
            .ok_or_else(|| EngineError::RendererNotFound {
                parser: parser.to_string(),
                renderer: name.to_string(),
            })
    }

    pub fn parser_names(&self) -> impl Iterator<Item = &str> {
        self.parsers.iter().map(Parser::name)
    }

    /// Run the parsers named in `names`, in that order, or all of them in
    /// registration order.
    pub fn convert(&mut self, source: &str, names: Option<&[&str]>) -> Result<String> {
        let indices = self.select(names)?;
        self.run(source, &indices)
    }

    /// Convert a file through the selected parsers, reusing the cached page
    /// when its source and parser selection are unchanged and the converter
    /// is not dirty.
    pub fn convert_from_file(
        &mut self,
        path: &Path,
        names: Option<&[&str]>,
    ) -> Result<Converted<'_>> {
        let source = read_source(path)?;
        let indices = self.select(names)?;
        let parsers: Vec<String> = indices
            .iter()
            .map(|&index| self.parsers[index].name().to_string())
            .collect();

        let cached = !self.dirty
            && self
                .pages
                .get(path)
                .is_some_and(|page| page.source() == source && page.parsers() == parsers);
        if cached {
            log::info!("Unchanged: {}", path.display());
            let page = &self.pages[path];
            return Ok(Converted { page, cached: true });
        }

        let start = Instant::now();
        let output = match self.run(&source, &indices) {
            Ok(output) => output,
            Err(e) => {
                self.pages.remove(path);
                return Err(e);
            }
        };
        let meta = PageMeta {
            extra_html: self.extra_html(),
        };
        log::info!(
            "Converted: {} in {}",
            path.display(),
            format_duration(start.elapsed())
        );

        let page = Page::new(path.to_path_buf(), source, output, parsers, meta);
        self.pages.insert(path.to_path_buf(), page);
        Ok(Converted {
            page: &self.pages[path],
            cached: false,
        })
    }

    /// Convert every file, stopping at the first failure. Returns how many
    /// files were actually reconverted.
    pub fn convert_from_file_list<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        names: Option<&[&str]>,
    ) -> Result<usize> {
        let mut converted = 0;
        for path in paths {
            if !self.convert_from_file(path.as_ref(), names)?.cached {
                converted += 1;
            }
        }
        Ok(converted)
    }

    /// Run parsers again over the stored output of an already converted page.
    pub fn convert_from_output(&mut self, path: &Path, names: Option<&[&str]>) -> Result<&str> {
        let previous = self
            .pages
            .get(path)
            .map(|page| page.output().to_string())
            .ok_or_else(|| EngineError::PageNotFound(path.to_path_buf()))?;

        let output = self.convert(&previous, names)?;
        let meta = PageMeta {
            extra_html: self.extra_html(),
        };
        let page = self
            .pages
            .get_mut(path)
            .ok_or_else(|| EngineError::PageNotFound(path.to_path_buf()))?;
        page.set_output(output, meta);
        Ok(page.output())
    }

    pub fn page(&self, path: &Path) -> Option<&Page> {
        self.pages.get(path)
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Force the next conversions to ignore cached pages.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget every page and reset every renderer.
    pub fn reset(&mut self) {
        for parser in &mut self.parsers {
            parser.reset();
        }
        self.pages.clear();
    }

    /// Indices of the parsers named in `names`; unknown names are rejected
    /// before anything runs.
    fn select(&self, names: Option<&[&str]>) -> Result<Vec<usize>> {
        match names {
            Some(names) => names
                .iter()
                .map(|name| {
                    self.parsers
                        .iter()
                        .position(|p| p.name() == *name)
                        .ok_or_else(|| EngineError::ParserNotFound(name.to_string()))
                })
                .collect(),
            None => Ok((0..self.parsers.len()).collect()),
        }
    }

    fn run(&mut self, source: &str, indices: &[usize]) -> Result<String> {
        let mut output = source.to_string();
        for &index in indices {
            output = self.parsers[index].parse(&output)?;
        }
        Ok(output)
    }

    fn extra_html(&self) -> String {
        self.parsers
            .iter()
            .flat_map(Parser::renderers)
            .filter_map(|renderer| renderer.extra_html())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::renderer::{Fragments, RenderPattern};
    use crate::splitter::Splitter;
    use markdown_weaver_config::Settings;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    /// Replaces its word with a configurable replacement.
    struct Replace {
        word: &'static str,
        settings: Settings,
    }

    impl Replace {
        fn boxed(word: &'static str) -> Box<Self> {
            let mut settings = Settings::new();
            settings.set("with", word.to_uppercase());
            Box::new(Self { word, settings })
        }
    }

    impl Renderer for Replace {
        fn type_name(&self) -> &'static str {
            "replace"
        }

        fn name(&self) -> &str {
            self.word
        }

        fn patterns(&self) -> Vec<RenderPattern> {
            vec![RenderPattern::new("render_word", self.word)]
        }

        fn render<'s>(
            &mut self,
            _function: &str,
            _cell: &Cell<'_, 's>,
            _splitter: &mut Splitter<'_, 's>,
        ) -> Result<Fragments> {
            if self.word == "boom" {
                return Err(anyhow::anyhow!("boom").into());
            }
            Ok(vec![self.settings.get_str("with").unwrap_or_default().to_string()])
        }

        fn settings(&self) -> &Settings {
            &self.settings
        }

        fn settings_mut(&mut self) -> &mut Settings {
            &mut self.settings
        }

        fn extra_html(&self) -> Option<String> {
            Some(format!("<!-- {} -->", self.word))
        }
    }

    fn converter() -> Converter {
        ConverterBuilder::new()
            .register("first", vec![Replace::boxed("a")])
            .unwrap()
            .register("second", vec![Replace::boxed("b")])
            .unwrap()
            .build(&Config::default())
            .unwrap()
    }

    #[test]
    fn test_duplicate_parser_is_rejected() {
        let result = ConverterBuilder::new()
            .register("main", Vec::new())
            .unwrap()
            .register("main", Vec::new());
        assert!(matches!(result, Err(EngineError::DuplicateParser(name)) if name == "main"));
    }

    #[test]
    fn test_build_applies_config() {
        let config = Config::from_toml("[renderers.a]\nwith = 'x'\n[renderers.b]\nenabled = false")
            .unwrap();
        let mut converter = ConverterBuilder::new()
            .register("main", vec![Replace::boxed("a"), Replace::boxed("b")])
            .unwrap()
            .build(&config)
            .unwrap();

        assert_eq!(converter.convert("ab", None).unwrap(), "xb");
    }

    #[test]
    fn test_missing_config_keeps_defaults() {
        let converter = converter();
        for (parser, name) in [("first", "a"), ("second", "b")] {
            let renderer = converter.renderer(parser, name).unwrap();
            assert!(renderer.settings().enabled());
            assert_eq!(
                renderer.settings().get_str("with"),
                Some(name.to_uppercase().as_str())
            );
        }
    }

    #[test]
    fn test_convert_selected_parsers() {
        let mut converter = converter();
        assert_eq!(converter.convert("ab", None).unwrap(), "AB");
        assert_eq!(converter.convert("ab", Some(&["second"])).unwrap(), "aB");
        assert!(matches!(
            converter.convert("ab", Some(&["second", "third"])),
            Err(EngineError::ParserNotFound(name)) if name == "third"
        ));
    }

    #[test]
    fn test_lookups() {
        let converter = converter();
        assert_eq!(converter.parser_names().collect::<Vec<_>>(), ["first", "second"]);
        assert!(matches!(
            converter.parser("none"),
            Err(EngineError::ParserNotFound(_))
        ));
        assert!(matches!(
            converter.renderer("first", "b"),
            Err(EngineError::RendererNotFound { .. })
        ));
    }

    #[test]
    fn test_convert_from_file_caches_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "a b").unwrap();
        let mut converter = converter();

        let first = converter.convert_from_file(&path, None).unwrap();
        assert!(!first.cached);
        assert_eq!(first.output(), "A B");
        assert_eq!(first.page.meta.extra_html, "<!-- a -->\n<!-- b -->");

        assert!(converter.convert_from_file(&path, None).unwrap().cached);

        fs::write(&path, "b a").unwrap();
        let changed = converter.convert_from_file(&path, None).unwrap();
        assert!(!changed.cached);
        assert_eq!(changed.output(), "B A");
    }

    #[test]
    fn test_convert_from_file_selected_parsers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "a b").unwrap();
        let mut converter = converter();

        let first = converter.convert_from_file(&path, Some(&["second"])).unwrap();
        assert_eq!(first.output(), "a B");
        assert_eq!(first.page.parsers(), ["second".to_string()]);

        // Same source through a different selection is not a cache hit
        let all = converter.convert_from_file(&path, None).unwrap();
        assert!(!all.cached);
        assert_eq!(all.output(), "A B");
        assert!(converter.convert_from_file(&path, None).unwrap().cached);

        assert!(matches!(
            converter.convert_from_file(&path, Some(&["third"])),
            Err(EngineError::ParserNotFound(name)) if name == "third"
        ));
        assert_eq!(converter.page(&path).unwrap().output(), "A B");
    }

    #[test]
    fn test_dirty_forces_conversion() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "a").unwrap();
        let mut converter = converter();

        converter.convert_from_file(&path, None).unwrap();
        converter.set_dirty(true);
        assert!(converter.is_dirty());
        assert!(!converter.convert_from_file(&path, None).unwrap().cached);
    }

    #[test]
    fn test_failed_conversion_evicts_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "a").unwrap();
        let mut converter = ConverterBuilder::new()
            .register("main", vec![Replace::boxed("a"), Replace::boxed("boom")])
            .unwrap()
            .build(&Config::default())
            .unwrap();

        converter.convert_from_file(&path, None).unwrap();
        assert!(converter.page(&path).is_some());

        fs::write(&path, "boom").unwrap();
        let result = converter.convert_from_file(&path, None);
        assert!(matches!(result, Err(EngineError::Collaborator(_))));
        assert!(converter.page(&path).is_none());
    }

    #[test]
    fn test_convert_from_file_list_counts_conversions() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["one.md", "two.md"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        for path in &paths {
            fs::write(path, "a").unwrap();
        }
        let mut converter = converter();

        assert_eq!(converter.convert_from_file_list(&paths, None).unwrap(), 2);
        assert_eq!(converter.convert_from_file_list(&paths, None).unwrap(), 0);
        assert_eq!(converter.pages().count(), 2);

        let missing = [dir.path().join("missing.md")];
        assert!(matches!(
            converter.convert_from_file_list(&missing, None),
            Err(EngineError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_convert_from_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "a b").unwrap();
        let config = Config::from_toml("[renderers.A]\nwith = 'AA'").unwrap();
        let mut converter = ConverterBuilder::new()
            .register("first", vec![Replace::boxed("a")])
            .unwrap()
            .register("second", vec![Replace::boxed("A")])
            .unwrap()
            .build(&config)
            .unwrap();

        assert_eq!(
            converter.convert_from_file(&path, None).unwrap().output(),
            "AA b"
        );
        let output = converter.convert_from_output(&path, Some(&["second"])).unwrap();
        assert_eq!(output, "AAAA b");

        let other = dir.path().join("other.md");
        assert!(matches!(
            converter.convert_from_output(&other, None),
            Err(EngineError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_reset_forgets_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "a").unwrap();
        let mut converter = converter();

        converter.convert_from_file(&path, None).unwrap();
        converter.reset();
        assert!(converter.page(&path).is_none());
        assert!(!converter.convert_from_file(&path, None).unwrap().cached);
    }
}
