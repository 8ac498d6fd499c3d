use regex::Regex;

use crate::cell::Cell;
use crate::error::{EngineError, Result};
use crate::pattern::{CellKind, ComposedPattern, render_name};
use crate::renderer::Renderer;
use crate::splitter::{Segment, Splitter};

/// A named set of renderers sharing one composed pattern.
pub struct Parser {
    name: String,
    renderers: Vec<Box<dyn Renderer>>,
    pattern: ComposedPattern,
    escape: Option<Regex>,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("name", &self.name)
            .field(
                "renderers",
                &self.renderers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("patterns", &self.pattern.len())
            .finish()
    }
}

impl Parser {
    /// Compose the patterns of every enabled renderer, in order.
    pub fn new(name: &str, renderers: Vec<Box<dyn Renderer>>) -> Result<Self> {
        let mut kinds = Vec::new();
        for (index, renderer) in renderers.iter().enumerate() {
            if !renderer.settings().enabled() {
                log::debug!("Renderer '{}' is disabled", renderer.name());
                continue;
            }
            for pattern in renderer.patterns() {
                let namespace =
                    render_name(renderer.type_name(), Some(renderer.name()), pattern.function);
                kinds.push(CellKind::new(
                    &pattern.pattern,
                    namespace,
                    index,
                    pattern.function,
                )?);
            }
        }
        let pattern = ComposedPattern::compose(name, kinds)?;

        Ok(Self {
            name: name.to_string(),
            renderers,
            pattern,
            escape: None,
        })
    }

    /// Never look for matches inside regions matching `pattern`.
    pub fn with_escape(mut self, pattern: &str) -> Result<Self> {
        let escape = Regex::new(pattern).map_err(|source| EngineError::Pattern {
            namespace: self.name.clone(),
            source,
        })?;
        self.escape = Some(escape);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &ComposedPattern {
        &self.pattern
    }

    pub fn renderers(&self) -> impl Iterator<Item = &dyn Renderer> {
        self.renderers.iter().map(|r| r.as_ref())
    }

    pub fn renderer(&self, name: &str) -> Option<&dyn Renderer> {
        self.renderers().find(|r| r.name() == name)
    }

    pub fn reset(&mut self) {
        for renderer in &mut self.renderers {
            renderer.reset();
        }
    }

    /// Convert `source`, replacing every match by its renderer's output.
    pub fn parse(&mut self, source: &str) -> Result<String> {
        for renderer in &mut self.renderers {
            renderer.begin();
        }
        let Some(regex) = self.pattern.regex() else {
            return Ok(source.to_string());
        };

        let mut splitter = Splitter::new(regex, source).with_escape(self.escape.as_ref());
        let mut output = String::with_capacity(source.len());
        while let Some(segment) = splitter.next() {
            let caps = match segment {
                Segment::Text(text) => {
                    output.push_str(&text);
                    continue;
                }
                Segment::Match(caps) => caps,
            };
            let Some((kind, context)) = self.pattern.resolve(&caps) else {
                output.push_str(caps.get_match().as_str());
                continue;
            };
            log::debug!(
                "[{}] {} at {:?}",
                self.name,
                kind.namespace,
                caps.get_match().range()
            );
            let renderer = self.renderers[kind.renderer].as_mut();
            let mut cell = Cell::new(kind, &caps, context);
            output.push_str(cell.parse(renderer, &mut splitter)?);
        }
        Ok(output)
    }
}
