use std::collections::BTreeMap;
use std::ops::Range;

use regex::Captures;

use crate::error::Result;
use crate::pattern::CellKind;
use crate::renderer::{Fragments, Renderer};
use crate::splitter::Splitter;

/// Captured groups of one match, keyed by their un-prefixed names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(BTreeMap<String, String>);

impl Context {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One matched span of source, ready to be rendered by its owner.
#[derive(Debug)]
pub struct Cell<'k, 's> {
    pub kind: &'k CellKind,
    /// The matched source text.
    pub source: &'s str,
    pub span: Range<usize>,
    pub context: Context,
    pub output: String,
}

impl<'k, 's> Cell<'k, 's> {
    pub fn new(kind: &'k CellKind, caps: &Captures<'s>, context: Context) -> Self {
        let whole = caps.get_match();
        Self {
            kind,
            source: whole.as_str(),
            span: whole.range(),
            context,
            output: String::new(),
        }
    }

    /// Run the owning render function.
    pub fn render(
        &self,
        renderer: &mut dyn Renderer,
        splitter: &mut Splitter<'_, 's>,
    ) -> Result<Fragments> {
        renderer.render(&self.kind.function, self, splitter)
    }

    /// Render and collect the fragments into the output buffer.
    pub fn parse(
        &mut self,
        renderer: &mut dyn Renderer,
        splitter: &mut Splitter<'_, 's>,
    ) -> Result<&str> {
        let fragments = self.render(renderer, splitter)?;
        self.output = fragments.concat();
        Ok(&self.output)
    }
}
