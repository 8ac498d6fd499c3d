use regex::{Captures, Regex};
use std::collections::HashSet;

use super::namespace::{SEPARATOR, group_names, rename_pattern, validate_namespace};
use crate::cell::Context;
use crate::error::{EngineError, Result};

/// One render function's slot in a composed pattern.
#[derive(Debug, Clone)]
pub struct CellKind {
    /// Render name; also the name of the outer group.
    pub namespace: String,
    /// The namespaced pattern.
    pub pattern: String,
    /// Index of the owning renderer within its parser.
    pub renderer: usize,
    /// Render function the owning renderer dispatches on.
    pub function: String,
    /// Un-prefixed names of the groups defined by the raw pattern.
    groups: Vec<String>,
}

impl CellKind {
    pub fn new(raw_pattern: &str, namespace: String, renderer: usize, function: &str) -> Result<Self> {
        validate_namespace(&namespace)?;
        let groups = group_names(raw_pattern)
            .into_iter()
            .map(str::to_string)
            .collect();
        let pattern = rename_pattern(raw_pattern, &namespace);
        Ok(Self {
            namespace,
            pattern,
            renderer,
            function: function.to_string(),
            groups,
        })
    }

    /// Build the render context of this kind from a successful match.
    ///
    /// Groups that did not participate in the match are left out.
    pub fn context(&self, caps: &Captures<'_>) -> Context {
        let mut context = Context::default();
        for group in &self.groups {
            let full = format!("{}{SEPARATOR}{group}", self.namespace);
            if let Some(m) = caps.name(&full) {
                context.insert(group.clone(), m.as_str().to_string());
            }
        }
        context
    }
}

/// The alternation of every cell pattern registered to one parser.
///
/// Alternatives are tried in registration order, so earlier registrations
/// win when two patterns match at the same position.
#[derive(Debug)]
pub struct ComposedPattern {
    regex: Option<Regex>,
    kinds: Vec<CellKind>,
}

impl ComposedPattern {
    pub fn compose(parser: &str, kinds: Vec<CellKind>) -> Result<Self> {
        let mut seen = HashSet::new();
        for kind in &kinds {
            if !seen.insert(kind.namespace.as_str()) {
                return Err(EngineError::NamespaceCollision {
                    parser: parser.to_string(),
                    namespace: kind.namespace.clone(),
                });
            }
            // Compile alone first so a bad pattern is reported against its owner
            Regex::new(&kind.pattern).map_err(|source| EngineError::Pattern {
                namespace: kind.namespace.clone(),
                source,
            })?;
        }

        let regex = if kinds.is_empty() {
            None
        } else {
            let alternation = kinds
                .iter()
                .map(|kind| kind.pattern.as_str())
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&alternation).map_err(|source| EngineError::Pattern {
                namespace: parser.to_string(),
                source,
            })?;
            Some(regex)
        };

        Ok(Self { regex, kinds })
    }

    /// The compiled alternation; `None` when nothing is registered.
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    pub fn kinds(&self) -> &[CellKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Find the kind whose outer group matched, with its context.
    pub fn resolve(&self, caps: &Captures<'_>) -> Option<(&CellKind, Context)> {
        self.kinds
            .iter()
            .find(|kind| caps.name(&kind.namespace).is_some())
            .map(|kind| (kind, kind.context(caps)))
    }
}
