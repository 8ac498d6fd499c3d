use crate::error::{EngineError, Result};

use super::HEADER;

/// How local number lists relate to the enclosing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberingMode {
    /// Heading level that becomes the top numbering level; shallower header
    /// levels are dropped from header numbers.
    StartLevel(usize),
    /// Numbers of the enclosing section, prepended to every number list.
    Parent(Vec<u32>),
}

impl Default for NumberingMode {
    fn default() -> Self {
        NumberingMode::StartLevel(1)
    }
}

impl NumberingMode {
    /// Pick the mode from the two mutually exclusive options.
    pub fn from_options(start_level: Option<usize>, parent: Option<Vec<u32>>) -> Result<Self> {
        match (start_level, parent) {
            (Some(_), Some(_)) => Err(EngineError::ConflictingNumbering),
            (Some(level), None) => Ok(NumberingMode::StartLevel(level)),
            (None, Some(parent)) => Ok(NumberingMode::Parent(parent)),
            (None, None) => Ok(NumberingMode::default()),
        }
    }

    /// Turn a locally counted number list into the one that is displayed.
    pub fn normalize(&self, kind: &str, numbers: &[u32]) -> Vec<u32> {
        match self {
            NumberingMode::Parent(parent) => {
                let local = if kind == HEADER {
                    numbers.get(1..).unwrap_or_default()
                } else {
                    numbers
                };
                parent.iter().chain(local).copied().collect()
            }
            NumberingMode::StartLevel(level) if kind == HEADER => {
                let skip = level.saturating_sub(1);
                numbers.get(skip..).unwrap_or_default().to_vec()
            }
            NumberingMode::StartLevel(_) => numbers.to_vec(),
        }
    }
}
