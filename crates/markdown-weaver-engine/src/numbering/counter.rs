use std::collections::BTreeMap;

/// Nesting levels tracked per kind.
pub const LEVELS: usize = 6;

/// Hierarchical counters, one vector per content kind.
///
/// Incrementing a level resets every deeper level of the same kind and
/// leaves all other kinds alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    counters: BTreeMap<String, [u32; LEVELS]>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more block of `kind` at `depth` (0-based) and return the
    /// number list down to that depth.
    ///
    /// Depths beyond the last level count at the last level.
    pub fn step(&mut self, kind: &str, depth: usize) -> Vec<u32> {
        let depth = depth.min(LEVELS - 1);
        let counter = self
            .counters
            .entry(kind.to_string())
            .or_insert([0; LEVELS]);
        counter[depth] += 1;
        counter[depth + 1..].fill(0);
        counter[..=depth].to_vec()
    }

    pub fn get(&self, kind: &str) -> Option<&[u32; LEVELS]> {
        self.counters.get(kind)
    }

    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

/// Join a number list with dots: `[1, 2]` becomes `1.2`.
pub fn format_number(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
