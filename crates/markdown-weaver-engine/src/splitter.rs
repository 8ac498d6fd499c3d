//! Incremental scanner over a source string.
//!
//! A [`Splitter`] walks the source with a (usually composed) pattern and
//! yields plain text and matches in source order. Every byte of the source
//! ends up in exactly one segment, so joining text segments with the matched
//! text reconstructs the source.
//!
//! Whoever handles a match may pull further segments before the driving
//! loop resumes (a block whose end is unknown from its opening line reads
//! the following text itself) and may push unused input back.

use std::borrow::Cow;

use regex::{Captures, Match, Regex};

use crate::error::{EngineError, Result};

#[derive(Debug)]
pub enum Segment<'s> {
    Text(Cow<'s, str>),
    Match(Captures<'s>),
}

impl Segment<'_> {
    /// The source text this segment covers.
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Text(text) => text,
            Segment::Match(caps) => caps.get_match().as_str(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text(_))
    }
}

pub struct Splitter<'r, 's> {
    pattern: &'r Regex,
    /// Regions the pattern is never tested inside.
    escape: Option<&'r Regex>,
    source: &'s str,
    cursor: usize,
    /// Segments to hand out before scanning further, last one first.
    pending: Vec<Segment<'s>>,
}

impl<'r, 's> Splitter<'r, 's> {
    pub fn new(pattern: &'r Regex, source: &'s str) -> Self {
        Self {
            pattern,
            escape: None,
            source,
            cursor: 0,
            pending: Vec::new(),
        }
    }

    /// Treat regions matching `escape` as opaque text.
    pub fn with_escape(mut self, escape: Option<&'r Regex>) -> Self {
        self.escape = escape;
        self
    }

    /// Look at the next segment without consuming it.
    pub fn peek(&mut self) -> Option<&Segment<'s>> {
        if self.pending.is_empty() {
            let segment = self.scan()?;
            self.pending.push(segment);
        }
        self.pending.last()
    }

    /// Return a segment to the front of the stream.
    pub fn push_back(&mut self, segment: Segment<'s>) {
        self.pending.push(segment);
    }

    /// Like [`Iterator::next`], but running out of input is an error.
    pub fn expect_next(&mut self) -> Result<Segment<'s>> {
        self.next().ok_or(EngineError::Exhausted)
    }

    /// Take the next segment if it is plain text.
    ///
    /// A match is left in place and `None` returned.
    pub fn next_text(&mut self) -> Option<Cow<'s, str>> {
        match self.next()? {
            Segment::Text(text) => Some(text),
            segment => {
                self.push_back(segment);
                None
            }
        }
    }

    fn scan(&mut self) -> Option<Segment<'s>> {
        let end = self.source.len();
        if self.cursor >= end {
            return None;
        }

        match self.find_next(self.cursor) {
            Some(caps) => {
                let whole = caps.get_match();
                let (start, stop) = (whole.start(), whole.end());
                let gap = &self.source[self.cursor..start];
                self.cursor = stop;
                if gap.is_empty() {
                    Some(Segment::Match(caps))
                } else {
                    self.pending.push(Segment::Match(caps));
                    Some(Segment::Text(Cow::Borrowed(gap)))
                }
            }
            None => {
                let rest = &self.source[self.cursor..];
                self.cursor = end;
                Some(Segment::Text(Cow::Borrowed(rest)))
            }
        }
    }

    /// Next non-empty match at or after `from`, outside escape regions.
    fn find_next(&self, from: usize) -> Option<Captures<'s>> {
        let mut search = from;
        loop {
            let escape = self.next_escape(search);
            let bound = escape.map_or(self.source.len(), |m| m.start());
            let haystack = &self.source[..bound];

            let mut at = search;
            while at <= bound {
                let Some(caps) = self.pattern.captures_at(haystack, at) else {
                    break;
                };
                let whole = caps.get_match();
                if !whole.is_empty() {
                    return Some(caps);
                }
                at = next_boundary(self.source, whole.start());
            }

            search = escape?.end();
        }
    }

    fn next_escape(&self, from: usize) -> Option<Match<'s>> {
        let escape = self.escape?;
        let mut at = from;
        while at <= self.source.len() {
            let m = escape.find_at(self.source, at)?;
            if !m.is_empty() {
                return Some(m);
            }
            at = next_boundary(self.source, m.start());
        }
        None
    }
}

impl<'s> Iterator for Splitter<'_, 's> {
    type Item = Segment<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.pop().or_else(|| self.scan())
    }
}

fn next_boundary(source: &str, index: usize) -> usize {
    index
        + source[index..]
            .chars()
            .next()
            .map_or(1, char::len_utf8)
}
