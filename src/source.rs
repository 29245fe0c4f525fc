//! Source text registry and position mapping.
//!
//! Every function defined by [`crate::interpreter::Interpreter::run_source`]
//! keeps a [`SourceRef`] to the file it came from. The transform pipeline
//! slices whole lines out of that file, dedents them so the definition parses
//! on its own, and maps the positions of the reparsed tree back onto the file.

use std::rc::Rc;

use crate::token::Span;

#[derive(Debug)]
pub struct SourceFile {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: name.into(),
            line_starts: line_starts(&text),
            text,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line containing byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|start| *start <= offset)
    }

    fn line_end(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len())
    }
}

/// Location of a definition inside a registered source file.
#[derive(Debug, Clone)]
pub struct SourceRef {
    file: Rc<SourceFile>,
    span: Span,
}

/// Whole lines covering a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLines {
    pub text: String,
    pub first_line: usize,
    pub start_offset: usize,
}

impl SourceRef {
    pub fn new(file: Rc<SourceFile>, span: Span) -> Self {
        Self { file, span }
    }

    pub fn file(&self) -> &Rc<SourceFile> {
        &self.file
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Returns `None` when the span does not fit in the file.
    pub fn lines(&self) -> Option<SourceLines> {
        if self.span.is_missing() || self.span.line > self.file.line_count() {
            return None;
        }
        let first_line = self.span.line;
        let last_line = self
            .file
            .line_of(self.span.end.saturating_sub(1).max(self.span.start));
        let start_offset = *self.file.line_starts.get(first_line - 1)?;
        let end_offset = self.file.line_end(last_line.max(first_line));
        let text = self.file.text.get(start_offset..end_offset)?;
        Some(SourceLines {
            text: text.to_string(),
            first_line,
            start_offset,
        })
    }
}

/// Dedented copy of a block of lines plus what is needed to map positions in
/// it back to the original file.
#[derive(Debug, Clone)]
pub struct Dedented {
    text: String,
    first_line: usize,
    margin: usize,
    removed: Vec<usize>,
    original_starts: Vec<usize>,
    dedented_starts: Vec<usize>,
}

pub fn dedent(lines: &SourceLines) -> Dedented {
    let margin = lines
        .text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(leading_spaces)
        .min()
        .unwrap_or(0);

    let mut text = String::with_capacity(lines.text.len());
    let mut removed = Vec::new();
    let mut original_starts = Vec::new();
    let mut dedented_starts = Vec::new();
    let mut offset = lines.start_offset;
    for line in lines.text.split_inclusive('\n') {
        let cut = leading_spaces(line).min(margin);
        original_starts.push(offset);
        dedented_starts.push(text.len());
        removed.push(cut);
        text.push_str(&line[cut..]);
        offset += line.len();
    }

    Dedented {
        text,
        first_line: lines.first_line,
        margin,
        removed,
        original_starts,
        dedented_starts,
    }
}

impl Dedented {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// Columns removed from every non-blank line.
    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Maps a span of the dedented text onto the original file.
    pub fn to_original(&self, span: Span) -> Span {
        if span.is_missing() || self.removed.is_empty() {
            return span;
        }
        let start_index = (span.line - 1).min(self.removed.len() - 1);
        let end_index = self
            .dedented_starts
            .partition_point(|start| *start <= span.end.saturating_sub(1).max(span.start))
            .saturating_sub(1);
        Span {
            start: self.map_offset(start_index, span.start),
            end: self.map_offset(end_index, span.end),
            line: self.first_line + start_index,
            column: span.column + self.removed[start_index],
        }
    }

    fn map_offset(&self, index: usize, offset: usize) -> usize {
        self.original_starts[index]
            + self.removed[index]
            + offset.saturating_sub(self.dedented_starts[index])
    }
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(index, _)| index + 1)
            .filter(|start| *start < text.len()),
    );
    starts
}
