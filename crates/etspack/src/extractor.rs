//! Declaration extraction for individual symbols
//!
//! Locates the declaration of a symbol in a module, pulls in the decorator lines attached
//! to it, and follows brace or bracket nesting to the end of its body. The walk is a small
//! state machine so each step can be reasoned about on its own.

use std::{ops::Range, path::Path};

use anyhow::Result;
use thiserror::Error;

use crate::{
    import_parser::strip_imports,
    resolver::read_source,
    tokens::{LiteralMap, rename_identifier, word_occurrences},
};

/// Recoverable extraction misses; callers log them and move on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("symbol '{0}' not found")]
    SymbolNotFound(String),
    #[error("no opening brace or bracket on the declaration line of '{0}'")]
    NoDelimiter(String),
    #[error("declaration of '{0}' is not closed before the end of the module")]
    Unbalanced(String),
}

#[derive(Debug, Clone, Copy)]
enum Delimiter {
    Brace,
    Bracket,
}

impl Delimiter {
    const fn pair(self) -> (char, char) {
        match self {
            Self::Brace => ('{', '}'),
            Self::Bracket => ('[', ']'),
        }
    }
}

#[derive(Debug)]
enum State {
    SeekSymbol,
    SeekDecoratorStart {
        start: usize,
        symbol_line: usize,
    },
    SeekDelimiter {
        start: usize,
        symbol_line: usize,
    },
    Balancing {
        start: usize,
        line: usize,
        delimiter: Delimiter,
        depth: i64,
        opened: bool,
    },
    Done {
        start: usize,
        end: usize,
    },
}

/// Extract the declaration of `original` from `source`, renamed to `alias`
///
/// The region starts at the first line naming `original` as a whole word (outside string
/// literals), extended upward over `@` decorator lines, and ends on the line where the
/// first `{` or `[` of the declaration line is balanced again.
pub fn extract_region(source: &str, original: &str, alias: &str) -> Result<String, ExtractError> {
    let literals = LiteralMap::scan(source);
    let lines = line_spans(source);
    let mut state = State::SeekSymbol;

    let (start, end) = loop {
        state = match state {
            State::SeekSymbol => {
                let offset = word_occurrences(source, original, &literals)
                    .first()
                    .copied()
                    .ok_or_else(|| ExtractError::SymbolNotFound(original.to_owned()))?;
                let symbol_line = lines.partition_point(|span| span.end <= offset);
                State::SeekDecoratorStart {
                    start: symbol_line,
                    symbol_line,
                }
            }
            State::SeekDecoratorStart { start, symbol_line } => {
                let decorated = start > 0
                    && source[lines[start - 1].clone()]
                        .trim_start()
                        .starts_with('@');
                if decorated {
                    State::SeekDecoratorStart {
                        start: start - 1,
                        symbol_line,
                    }
                } else {
                    State::SeekDelimiter { start, symbol_line }
                }
            }
            State::SeekDelimiter { start, symbol_line } => {
                let span = lines[symbol_line].clone();
                let delimiter = source[span.clone()]
                    .char_indices()
                    .filter(|&(index, _)| literals.is_code(span.start + index))
                    .find_map(|(_, ch)| match ch {
                        '{' => Some(Delimiter::Brace),
                        '[' => Some(Delimiter::Bracket),
                        _ => None,
                    })
                    .ok_or_else(|| ExtractError::NoDelimiter(original.to_owned()))?;
                State::Balancing {
                    start,
                    line: symbol_line,
                    delimiter,
                    depth: 0,
                    opened: false,
                }
            }
            State::Balancing {
                start,
                line,
                delimiter,
                mut depth,
                mut opened,
            } => {
                let span = lines
                    .get(line)
                    .cloned()
                    .ok_or_else(|| ExtractError::Unbalanced(original.to_owned()))?;
                let (open, close) = delimiter.pair();
                for (index, ch) in source[span.clone()].char_indices() {
                    if !literals.is_code(span.start + index) {
                        continue;
                    }
                    if ch == open {
                        depth += 1;
                        opened = true;
                    } else if ch == close {
                        depth -= 1;
                    }
                }
                if opened && depth == 0 {
                    State::Done { start, end: line }
                } else {
                    State::Balancing {
                        start,
                        line: line + 1,
                        delimiter,
                        depth,
                        opened,
                    }
                }
            }
            State::Done { start, end } => break (start, end),
        };
    };

    let region = &source[lines[start].start..lines[end].end];
    Ok(rename_identifier(region, original, alias))
}

/// Read `path`, strip its comments and imports, and extract the declaration of `original`
///
/// I/O failures are returned as errors; extraction misses come back as an
/// [`ExtractError`] inside the error and can be recovered with `downcast_ref`.
pub fn extract_symbol(path: &Path, original: &str, alias: &str) -> Result<String> {
    let source = strip_imports(&read_source(path)?);
    Ok(extract_region(&source, original, alias)?)
}

/// Byte spans of each line, line terminators included
fn line_spans(source: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for line in source.split_inclusive('\n') {
        spans.push(start..start + line.len());
        start += line.len();
    }
    spans
}
