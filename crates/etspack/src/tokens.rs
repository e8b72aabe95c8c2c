//! Literal-aware identifier search and renaming
//!
//! Renaming a bundled symbol must not touch unrelated text: `Foo` inside `FooBar`, or a
//! quoted `'Foo'`, stays as written. The scanner below only records where string literals
//! live; everything outside them is treated as code.

use std::ops::Range;

/// Byte ranges of the string literals (quotes included) in a piece of source
#[derive(Debug, Clone, Default)]
pub struct LiteralMap {
    ranges: Vec<Range<usize>>,
}

impl LiteralMap {
    /// Record the literal ranges of `text`
    ///
    /// Template literals are split at their `${ ... }` interpolations: the interpolated
    /// expression is code, while the `${` and the closing `}` belong to the template.
    pub fn scan(text: &str) -> Self {
        let mut ranges = Vec::new();
        let mut open: Option<(char, usize)> = None;
        let mut escaped = false;
        // Brace depth inside each open interpolation, innermost last
        let mut interpolations: Vec<usize> = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            match open {
                None => match ch {
                    '\'' | '"' | '`' => open = Some((ch, index)),
                    '{' => {
                        if let Some(depth) = interpolations.last_mut() {
                            *depth += 1;
                        }
                    }
                    '}' => match interpolations.last().copied() {
                        Some(0) => {
                            interpolations.pop();
                            open = Some(('`', index));
                        }
                        Some(depth) => {
                            if let Some(last) = interpolations.last_mut() {
                                *last = depth - 1;
                            }
                        }
                        None => {}
                    },
                    _ => {}
                },
                Some((quote, start)) => {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == quote {
                        ranges.push(start..index + ch.len_utf8());
                        open = None;
                    } else if quote == '`'
                        && ch == '$'
                        && chars.next_if(|&(_, next)| next == '{').is_some()
                    {
                        ranges.push(start..index + 2);
                        interpolations.push(0);
                        open = None;
                    } else if ch == '\n' && quote != '`' {
                        // Plain quotes cannot span lines; recover at the line break
                        ranges.push(start..index);
                        open = None;
                    }
                }
            }
        }

        if let Some((_, start)) = open {
            ranges.push(start..text.len());
        }

        Self { ranges }
    }

    /// Whether the byte at `pos` lies outside every string literal
    pub fn is_code(&self, pos: usize) -> bool {
        let index = self.ranges.partition_point(|range| range.end <= pos);
        self.ranges
            .get(index)
            .is_none_or(|range| !range.contains(&pos))
    }
}

pub fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Byte offsets of every whole-word, non-literal occurrence of `word` in `text`
pub fn word_occurrences(text: &str, word: &str, literals: &LiteralMap) -> Vec<usize> {
    if word.is_empty() {
        return Vec::new();
    }

    text.match_indices(word)
        .map(|(start, _)| start)
        .filter(|&start| {
            let before_ok = text[..start]
                .chars()
                .next_back()
                .is_none_or(|ch| !is_identifier_char(ch));
            let after_ok = text[start + word.len()..]
                .chars()
                .next()
                .is_none_or(|ch| !is_identifier_char(ch));
            before_ok && after_ok && literals.is_code(start)
        })
        .collect()
}

/// Replace every whole-word, non-literal occurrence of `original` with `alias`
pub fn rename_identifier(text: &str, original: &str, alias: &str) -> String {
    rename_identifiers(text, &[(original, alias)])
}

/// Apply several renames in a single pass
///
/// Renames do not chain: with `A -> B` and `B -> C`, an `A` in the input becomes `B`,
/// not `C`.
pub fn rename_identifiers(text: &str, renames: &[(&str, &str)]) -> String {
    let literals = LiteralMap::scan(text);
    let mut occurrences: Vec<(usize, &str, &str)> = renames
        .iter()
        .filter(|(original, alias)| original != alias)
        .flat_map(|&(original, alias)| {
            word_occurrences(text, original, &literals)
                .into_iter()
                .map(move |start| (start, original, alias))
        })
        .collect();
    if occurrences.is_empty() {
        return text.to_owned();
    }
    occurrences.sort_by_key(|&(start, _, _)| start);

    let mut renamed = String::with_capacity(text.len());
    let mut last = 0;
    for (start, original, alias) in occurrences {
        if start < last {
            continue;
        }
        renamed.push_str(&text[last..start]);
        renamed.push_str(alias);
        last = start + original.len();
    }
    renamed.push_str(&text[last..]);
    renamed
}
