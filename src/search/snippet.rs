//! Snippet generation
//!
//! A snippet is built from the visible text of a page: every word whose
//! lemma belongs to the query is wrapped in `<b>..</b>`, and a window of text
//! is cut around the first occurrence of each matched lemma.

use crate::lemma::Lemmatizer;
use std::collections::HashSet;

/// Characters of context shared between all matched lemmas
pub const CONTEXT_BUDGET: usize = 160;

/// Minimum context on each side of one match
pub const MIN_CONTEXT: usize = 25;

const OPEN: &str = "<b>";
const CLOSE: &str = "</b>";
const SEPARATOR: &str = " ... ";
const TRAILER: &str = " ...";

/// Highlighted text plus the first occurrence of every matched lemma
struct Highlighted {
    buffer: Vec<char>,
    /// (start, end) of the first highlighted word per lemma, markers included,
    /// in text order
    first_matches: Vec<(usize, usize)>,
}

fn highlight(text: &str, query_lemmas: &HashSet<String>, lemmatizer: &Lemmatizer) -> Highlighted {
    let mut buffer = Vec::with_capacity(text.len());
    let mut first_matches = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut word = String::new();

    let mut flush = |word: &mut String, buffer: &mut Vec<char>| {
        if word.is_empty() {
            return;
        }
        match lemmatizer.lemma_of(word) {
            Some(lemma) if query_lemmas.contains(&lemma) => {
                let start = buffer.len();
                buffer.extend(OPEN.chars());
                buffer.extend(word.chars());
                buffer.extend(CLOSE.chars());
                if seen.insert(lemma) {
                    first_matches.push((start, buffer.len()));
                }
            }
            _ => buffer.extend(word.chars()),
        }
        word.clear();
    };

    for c in text.chars() {
        if c.is_alphabetic() {
            word.push(c);
        } else {
            flush(&mut word, &mut buffer);
            buffer.push(c);
        }
    }
    flush(&mut word, &mut buffer);

    Highlighted {
        buffer,
        first_matches,
    }
}

/// Moves a window start forward to the beginning of a whole word, never past `limit`
fn align_start(buffer: &[char], start: usize, limit: usize) -> usize {
    if start == 0 || buffer[start - 1].is_whitespace() {
        return start;
    }
    buffer[start..limit]
        .iter()
        .position(|c| c.is_whitespace())
        .map(|offset| start + offset + 1)
        .unwrap_or(limit)
}

/// Moves a window end back to the end of a whole word, never before `limit`
fn align_end(buffer: &[char], end: usize, limit: usize) -> usize {
    if end >= buffer.len() || buffer[end].is_whitespace() {
        return end.min(buffer.len());
    }
    buffer[limit..end]
        .iter()
        .rposition(|c| c.is_whitespace())
        .map(|offset| limit + offset)
        .unwrap_or(limit)
}

/// Builds the snippet for one page
///
/// `text` is the page's visible text, `query_lemmas` the lemmas of the
/// query. The result always ends with an ellipsis.
pub fn build_snippet(text: &str, query_lemmas: &HashSet<String>, lemmatizer: &Lemmatizer) -> String {
    let Highlighted {
        buffer,
        first_matches,
    } = highlight(text, query_lemmas, lemmatizer);

    if first_matches.is_empty() {
        return leading_text(&buffer);
    }

    let context = (CONTEXT_BUDGET / first_matches.len()).max(MIN_CONTEXT);

    // merge overlapping or touching windows so no text repeats
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for (word_start, word_end) in first_matches {
        let start = align_start(&buffer, word_start.saturating_sub(context), word_start);
        let end = align_end(&buffer, word_end + context, word_end);

        match windows.last_mut() {
            Some(previous) if start <= previous.1 => previous.1 = previous.1.max(end),
            _ => windows.push((start, end)),
        }
    }

    let fragments: Vec<String> = windows
        .iter()
        .map(|(start, end)| buffer[*start..*end].iter().collect::<String>().trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect();

    format!("{}{}", fragments.join(SEPARATOR), TRAILER)
}

/// Opening words of the page, used when no query word appears in its text
fn leading_text(buffer: &[char]) -> String {
    let end = align_end(buffer, CONTEXT_BUDGET.min(buffer.len()), 0);
    let lead: String = buffer[..end].iter().collect();
    let lead = lead.trim();
    if lead.is_empty() {
        return TRAILER.trim_start().to_string();
    }
    format!("{}{}", lead, TRAILER)
}
