//! Single-quote literal scanner.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    OutsideLiteral,
    InsideLiteral { start: usize },
}

/// Byte ranges `[start, end)` of every single-quoted literal in `sql`, quotes included.
///
/// A literal ends at the next `'`; there is no escape handling, so `'it''s'` yields two
/// adjacent spans. A trailing quote with no partner does not open a literal.
pub fn literal_spans(sql: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut state = ScanState::OutsideLiteral;

    for (i, b) in sql.bytes().enumerate() {
        if b != b'\'' {
            continue;
        }
        state = match state {
            ScanState::OutsideLiteral => ScanState::InsideLiteral { start: i },
            ScanState::InsideLiteral { start } => {
                spans.push(start..i + 1);
                ScanState::OutsideLiteral
            }
        };
    }

    spans
}

/// `\w` as far as placeholder names are concerned.
pub(crate) fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
