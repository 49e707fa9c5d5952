use crate::config::SubwordScheme;
use crate::result::{ImportanceEntry, TokenScore};

const BYTE_LEVEL_SPACE: char = 'Ġ';
const WORDPIECE_CONTINUATION: &str = "##";

fn starts_word(text: &str, scheme: SubwordScheme) -> bool {
    match scheme {
        SubwordScheme::ByteLevel => text.starts_with(BYTE_LEVEL_SPACE),
        SubwordScheme::WordPiece => !text.starts_with(WORDPIECE_CONTINUATION),
    }
}

fn display_fragment(text: &str, scheme: SubwordScheme) -> &str {
    match scheme {
        SubwordScheme::ByteLevel => text.trim_start_matches(BYTE_LEVEL_SPACE),
        SubwordScheme::WordPiece => text.strip_prefix(WORDPIECE_CONTINUATION).unwrap_or(text),
    }
}

/// Merges adjacent sub-word tokens of one segment into display units.
///
/// A unit takes the scores of its fragment with the largest |normalized score|.
pub(crate) fn merge_subwords(tokens: &[TokenScore], scheme: SubwordScheme) -> Vec<ImportanceEntry> {
    let mut entries: Vec<ImportanceEntry> = Vec::new();
    // Fragment the current unit's scores come from.
    let mut leader: Option<(Option<f64>, Option<f64>)> = None;
    let mut prev: Option<&TokenScore> = None;

    for token in tokens {
        let continues = prev.is_some_and(|p| {
            p.segment_index == token.segment_index
                && p.position + 1 == token.position
                && !starts_word(&token.text, scheme)
        });

        match entries.last_mut() {
            Some(entry) if continues => {
                entry.text.push_str(display_fragment(&token.text, scheme));
                entry.positions.push(token.position);
                entry.in_explanation |= token.in_explanation;
                if outranks(token.score, leader.and_then(|(_, s)| s)) {
                    leader = Some((token.raw_score, token.score));
                    entry.raw_score = token.raw_score;
                    entry.score = token.score;
                }
            }
            _ => {
                leader = Some((token.raw_score, token.score));
                entries.push(ImportanceEntry {
                    text: display_fragment(&token.text, scheme).to_string(),
                    segment: token.segment,
                    positions: vec![token.position],
                    raw_score: token.raw_score,
                    score: token.score,
                    in_explanation: token.in_explanation,
                });
            }
        }
        prev = Some(token);
    }

    entries
}

fn outranks(candidate: Option<f64>, current: Option<f64>) -> bool {
    match (candidate, current) {
        (Some(c), Some(cur)) => c.abs() > cur.abs(),
        (Some(_), None) => true,
        (None, _) => false,
    }
}
