/*!
 * Word timing tables.
 *
 * Timings are an equal-width partition of a line's audio across its words.
 * This is an approximation: no phoneme alignment is performed.
 */

use serde::{Deserialize, Serialize};

/// Millisecond interval attributed to one word of a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word_index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default)]
    pub character: Option<String>,
}

/// `round(numerator / denominator)` with halves rounded up
fn rounded_div(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Partition `duration_ms` across the whitespace-delimited words of `text`.
///
/// Word `i` of `n` covers `[round(i·D/n), round((i+1)·D/n))`, so the slots are
/// contiguous, the first starts at 0 and the last ends exactly at D. Text
/// without words yields an empty table.
pub fn word_timings(text: &str, duration_ms: u64, character: Option<&str>) -> Vec<WordTiming> {
    let count = text.split_whitespace().count() as u64;
    if count == 0 {
        return Vec::new();
    }

    (0..count)
        .map(|i| WordTiming {
            word_index: i as usize,
            start_ms: rounded_div(i * duration_ms, count),
            end_ms: rounded_div((i + 1) * duration_ms, count),
            character: character.map(str::to_string),
        })
        .collect()
}

/// Duration covered by a timing table, if it has any entries
pub fn total_duration_ms(timings: &[WordTiming]) -> Option<u64> {
    timings.iter().map(|t| t.end_ms).max()
}
