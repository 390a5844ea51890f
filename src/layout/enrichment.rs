/*!
 * Boundary with the enrichment collaborator.
 *
 * Enrichment (importance scoring, character identification, genre) is
 * produced elsewhere; this module only defines the shape it arrives in and
 * how it is folded into an extracted layout before playback.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::layout::model::{DEFAULT_SCORE, DocumentLayout};

/// Per-word overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordEnrichment {
    pub word_index: usize,
    #[serde(default)]
    pub importance_score: Option<f32>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub is_keyword: Option<bool>,
}

/// Enrichment for one line. Absent fields fall back to the neutral defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineEnrichment {
    #[serde(default)]
    pub page_index: usize,
    pub line_index: usize,
    #[serde(default)]
    pub importance_score: Option<f32>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub key_concepts: Option<Vec<String>>,
    #[serde(default)]
    pub reading_difficulty: Option<f32>,
    #[serde(default)]
    pub words: Vec<WordEnrichment>,
}

/// Document-level enrichment plus per-line entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentEnrichment {
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub reading_level: Option<String>,
    #[serde(default)]
    pub lines: Vec<LineEnrichment>,
}

fn clamp_score(score: Option<f32>) -> f32 {
    score.map(|s| s.clamp(0.0, 1.0)).unwrap_or(DEFAULT_SCORE)
}

impl DocumentEnrichment {
    /// Fold the enrichment into a layout. Returns the number of lines updated;
    /// entries addressing lines that do not exist are skipped.
    pub fn apply(&self, layout: &mut DocumentLayout) -> usize {
        layout.characters = self.characters.clone();
        layout.genre = self.genre.clone();
        layout.reading_level = self.reading_level.clone();

        let mut applied = 0;
        for entry in &self.lines {
            let Some(line) = layout.line_mut(entry.page_index, entry.line_index) else {
                warn!(
                    "Enrichment for missing line {}:{} ignored",
                    entry.page_index, entry.line_index
                );
                continue;
            };

            line.importance_score = clamp_score(entry.importance_score);
            line.reading_difficulty = clamp_score(entry.reading_difficulty);
            line.character = entry.character.clone();
            line.key_concepts = entry.key_concepts.clone().unwrap_or_default();

            for word_entry in &entry.words {
                if let Some(word) = line.words.get_mut(word_entry.word_index) {
                    word.importance_score = clamp_score(word_entry.importance_score);
                    word.character = word_entry.character.clone();
                    word.is_keyword = word_entry.is_keyword.unwrap_or(false);
                }
            }
            applied += 1;
        }

        debug!("Applied enrichment to {} line(s)", applied);
        applied
    }
}
