//! Scoring: compare the word placed on each region with the word authored for it.
//!
//! Comparison is by exact text, so two labels carrying the same word are
//! interchangeable. Regions without a placement simply score nothing.

#[cfg(test)]
#[path = "scoring_test.rs"]
mod scoring_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::doc::{Label, LabelId, RegionId};
use crate::placement::PlacementMap;

/// Outcome for a single region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionResult {
    pub region: RegionId,
    pub expected: String,
    pub placed: Option<String>,
    pub correct: bool,
}

/// Aggregate result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: u32,
    pub max_score: u32,
    /// `round(score / max_score * 100)`; zero when there is nothing to score.
    pub percentage: u32,
    /// Display-only pass flag; not a submission gate.
    pub passed: bool,
    pub regions: Vec<RegionResult>,
}

/// Score `placements` against the expected word of every region.
///
/// `expected` yields `(region, word)` pairs in region order; `labels` is the
/// pool the placement map refers to.
#[must_use]
pub fn score<'a, I>(expected: I, labels: &[Label], placements: &PlacementMap, pass_percentage: u32) -> ScoreReport
where
    I: IntoIterator<Item = (RegionId, &'a str)>,
{
    let text_of: HashMap<LabelId, &str> = labels.iter().map(|l| (l.id, l.text.as_str())).collect();

    let regions: Vec<RegionResult> = expected
        .into_iter()
        .map(|(region, word)| {
            let placed = placements
                .get(&region)
                .and_then(|label| text_of.get(label))
                .map(|text| (*text).to_owned());
            let correct = placed.as_deref() == Some(word);
            RegionResult { region, expected: word.to_owned(), placed, correct }
        })
        .collect();

    let max_score = u32::try_from(regions.len()).unwrap_or(u32::MAX);
    let score = u32::try_from(regions.iter().filter(|r| r.correct).count()).unwrap_or(u32::MAX);
    let percentage = percentage(score, max_score);

    ScoreReport { score, max_score, percentage, passed: max_score > 0 && percentage >= pass_percentage, regions }
}

fn percentage(score: u32, max_score: u32) -> u32 {
    if max_score == 0 {
        return 0;
    }
    let pct = (f64::from(score) / f64::from(max_score) * 100.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        pct as u32
    }
}
