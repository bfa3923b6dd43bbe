//! Best-match selection over catalog search hits.
//!
//! Candidates are only eligible when their numeric prefix equals the local
//! model's. Among those, an inventory intersection is tried first, then plain
//! keyword overlap, then a document-frequency weighted tie-break.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::catalog::SearchHit;
use crate::config::MatchingConfig;
use crate::inventory::Inventory;
use crate::keywords::{keywords, KeywordSet};
use crate::model::numeric_prefix;

const SCORE_EPSILON: f64 = 1e-9;

/// How a catalog ID was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Direct,
    EmbeddedId,
    Inventory,
    KeywordOverlap,
    WeightedOverlap,
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Direct => "direct",
            MatchMethod::EmbeddedId => "embedded_id",
            MatchMethod::Inventory => "inventory",
            MatchMethod::KeywordOverlap => "keyword_overlap",
            MatchMethod::WeightedOverlap => "weighted_overlap",
            MatchMethod::None => "none",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub rank: usize,
    pub item_no: String,
    pub number: Option<u64>,
    pub tokens: KeywordSet,
}

impl Candidate {
    pub fn from_hit(hit: &SearchHit) -> Self {
        Self {
            rank: hit.rank,
            item_no: hit.item_no.clone(),
            number: numeric_prefix(&hit.item_no),
            tokens: keywords(&hit.name),
        }
    }

    pub fn overlap(&self, keywords: &KeywordSet) -> usize {
        self.tokens.intersection(keywords).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub item_no: String,
    pub method: MatchMethod,
    pub overlap: usize,
    pub score: f64,
}

/// Token document frequencies over the eligible candidates
struct DocumentFrequency {
    total: usize,
    counts: HashMap<String, usize>,
}

impl DocumentFrequency {
    fn new(pool: &[&Candidate]) -> Self {
        let mut counts = HashMap::new();
        for candidate in pool {
            for token in &candidate.tokens {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
        }
        Self {
            total: pool.len(),
            counts,
        }
    }

    fn weight(&self, token: &str) -> f64 {
        match self.counts.get(token) {
            Some(&df) if df > 0 => (1.0 + self.total as f64 / df as f64).ln(),
            _ => 0.0,
        }
    }

    fn score(&self, candidate: &Candidate, keywords: &KeywordSet) -> f64 {
        candidate
            .tokens
            .intersection(keywords)
            .map(|token| self.weight(token))
            .sum()
    }
}

pub fn candidates_from_hits(hits: &[SearchHit]) -> Vec<Candidate> {
    hits.iter().map(Candidate::from_hit).collect()
}

/// Pick the catalog item that best matches a local model.
///
/// Returns `None` when no eligible candidate shares at least one keyword,
/// unless the inventory narrows the pool to exactly one item.
pub fn select_best(
    candidates: &[Candidate],
    keywords: &KeywordSet,
    number: u64,
    inventory: Option<&Inventory>,
    matching: &MatchingConfig,
) -> Option<Selection> {
    let eligible: Vec<&Candidate> = candidates
        .iter()
        .filter(|candidate| {
            let eligible = candidate.number == Some(number);
            if !eligible {
                debug!("Skipping ineligible {}", candidate.item_no);
            }
            eligible
        })
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let mut pool = eligible.clone();

    let mut via_inventory = false;
    if matching.use_inventory {
        if let Some(inventory) = inventory.filter(|inventory| !inventory.is_empty()) {
            let owned: Vec<&Candidate> = pool
                .iter()
                .copied()
                .filter(|candidate| inventory.contains(&candidate.item_no))
                .collect();

            match owned.len() {
                0 => {}
                1 => {
                    let only = owned[0];
                    debug!("Inventory narrows candidates to {}", only.item_no);
                    return Some(Selection {
                        item_no: only.item_no.clone(),
                        method: MatchMethod::Inventory,
                        overlap: only.overlap(keywords),
                        score: only.overlap(keywords) as f64,
                    });
                }
                _ => {
                    debug!("Inventory narrows candidates to {} items", owned.len());
                    pool = owned;
                    via_inventory = true;
                }
            }
        }
    }

    let scored: Vec<(&Candidate, usize)> = pool
        .iter()
        .map(|candidate| (*candidate, candidate.overlap(keywords)))
        .collect();
    for (candidate, overlap) in &scored {
        debug!("{} (rank {}) overlaps {} keywords", candidate.item_no, candidate.rank, overlap);
    }

    let best = scored.iter().map(|(_, overlap)| *overlap).max().unwrap_or(0);
    if best == 0 {
        return None;
    }

    let mut top: Vec<&Candidate> = scored
        .iter()
        .filter(|(_, overlap)| *overlap == best)
        .map(|(candidate, _)| *candidate)
        .collect();
    top.sort_by_key(|candidate| candidate.rank);

    let tag = |method: MatchMethod| if via_inventory { MatchMethod::Inventory } else { method };

    if top.len() == 1 || !matching.weighted_fallback {
        return Some(Selection {
            item_no: top[0].item_no.clone(),
            method: tag(MatchMethod::KeywordOverlap),
            overlap: best,
            score: best as f64,
        });
    }

    // rarity is judged against every eligible hit, not just the owned ones
    let frequencies = DocumentFrequency::new(&eligible);
    let mut winner = top[0];
    let mut winner_score = frequencies.score(winner, keywords);
    for &candidate in &top[1..] {
        let score = frequencies.score(candidate, keywords);
        if score > winner_score + SCORE_EPSILON {
            winner = candidate;
            winner_score = score;
        }
    }
    debug!(
        "{} candidates tied at overlap {}; weighted score picks {} ({:.3})",
        top.len(),
        best,
        winner.item_no,
        winner_score
    );

    Some(Selection {
        item_no: winner.item_no.clone(),
        method: tag(MatchMethod::WeightedOverlap),
        overlap: best,
        score: winner_score,
    })
}
