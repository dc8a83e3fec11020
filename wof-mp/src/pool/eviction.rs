//! Eviction candidate selection
//!
//! Only hidden handles are candidates. Candidates are ordered least recently
//! used first (timestamp, then use counter for equal timestamps).

use std::time::Duration;
use tokio::time::Instant;
use wof_common::CardId;

/// Recency view of one live handle
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub id: &'a CardId,
    pub visible: bool,
    pub last_used_at: Instant,
    pub last_used_seq: u64,
}

/// Hidden handles, oldest first
pub fn lru_order<'a, I>(candidates: I) -> Vec<Candidate<'a>>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    let mut hidden: Vec<Candidate<'a>> = candidates.into_iter().filter(|c| !c.visible).collect();
    hidden.sort_by_key(|c| (c.last_used_at, c.last_used_seq));
    hidden
}

/// Ids to evict so that `live` drops to `target` (or as close as hidden
/// handles allow)
pub fn select_for_capacity<'a, I>(candidates: I, live: usize, target: usize) -> Vec<CardId>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    let excess = live.saturating_sub(target);
    if excess == 0 {
        return Vec::new();
    }
    lru_order(candidates)
        .into_iter()
        .take(excess)
        .map(|c| c.id.clone())
        .collect()
}

/// Hidden handles unused for longer than `max_idle`, oldest first
pub fn select_idle<'a, I>(candidates: I, now: Instant, max_idle: Duration) -> Vec<CardId>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    lru_order(candidates)
        .into_iter()
        .filter(|c| now.saturating_duration_since(c.last_used_at) > max_idle)
        .map(|c| c.id.clone())
        .collect()
}
