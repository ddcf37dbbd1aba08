// Reconciling the local collection with a freshly fetched remote batch
use crate::models::Quote;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a remote batch is folded into the local collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Remote records are authoritative and come first. A local record
    /// survives only if its key (id when it has one, text otherwise) does
    /// not collide with a remote record.
    #[default]
    RemoteWins,
    /// Every local record stays in place. Remote records are appended
    /// unless their id is already present.
    KeepAllById,
}

impl MergePolicy {
    pub fn label(&self) -> &'static str {
        match self {
            MergePolicy::RemoteWins => "remote_wins",
            MergePolicy::KeepAllById => "keep_all_by_id",
        }
    }
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What a reconcile did to the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MergeReport {
    /// Distinct records in the remote batch
    pub remote_count: usize,
    /// Local records carried into the result
    pub kept_local: usize,
    /// Local records replaced by a colliding remote record
    pub dropped_local: usize,
    /// Remote records that were not already in the local collection
    pub added_remote: usize,
    /// Size of the merged collection
    pub total: usize,
}

/// Merge `remote` into `local` under `policy`. Pure; the caller persists.
pub fn reconcile(policy: MergePolicy, local: &[Quote], remote: &[Quote]) -> (Vec<Quote>, MergeReport) {
    let remote = dedup_remote(remote);

    match policy {
        MergePolicy::RemoteWins => remote_wins(local, remote),
        MergePolicy::KeepAllById => keep_all_by_id(local, remote),
    }
}

/// Drop repeated ids inside one remote batch, first occurrence wins
fn dedup_remote(remote: &[Quote]) -> Vec<Quote> {
    let mut seen_ids = HashSet::new();
    let mut seen_local_keys = HashSet::new();

    remote
        .iter()
        .filter(|q| match q.id {
            Some(id) => seen_ids.insert(id),
            None => seen_local_keys.insert((q.text.clone(), q.category.clone())),
        })
        .cloned()
        .collect()
}

fn remote_wins(local: &[Quote], remote: Vec<Quote>) -> (Vec<Quote>, MergeReport) {
    let survivors: Vec<Quote> = {
        let remote_ids: HashSet<u64> = remote.iter().filter_map(|q| q.id).collect();
        let remote_texts: HashSet<&str> = remote.iter().map(|q| q.text.as_str()).collect();

        let collides = |q: &Quote| match q.id {
            Some(id) => remote_ids.contains(&id),
            None => remote_texts.contains(q.text.as_str()),
        };

        local.iter().filter(|q| !collides(q)).cloned().collect()
    };
    let dropped_local = local.len() - survivors.len();

    let local_ids: HashSet<u64> = local.iter().filter_map(|q| q.id).collect();
    let added_remote = remote
        .iter()
        .filter(|q| match q.id {
            Some(id) => !local_ids.contains(&id),
            None => !local.iter().any(|l| l.duplicates(q)),
        })
        .count();

    let report = MergeReport {
        remote_count: remote.len(),
        kept_local: survivors.len(),
        dropped_local,
        added_remote,
        total: remote.len() + survivors.len(),
    };

    let mut merged = remote;
    merged.extend(survivors);
    (merged, report)
}

fn keep_all_by_id(local: &[Quote], remote: Vec<Quote>) -> (Vec<Quote>, MergeReport) {
    let mut merged = local.to_vec();
    let mut known_ids: HashSet<u64> = local.iter().filter_map(|q| q.id).collect();
    let remote_count = remote.len();
    let mut added_remote = 0;

    for quote in remote {
        let fresh = match quote.id {
            Some(id) => known_ids.insert(id),
            None => !merged.iter().any(|q| q.duplicates(&quote)),
        };
        if fresh {
            merged.push(quote);
            added_remote += 1;
        }
    }

    let report = MergeReport {
        remote_count,
        kept_local: local.len(),
        dropped_local: 0,
        added_remote,
        total: merged.len(),
    };
    (merged, report)
}
