//! Keep the `k` queries whose best match is closest.
//!
//! Each query is searched against the store; its aggregate score is the
//! minimum distance among its matches. A bounded max-heap holds the `k` best
//! aggregates seen so far, evicting the least similar on overflow.

use anyhow::Result;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use ordered_float::OrderedFloat;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::collection::SimilaritySearch;
use crate::models::{Document, QueryMatch};

/// Concurrent store lookups.
const SEARCH_CONCURRENCY: usize = 4;

/// Heap entry ordered by aggregate score, then by reversed query so that
/// among equal scores the lexicographically smallest query sits on top.
struct Ranked(QueryMatch);

impl Ranked {
    fn key(&self) -> (OrderedFloat<f32>, Reverse<&str>) {
        (OrderedFloat(self.0.score), Reverse(self.0.query.as_str()))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Aggregate score of a query's matches: the minimum distance.
fn aggregate(pairs: &[(Document, f32)]) -> Option<f32> {
    pairs
        .iter()
        .map(|(_, score)| OrderedFloat(*score))
        .min()
        .map(|s| s.0)
}

/// Select at most `k` queries by the score of their closest match.
///
/// Returns the retained matches sorted by descending aggregate score, equal
/// scores by descending query. Queries with no matches are skipped.
pub async fn top_k_similar(
    store: &dyn SimilaritySearch,
    queries: &[String],
    k: usize,
    top_docs_per_query: usize,
) -> Result<Vec<QueryMatch>> {
    if k == 0 || queries.is_empty() {
        return Ok(Vec::new());
    }

    let results: Vec<(String, Vec<(Document, f32)>)> = stream::iter(queries)
        .map(|query| async move {
            let pairs = store
                .similarity_search_with_score(query, top_docs_per_query)
                .await?;
            Ok::<_, anyhow::Error>((query.clone(), pairs))
        })
        .buffered(SEARCH_CONCURRENCY)
        .try_collect()
        .await?;

    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (query, pairs) in results {
        let Some(score) = aggregate(&pairs) else {
            tracing::debug!("No matches for query of {} chars, skipping", query.len());
            continue;
        };

        heap.push(Ranked(QueryMatch {
            query,
            documents: pairs.into_iter().map(|(doc, _)| doc).collect(),
            score,
        }));
        if heap.len() > k {
            heap.pop();
        }
    }

    // Descending by score, ties by descending query.
    let mut retained: Vec<QueryMatch> = heap.into_iter().map(|r| r.0).collect();
    retained.sort_by(|a, b| {
        OrderedFloat(b.score)
            .cmp(&OrderedFloat(a.score))
            .then_with(|| b.query.cmp(&a.query))
    });

    tracing::debug!(
        "Top-k kept {} of {} queries, scores {:?}",
        retained.len(),
        queries.len(),
        retained.iter().map(|m| m.score).collect::<Vec<_>>()
    );
    Ok(retained)
}
