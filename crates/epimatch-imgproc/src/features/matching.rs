use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A candidate correspondence between a query and a train descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorMatch {
    /// Index into the query descriptor set.
    pub query_idx: usize,
    /// Index into the train (reference) descriptor set.
    pub train_idx: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Hamming distance between two fixed-size byte descriptors.
#[inline]
pub fn hamming_distance<const N: usize>(a: &[u8; N], b: &[u8; N]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum()
}

/// Brute-force k-nearest-neighbour search under Hamming distance.
///
/// Returns one candidate list per query descriptor, in query order. Each list
/// holds at most `k` matches sorted by ascending distance; equal distances
/// are ordered by ascending train index. When fewer than `k` train
/// descriptors exist the lists are shorter.
///
/// # Arguments
///
/// * `query` - The query descriptors.
/// * `train` - The reference descriptors searched for every query.
/// * `k` - The number of neighbours to keep per query.
pub fn knn_match<const N: usize>(
    query: &[[u8; N]],
    train: &[[u8; N]],
    k: usize,
) -> Vec<Vec<DescriptorMatch>> {
    query
        .par_iter()
        .enumerate()
        .map(|(query_idx, q)| {
            let mut best: Vec<DescriptorMatch> = Vec::with_capacity(k + 1);
            if k == 0 {
                return best;
            }
            for (train_idx, t) in train.iter().enumerate() {
                let distance = hamming_distance(q, t);
                if best.len() == k && distance >= best[k - 1].distance {
                    continue;
                }
                // strict comparison keeps earlier train indices ahead on ties
                let pos = best.partition_point(|m| m.distance <= distance);
                best.insert(
                    pos,
                    DescriptorMatch {
                        query_idx,
                        train_idx,
                        distance,
                    },
                );
                best.truncate(k);
            }
            best
        })
        .collect()
}

/// Result of Lowe's ratio test over per-query candidate lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RatioTestOutput {
    /// Accepted best candidates, in query order.
    pub matches: Vec<DescriptorMatch>,
    /// Queries that had fewer than two candidates.
    pub insufficient_candidates: usize,
    /// Queries whose best candidate was not distinctive enough.
    pub ambiguous: usize,
}

/// Keep the best candidate of each query iff `d1 < ratio * d2`.
///
/// `candidates` are per-query lists sorted by ascending distance, as returned
/// by [`knn_match`]. Queries with fewer than two candidates never produce a
/// match and are counted in [`RatioTestOutput::insufficient_candidates`].
pub fn ratio_test(candidates: &[Vec<DescriptorMatch>], ratio: f32) -> RatioTestOutput {
    let mut output = RatioTestOutput::default();

    for (query_idx, list) in candidates.iter().enumerate() {
        let [best, second, ..] = list.as_slice() else {
            log::debug!(
                "query {query_idx} has {} candidate(s), skipping ratio test",
                list.len()
            );
            output.insufficient_candidates += 1;
            continue;
        };

        if (best.distance as f32) < ratio * second.distance as f32 {
            output.matches.push(*best);
        } else {
            output.ambiguous += 1;
        }
    }

    output
}
