//! Batch partitioning and seeded sampling
//!
//! Submitted entities are partitioned by (section, entity type) and each
//! partition is sampled on its own, so rare types are never starved by
//! common ones.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tix_batch::{BatchData, BatchEntity};

/// Section name to entity type to entities
pub type Partitions = IndexMap<String, IndexMap<String, Vec<BatchEntity>>>;

/// How much of a batch to validate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleCriteria {
    /// Share of every partition to validate
    pub percent: f64,
    /// Absolute number of entities, converted to a percentage of the batch
    pub count: Option<usize>,
}

impl SampleCriteria {
    /// Validate a share of each partition
    #[inline]
    #[must_use]
    pub fn percent(percent: f64) -> Self {
        Self {
            percent,
            count: None,
        }
    }

    /// Validate roughly `count` entities
    #[inline]
    #[must_use]
    pub fn count(count: usize) -> Self {
        Self {
            percent: 100.0,
            count: Some(count),
        }
    }

    /// Effective percentage for a batch of `total` entities
    ///
    /// A count becomes `count / total` as a percentage rounded to two
    /// places, capped at 100.
    #[must_use]
    pub fn effective_percent(&self, total: usize) -> f64 {
        match self.count {
            Some(count) if count > 0 => {
                if total == 0 || count >= total {
                    100.0
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let pct = count as f64 / total as f64 * 100.0;
                    (pct * 100.0).round() / 100.0
                }
            }
            _ => self.percent.clamp(0.0, 100.0),
        }
    }
}

impl Default for SampleCriteria {
    fn default() -> Self {
        Self::percent(100.0)
    }
}

/// Merge batch documents into partitions
#[must_use]
pub fn partition<'a>(documents: impl IntoIterator<Item = &'a BatchData>) -> Partitions {
    let mut partitions = Partitions::new();
    for data in documents {
        for (section, entities) in data.sections() {
            let by_type = partitions.entry(section.to_string()).or_default();
            for entity in entities {
                by_type
                    .entry(entity.kind.clone())
                    .or_default()
                    .push(entity.clone());
            }
        }
    }
    partitions
}

/// Number of entities across all partitions
#[must_use]
pub fn partition_total(partitions: &Partitions) -> usize {
    partitions
        .values()
        .flat_map(IndexMap::values)
        .map(Vec::len)
        .sum()
}

/// Sample size for a partition: `ceil(len * percent / 100)`
#[must_use]
pub fn sample_size(len: usize, percent: f64) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let size = (len as f64 * percent.clamp(0.0, 100.0) / 100.0).ceil() as usize;
    size.min(len)
}

/// Seeded sampler without replacement
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Create sampler from a seed
    #[inline]
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sample a share of `items`, keeping their original order
    pub fn sample<'a, T>(&mut self, items: &'a [T], percent: f64) -> Vec<&'a T> {
        let amount = sample_size(items.len(), percent);
        let mut picked = rand::seq::index::sample(&mut self.rng, items.len(), amount).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| &items[i]).collect()
    }

    /// Sample every partition independently
    pub fn sample_partitions<'a>(&mut self, partitions: &'a Partitions, percent: f64) -> Vec<&'a BatchEntity> {
        let mut sampled = Vec::new();
        for by_type in partitions.values() {
            for entities in by_type.values() {
                sampled.extend(self.sample(entities, percent));
            }
        }
        sampled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tix_batch::{BatchSubmission, GroupBuilder, IndicatorBuilder};

    fn data() -> BatchData {
        let mut submission = BatchSubmission::new();
        for i in 0..10 {
            submission.add_indicator(IndicatorBuilder::new("Host", format!("h{i}.com")));
        }
        submission.add_indicator(IndicatorBuilder::new("Address", "10.0.0.1"));
        submission.add_group(GroupBuilder::new("Threat", "t"));
        submission.data()
    }

    #[test]
    fn partitions_by_section_and_type() {
        let data = data();
        let partitions = partition([&data, &data]);
        assert_eq!(partitions["indicator"]["Host"].len(), 20);
        assert_eq!(partitions["indicator"]["Address"].len(), 2);
        assert_eq!(partitions["group"]["Threat"].len(), 2);
        assert_eq!(partition_total(&partitions), 24);
    }

    #[test]
    fn sample_sizes_round_up() {
        assert_eq!(sample_size(10, 10.0), 1);
        assert_eq!(sample_size(10, 11.0), 2);
        assert_eq!(sample_size(1, 1.0), 1);
        assert_eq!(sample_size(0, 50.0), 0);
        assert_eq!(sample_size(4, 100.0), 4);
        assert_eq!(sample_size(4, 0.0), 0);
    }

    #[test]
    fn rare_types_are_not_starved() {
        let data = data();
        let partitions = partition([&data]);
        let sampled = Sampler::new(1).sample_partitions(&partitions, 10.0);
        assert_eq!(sampled.len(), 3);
        assert!(sampled.iter().any(|e| e.kind == "Address"));
        assert!(sampled.iter().any(|e| e.kind == "Threat"));
    }

    #[test]
    fn count_converts_to_percent() {
        assert!((SampleCriteria::count(3).effective_percent(12) - 25.0).abs() < f64::EPSILON);
        assert!((SampleCriteria::count(1).effective_percent(3) - 33.33).abs() < 1e-9);
        assert!((SampleCriteria::count(50).effective_percent(12) - 100.0).abs() < f64::EPSILON);
        assert!((SampleCriteria::percent(40.0).effective_percent(12) - 40.0).abs() < f64::EPSILON);
    }
}
