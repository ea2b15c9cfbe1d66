//! Sample deriver
//!
//! Resolves the sample an action produces: the source itself, a sample
//! already derived earlier in the same request, or a new row.

use crate::strategy::DerivationTarget;
use labtrack_model::{BioStateId, NewSample, Sample, SampleId};
use labtrack_store::{SampleRepo, StoreError};
use std::collections::HashMap;

/// How a produced sample was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// Target equals the source; no new identity
    Unchanged(Sample),
    /// Same derived identity was created earlier in this request
    Cached(Sample),
    /// New sample row
    Created(Sample),
}

impl Derivation {
    /// Produced sample
    #[inline]
    #[must_use]
    pub fn sample(&self) -> &Sample {
        match self {
            Self::Unchanged(s) | Self::Cached(s) | Self::Created(s) => s,
        }
    }

    /// Whether the produced sample differs from the source
    #[inline]
    #[must_use]
    pub fn is_derived(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }

    /// Consume into the produced sample
    #[inline]
    #[must_use]
    pub fn into_sample(self) -> Sample {
        match self {
            Self::Unchanged(s) | Self::Cached(s) | Self::Created(s) => s,
        }
    }
}

type DerivationKey = (SampleId, Option<i32>, BioStateId);

/// Request-scoped derived-sample cache
///
/// Not shared across requests: no uniqueness is enforced between separate
/// confirmations.
#[derive(Debug, Default)]
pub struct SampleDeriver {
    cache: HashMap<DerivationKey, Sample>,
}

impl SampleDeriver {
    /// Create empty deriver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples created through this deriver
    #[inline]
    #[must_use]
    pub fn created(&self) -> usize {
        self.cache.len()
    }

    /// Resolve the produced sample for `source` and `target`
    ///
    /// # Errors
    /// Returns error if the new sample cannot be persisted
    pub fn get_or_create<S: SampleRepo + ?Sized>(
        &mut self,
        store: &mut S,
        source: &Sample,
        target: DerivationTarget,
    ) -> Result<Derivation, StoreError> {
        let section_same = target.section.map_or(true, |s| source.section == Some(s));
        let bio_state_same = target.bio_state.map_or(true, |b| source.bio_state == b);
        if section_same && bio_state_same {
            return Ok(Derivation::Unchanged(source.clone()));
        }

        let section = target.section.or(source.section);
        let bio_state = target.bio_state.unwrap_or(source.bio_state);
        let key = (source.id, section, bio_state);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(source = %source.id, sample = %cached.id, "derived sample cache hit");
            return Ok(Derivation::Cached(cached.clone()));
        }

        let created = store.create_sample(NewSample {
            section,
            tissue_id: source.tissue_id,
            bio_state,
        })?;
        tracing::debug!(
            source = %source.id,
            sample = %created.id,
            section = ?section,
            "derived new sample"
        );
        self.cache.insert(key, created.clone());
        Ok(Derivation::Created(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrack_model::TissueId;

    /// Sample repo that only counts creations
    #[derive(Default)]
    struct CountingRepo {
        next: u64,
    }

    impl SampleRepo for CountingRepo {
        fn create_sample(&mut self, sample: NewSample) -> Result<Sample, StoreError> {
            self.next += 1;
            Ok(Sample {
                id: SampleId(1000 + self.next),
                section: sample.section,
                tissue_id: sample.tissue_id,
                bio_state: sample.bio_state,
            })
        }
    }

    fn block() -> Sample {
        Sample {
            id: SampleId(1),
            section: None,
            tissue_id: TissueId(4),
            bio_state: BioStateId(1),
        }
    }

    fn target(section: Option<i32>, bio_state: Option<u64>) -> DerivationTarget {
        DerivationTarget {
            section,
            bio_state: bio_state.map(BioStateId),
        }
    }

    #[test]
    fn no_change_returns_source() {
        let mut repo = CountingRepo::default();
        let mut deriver = SampleDeriver::new();

        let d = deriver.get_or_create(&mut repo, &block(), target(None, None)).unwrap();
        assert_eq!(d, Derivation::Unchanged(block()));

        let d = deriver.get_or_create(&mut repo, &block(), target(None, Some(1))).unwrap();
        assert!(!d.is_derived());
        assert_eq!(repo.next, 0);
    }

    #[test]
    fn new_section_creates_sample_with_source_tissue() {
        let mut repo = CountingRepo::default();
        let mut deriver = SampleDeriver::new();

        let d = deriver.get_or_create(&mut repo, &block(), target(Some(3), None)).unwrap();
        assert!(matches!(d, Derivation::Created(_)));
        let s = d.into_sample();
        assert_eq!(s.section, Some(3));
        assert_eq!(s.tissue_id, TissueId(4));
        assert_eq!(s.bio_state, BioStateId(1));
    }

    #[test]
    fn repeated_target_hits_cache() {
        let mut repo = CountingRepo::default();
        let mut deriver = SampleDeriver::new();

        let first = deriver.get_or_create(&mut repo, &block(), target(None, Some(2))).unwrap();
        let second = deriver.get_or_create(&mut repo, &block(), target(None, Some(2))).unwrap();
        assert!(matches!(second, Derivation::Cached(_)));
        assert_eq!(first.sample().id, second.sample().id);
        assert_eq!(repo.next, 1);
        assert_eq!(deriver.created(), 1);
    }

    #[test]
    fn different_targets_are_distinct() {
        let mut repo = CountingRepo::default();
        let mut deriver = SampleDeriver::new();

        let a = deriver.get_or_create(&mut repo, &block(), target(Some(1), None)).unwrap();
        let b = deriver.get_or_create(&mut repo, &block(), target(Some(2), None)).unwrap();
        let c = deriver.get_or_create(&mut repo, &block(), target(Some(1), Some(2))).unwrap();
        assert_ne!(a.sample().id, b.sample().id);
        assert_ne!(a.sample().id, c.sample().id);
        assert_eq!(repo.next, 3);
    }

    #[test]
    fn section_matching_source_is_unchanged() {
        let mut repo = CountingRepo::default();
        let mut deriver = SampleDeriver::new();
        let section = Sample {
            section: Some(5),
            ..block()
        };
        let d = deriver.get_or_create(&mut repo, &section, target(Some(5), None)).unwrap();
        assert!(!d.is_derived());
    }
}
