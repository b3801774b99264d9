//! Fixed-size demographic histograms and the attribute → bucket mapping.
//!
//! Bucket indices are range-checked once, when an attribute is mapped into a
//! [`Bucket`]. A `Histogram<N>` only accepts `Bucket<N>`, so recording can
//! never index out of bounds.

pub const AGE_BUCKETS: usize = 4;
pub const GENDER_BUCKETS: usize = 2;
pub const POSE_BUCKETS: usize = 3;

/// Upper bounds (inclusive) of the first two yaw/pitch buckets
pub const POSE_THRESHOLDS: [f32; POSE_BUCKETS - 1] = [0.38, 0.54];

/// A bucket index known to be below `N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket<const N: usize>(usize);

impl<const N: usize> Bucket<N> {
    pub fn new(index: usize) -> Option<Self> {
        (index < N).then_some(Self(index))
    }

    /// Saturates at the last bucket
    pub fn clamped(index: usize) -> Self {
        Self(index.min(N - 1))
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// floor(age / width), clamped to the age buckets. Negative or NaN ages land
/// in the first bucket.
pub fn age_bucket(age: f32, width: f32) -> Bucket<AGE_BUCKETS> {
    let scaled = age / width;
    if !(scaled > 0.0) {
        return Bucket::clamped(0);
    }
    // `as` saturates for huge values
    Bucket::clamped(scaled.floor() as usize)
}

/// Non-positive scores (and NaN) map to bucket 0, positive scores to 1
pub fn gender_bucket(gender: f32) -> Bucket<GENDER_BUCKETS> {
    if gender > 0.0 {
        Bucket::clamped(1)
    } else {
        Bucket::clamped(0)
    }
}

/// Shared mapping for normalised yaw and pitch
pub fn pose_bucket(value: f32) -> Bucket<POSE_BUCKETS> {
    let index = POSE_THRESHOLDS
        .iter()
        .take_while(|&&threshold| value > threshold)
        .count();
    Bucket::clamped(index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Histogram<const N: usize> {
    counts: [u64; N],
}

impl<const N: usize> Default for Histogram<N> {
    fn default() -> Self {
        Self { counts: [0; N] }
    }
}

impl<const N: usize> Histogram<N> {
    pub fn record(&mut self, bucket: Bucket<N>) {
        self.counts[bucket.index()] += 1;
    }

    pub fn count(&self, bucket: Bucket<N>) -> u64 {
        self.counts[bucket.index()]
    }

    pub fn counts(&self) -> &[u64; N] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn reset(&mut self) {
        self.counts = [0; N];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_buckets_are_twenty_years_wide() {
        let width = 20.0;
        assert_eq!(age_bucket(0.0, width).index(), 0);
        assert_eq!(age_bucket(19.9, width).index(), 0);
        assert_eq!(age_bucket(20.0, width).index(), 1);
        assert_eq!(age_bucket(45.0, width).index(), 2);
        assert_eq!(age_bucket(60.0, width).index(), 3);
        assert_eq!(age_bucket(250.0, width).index(), 3);
    }

    #[test]
    fn malformed_ages_are_clamped() {
        assert_eq!(age_bucket(-12.0, 20.0).index(), 0);
        assert_eq!(age_bucket(f32::NAN, 20.0).index(), 0);
        assert_eq!(age_bucket(f32::INFINITY, 20.0).index(), 3);
    }

    #[test]
    fn gender_sign_picks_bucket() {
        assert_eq!(gender_bucket(-1.0).index(), 0);
        assert_eq!(gender_bucket(0.0).index(), 0);
        assert_eq!(gender_bucket(0.01).index(), 1);
        assert_eq!(gender_bucket(f32::NAN).index(), 0);
    }

    #[test]
    fn pose_thresholds_are_inclusive_upper_bounds() {
        assert_eq!(pose_bucket(0.0).index(), 0);
        assert_eq!(pose_bucket(0.38).index(), 0);
        assert_eq!(pose_bucket(0.381).index(), 1);
        assert_eq!(pose_bucket(0.54).index(), 1);
        assert_eq!(pose_bucket(0.55).index(), 2);
        assert_eq!(pose_bucket(7.0).index(), 2);
        assert_eq!(pose_bucket(-3.0).index(), 0);
    }

    #[test]
    fn bucket_construction_is_bounded() {
        assert!(Bucket::<3>::new(2).is_some());
        assert!(Bucket::<3>::new(3).is_none());
        assert_eq!(Bucket::<3>::clamped(99).index(), 2);
    }

    #[test]
    fn histogram_counts_and_resets() {
        let mut hist = Histogram::<POSE_BUCKETS>::default();
        hist.record(pose_bucket(0.1));
        hist.record(pose_bucket(0.9));
        hist.record(pose_bucket(0.9));
        assert_eq!(hist.counts(), &[1, 0, 2]);
        assert_eq!(hist.total(), 3);
        hist.reset();
        assert_eq!(hist.total(), 0);
    }
}
