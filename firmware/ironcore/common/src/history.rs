//! Fixed-depth moving-average filter.

/// A ring buffer of the `N` most recent samples with a running sum.
///
/// Updates and averages are O(1). Before `N` samples were seen, the average
/// is taken over the samples seen so far.
#[derive(Debug, Clone)]
pub struct FilteredHistory<T, const N: usize> {
    /// The sample storage.
    samples: [T; N],
    /// Sum of all stored samples.
    sum: u64,
    /// The slot that the next sample is written to.
    cursor: usize,
    /// Number of samples seen, saturating at `N`.
    seen: usize,
}

impl<T, const N: usize> FilteredHistory<T, N>
where
    T: Copy + Default + Into<u64> + TryFrom<u64>,
{
    /// Create a zero-filled history.
    pub fn new() -> Self {
        const { assert!(N > 0, "a history needs at least one slot") };

        Self {
            samples: [T::default(); N],
            sum: 0,
            cursor: 0,
            seen: 0,
        }
    }

    /// Add a sample, evicting the oldest one if the history is full.
    pub fn update(&mut self, sample: T) {
        let evicted: u64 = self.samples[self.cursor].into();
        let added: u64 = sample.into();

        self.sum = self.sum - evicted + added;
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % N;
        self.seen = (self.seen + 1).min(N);
    }

    /// The truncated mean of the stored samples, or zero if empty.
    pub fn average(&self) -> T {
        if self.seen == 0 {
            return T::default();
        }

        // The mean never exceeds the largest stored sample, so it always fits.
        T::try_from(self.sum / self.seen as u64).unwrap_or_default()
    }

    /// The number of samples the average is currently taken over.
    pub fn len(&self) -> usize {
        self.seen
    }

    /// If true, no sample was added yet.
    pub fn is_empty(&self) -> bool {
        self.seen == 0
    }
}

impl<T, const N: usize> Default for FilteredHistory<T, N>
where
    T: Copy + Default + Into<u64> + TryFrom<u64>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_average_is_zero() {
        let history = FilteredHistory::<u16, 4>::new();
        assert_eq!(history.average(), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn average_before_full() {
        let mut history = FilteredHistory::<u16, 8>::new();
        history.update(10);
        history.update(21);

        assert_eq!(history.len(), 2);
        assert_eq!(history.average(), 15);
    }

    #[test]
    fn evicts_oldest() {
        let mut history = FilteredHistory::<u32, 3>::new();
        for sample in [100, 200, 300, 400, 500] {
            history.update(sample);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.average(), 400);
    }

    #[test]
    fn matches_mean_of_recent_window() {
        const DEPTH: usize = 5;
        let mut history = FilteredHistory::<u16, DEPTH>::new();
        let samples: [u16; 13] = [7, 65535, 3, 0, 1000, 42, 42, 9, 65000, 12, 1, 2, 30000];

        for (index, &sample) in samples.iter().enumerate() {
            history.update(sample);

            let window = &samples[(index + 1).saturating_sub(DEPTH)..=index];
            let sum: u64 = window.iter().map(|&s| s as u64).sum();
            assert_eq!(history.average() as u64, sum / window.len() as u64);
        }
    }

    #[test]
    fn single_slot() {
        let mut history = FilteredHistory::<u16, 1>::new();
        history.update(5);
        history.update(9);
        assert_eq!(history.average(), 9);
    }
}
