//! Supply voltage sampling.

/// Calibration headroom multiplier of the voltage scale.
///
/// The ADC full scale times this factor, divided by the calibration divisor, gives 0.1 V.
/// An ideal divisor is around 467.
const CALIBRATION_HEADROOM: u32 = 4;

/// A rolling buffer of raw supply voltage readings.
///
/// The buffer is refilled completely on each of the first `prefill_calls` reads, so that a single
/// cold sample never reports a misleadingly low voltage. After that, it behaves as a plain
/// circular buffer.
#[derive(Debug, Clone)]
pub struct VoltageSampler<const N: usize> {
    /// Raw ADC codes.
    samples: [u16; N],
    /// The slot that the next forced sample overwrites.
    index: usize,
    /// Remaining reads that refill the whole buffer.
    prefill_remaining: u8,
}

impl<const N: usize> VoltageSampler<N> {
    /// Create a sampler that refills the whole buffer on its first `prefill_calls` reads.
    ///
    /// At least one prefill always happens.
    pub const fn new(prefill_calls: u8) -> Self {
        const { assert!(N > 0, "a voltage sampler needs at least one slot") };

        Self {
            samples: [0; N],
            index: 0,
            prefill_remaining: if prefill_calls == 0 { 1 } else { prefill_calls },
        }
    }

    /// Read the supply voltage in 0.1 V.
    ///
    /// If `resample` is set, exactly one slot is replaced (round-robin) by a fresh acquisition.
    /// A `divisor` of zero is treated as one.
    pub fn read_x10(&mut self, divisor: u16, resample: bool, mut acquire: impl FnMut() -> u16) -> u16 {
        if self.prefill_remaining > 0 {
            for sample in self.samples.iter_mut() {
                *sample = acquire();
            }
            self.prefill_remaining -= 1;
            debug!("Voltage buffer prefilled, {} prefills left", self.prefill_remaining);
        }

        if resample {
            self.samples[self.index] = acquire();
            self.index = (self.index + 1) % N;
        }

        let mean = self.samples.iter().map(|&s| s as u32).sum::<u32>() / N as u32;
        let voltage_x10 = mean * CALIBRATION_HEADROOM / divisor.max(1) as u32;

        u16::try_from(voltage_x10).unwrap_or(u16::MAX)
    }

    /// If true, the buffer still refills completely on the next read.
    pub fn is_prefilling(&self) -> bool {
        self.prefill_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_fills_whole_buffer() {
        let mut sampler = VoltageSampler::<8>::new(1);
        let mut acquisitions = 0;

        let voltage_x10 = sampler.read_x10(467, false, || {
            acquisitions += 1;
            20_000
        });

        assert_eq!(acquisitions, 8);
        assert_eq!(voltage_x10, 171);
        assert!(!sampler.is_prefilling());
    }

    #[test]
    fn resample_replaces_one_slot() {
        let mut sampler = VoltageSampler::<4>::new(1);
        sampler.read_x10(1, false, || 1000);

        let mut acquisitions = 0;
        let voltage_x10 = sampler.read_x10(1, true, || {
            acquisitions += 1;
            2000
        });
        assert_eq!(acquisitions, 1);
        assert_eq!(voltage_x10, (1000 * 3 + 2000) / 4 * 4);

        // Without resampling, the buffer is reused.
        let voltage_x10 = sampler.read_x10(1, false, || unreachable!());
        assert_eq!(voltage_x10, 5000);
    }

    #[test]
    fn resample_is_round_robin() {
        let mut sampler = VoltageSampler::<2>::new(1);
        sampler.read_x10(4, false, || 0);

        sampler.read_x10(4, true, || 100);
        sampler.read_x10(4, true, || 300);
        assert_eq!(sampler.read_x10(4, false, || 0), 200);

        // Overwrites the first slot again.
        assert_eq!(sampler.read_x10(4, true, || 500), 400);
    }

    #[test]
    fn repeated_prefill() {
        let mut sampler = VoltageSampler::<4>::new(2);
        sampler.read_x10(1, false, || 100);
        assert!(sampler.is_prefilling());

        assert_eq!(sampler.read_x10(1, false, || 200), 800);
        assert!(!sampler.is_prefilling());
    }

    #[test]
    fn zero_divisor_is_clamped() {
        let mut sampler = VoltageSampler::<1>::new(1);
        assert_eq!(sampler.read_x10(0, false, || 100), 400);
        assert_eq!(sampler.read_x10(0, true, || u16::MAX), u16::MAX);
    }
}
