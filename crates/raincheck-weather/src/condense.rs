//! Downsampling of minute-level samples into fixed-size groups.

use crate::types::Sample;

/// Raw samples averaged into one condensed sample
pub const GROUP_SIZE: usize = 5;

/// Average runs of [`GROUP_SIZE`] samples into one sample each.
///
/// A sample is emitted at every index `i > 0` with `i % 5 == 0`, carrying that
/// sample's timestamp and the running sum divided by five. The first emission
/// therefore covers indices `0..=5`. Anything after the last emission is
/// dropped, so `n` samples yield `(n - 1) / 5` groups.
pub fn condense(samples: &[Sample]) -> Vec<Sample> {
    let mut condensed = Vec::with_capacity(samples.len().saturating_sub(1) / GROUP_SIZE);
    let mut acc = 0.0;

    for (i, sample) in samples.iter().enumerate() {
        acc += sample.precipitation_mm;
        if i > 0 && i % GROUP_SIZE == 0 {
            condensed.push(Sample::new(sample.timestamp, acc / GROUP_SIZE as f64));
            acc = 0.0;
        }
    }

    condensed
}
