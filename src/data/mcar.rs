use rand::seq::index;
use rand::Rng;

use super::series::SeriesArray;
use crate::error::{DatasetError, Result};

/// Output of [`mcar`]. All four arrays share the input's shape.
#[derive(Debug, Clone)]
pub struct McarOutput {
    /// Input before masking, NaN replaced by zero.
    pub intact: SeriesArray,
    /// Input after masking, NaN replaced by zero.
    pub masked: SeriesArray,
    /// 1 where `masked` still holds an observed value.
    pub missing_mask: SeriesArray,
    /// 1 where an observed value was hidden by this call.
    pub indicating_mask: SeriesArray,
}

/// Hides `floor(observed * rate)` of the observed values in `x`, chosen uniformly
/// without replacement. Already-missing (NaN) positions are never selected, so
/// `missing_mask` and `indicating_mask` are disjoint.
pub fn mcar<R: Rng + ?Sized>(x: &SeriesArray, rate: f64, rng: &mut R) -> Result<McarOutput> {
    if !(0.0..1.0).contains(&rate) {
        return Err(DatasetError::InvalidRate(rate));
    }

    let observed: Vec<usize> = x
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, _)| i)
        .collect();

    let n_hidden = (observed.len() as f64 * rate) as usize;

    let mut masked_values = x.values().to_vec();
    for pick in index::sample(rng, observed.len(), n_hidden) {
        masked_values[observed[pick]] = f32::NAN;
    }
    let masked = SeriesArray::new(masked_values, x.n_steps(), x.n_features())?;

    let missing_mask = masked.observed_mask();
    let indicating_mask = SeriesArray::new(
        x.values()
            .iter()
            .zip(masked.values())
            .map(|(orig, now)| if !orig.is_nan() && now.is_nan() { 1.0 } else { 0.0 })
            .collect(),
        x.n_steps(),
        x.n_features(),
    )?;

    Ok(McarOutput {
        intact: x.nan_to_num(0.0),
        masked: masked.nan_to_num(0.0),
        missing_mask,
        indicating_mask,
    })
}
