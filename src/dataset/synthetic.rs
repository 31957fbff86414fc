//! Deterministic California-housing-shaped data
//!
//! Feature ranges follow the census block-group table; the target mixes a
//! linear income effect with two coastal price peaks so tree ensembles have
//! non-linear structure to find.

use super::{Dataset, Matrix, FEATURE_NAMES};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generator seed used by [`super::HousingSource::Synthetic`].
pub const SYNTHETIC_SEED: u64 = 20_640;

/// Target values are capped like the census table.
const TARGET_MIN: f64 = 0.149_99;
const TARGET_MAX: f64 = 5.000_01;

/// Generate `n_samples` rows from a fixed seed.
///
/// # Errors
///
/// Returns `InvalidInput` when `n_samples` is zero.
pub fn synthetic_housing(n_samples: usize, seed: u64) -> Result<Dataset> {
    if n_samples == 0 {
        return Err(Error::InvalidInput(
            "synthetic dataset needs at least one sample".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(n_samples * FEATURE_NAMES.len());
    let mut targets = Vec::with_capacity(n_samples);

    for _ in 0..n_samples {
        let income_draw: f64 = rng.gen();
        let med_inc = 0.5 + 14.5 * income_draw * income_draw;
        let house_age = f64::from(rng.gen_range(1_u32..=52));
        let ave_rooms = rng.gen_range(2.0..10.0);
        let ave_bedrms = ave_rooms * rng.gen_range(0.15..0.3);
        let population = rng.gen_range(3.0..5_000.0);
        let ave_occup = rng.gen_range(1.0..6.0);
        let latitude = rng.gen_range(32.5..42.0);
        let longitude = rng.gen_range(-124.3..-114.3);

        let noise: f64 = (0..3).map(|_| rng.gen_range(-0.5..0.5)).sum::<f64>() * 0.3;
        let target = 0.45 * med_inc
            + coastal_peak(latitude, longitude, 37.5, -122.2, 2.0, 1.2)
            + coastal_peak(latitude, longitude, 34.0, -118.3, 1.5, 0.9)
            + 0.01 * house_age
            - 0.1 * ave_occup
            + noise;

        data.extend_from_slice(&[
            med_inc, house_age, ave_rooms, ave_bedrms, population, ave_occup, latitude, longitude,
        ]);
        targets.push(target.clamp(TARGET_MIN, TARGET_MAX));
    }

    Dataset::new(
        FEATURE_NAMES.iter().map(ToString::to_string).collect(),
        Matrix::from_vec(n_samples, FEATURE_NAMES.len(), data)?,
        targets,
    )
}

fn coastal_peak(lat: f64, lon: f64, peak_lat: f64, peak_lon: f64, width: f64, height: f64) -> f64 {
    let dist_sq = (lat - peak_lat).powi(2) + (lon - peak_lon).powi(2);
    height * (-dist_sq / width).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_shape() {
        let dataset = synthetic_housing(50, 1).unwrap();
        assert_eq!(dataset.len(), 50);
        assert_eq!(dataset.features().n_cols(), 8);
        assert_eq!(dataset.feature_names()[0], "MedInc");
    }

    #[test]
    fn test_synthetic_is_deterministic() {
        let a = synthetic_housing(40, 3).unwrap();
        let b = synthetic_housing(40, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_synthetic_targets_clamped() {
        let dataset = synthetic_housing(500, 11).unwrap();
        assert!(dataset
            .targets()
            .iter()
            .all(|&t| (TARGET_MIN..=TARGET_MAX).contains(&t)));
    }

    #[test]
    fn test_synthetic_zero_samples() {
        assert!(synthetic_housing(0, 1).is_err());
    }
}
