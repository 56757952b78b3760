//! Simple-stellar-population band luminosities and attenuation terms.
//!
//! The engine works in per-band "luminosity units" chosen so that
//! `mag = -2.5 log10(L)` up to the run-level offset `c`; only band ratios
//! (colors) and their evolution with age/metallicity are physically
//! meaningful. The single-burst model is a smooth power-law fade per band,
//! calibrated so a ~10 Gyr solar-metallicity population shows red
//! early-type colors and a ~100 Myr one shows blue star-forming colors.

use crate::domain::{DustLaw, MetallicityMode};

/// Effective wavelengths (Å) of the ugriz bands.
pub const BAND_WAVELENGTHS: [f64; 5] = [3543.0, 4770.0, 6231.0, 7625.0, 9134.0];

/// V-band reference wavelength (Å) for attenuation normalization.
const LAMBDA_V: f64 = 5500.0;

/// Magnitude (per solar mass) of a solar-metallicity SSP at 1 Gyr, per band.
const MAG_1GYR: [f64; 5] = [6.45, 5.45, 5.00, 4.75, 4.60];

/// Power-law fading exponent per band: `L ∝ age^-α`. Blue bands fade fastest.
const FADE_ALPHA: [f64; 5] = [1.22, 0.92, 0.80, 0.75, 0.71];

/// Color tilt with metallicity (mag per dex of `logzsol`); metal-rich
/// populations dim in the blue and brighten marginally in the red.
const METAL_TILT: [f64; 5] = [0.50, 0.30, 0.10, 0.0, -0.05];

/// Tabulated `logzsol` grid edges used by `MetallicityMode::Nearest`.
const LOGZSOL_GRID: [f64; 5] = [-2.0, -1.0, -0.5, 0.0, 0.2];

/// Young-age flattening scale (Gyr); keeps `L` finite as age → 0.
const AGE_FLOOR: f64 = 0.003;

/// Nebular boost fraction per band for populations still ionizing their gas.
const NEB_BOOST: [f64; 5] = [0.20, 0.30, 0.35, 0.10, 0.05];

/// Nebular emission e-fold age (Gyr); only the youngest stars contribute.
const NEB_AGE: f64 = 0.01;

/// Rest-frame Lyman-α wavelength (Å).
const LYMAN_ALPHA: f64 = 1215.67;

/// Unit-mass SSP luminosity in band `band` at age `age` (Gyr), metallicity
/// `logzsol`, before any dust attenuation.
pub fn band_luminosity(
    band: usize,
    age: f64,
    logzsol: f64,
    metallicity: MetallicityMode,
    neb_emission: bool,
) -> f64 {
    let z = match metallicity {
        MetallicityMode::Continuous => logzsol,
        MetallicityMode::Nearest => nearest_grid_z(logzsol),
    };

    let mag = MAG_1GYR[band]
        + 2.5 * FADE_ALPHA[band] * ((age + AGE_FLOOR).log10())
        + METAL_TILT[band] * z;
    let mut lum = 10f64.powf(-0.4 * mag);

    if neb_emission {
        lum *= 1.0 + NEB_BOOST[band] * (-age / NEB_AGE).exp();
    }
    lum
}

fn nearest_grid_z(logzsol: f64) -> f64 {
    let mut best = LOGZSOL_GRID[0];
    for &z in &LOGZSOL_GRID[1..] {
        if (logzsol - z).abs() < (logzsol - best).abs() {
            best = z;
        }
    }
    best
}

/// Attenuation (mag) in band `band` for diffuse optical depth `dust2`.
///
/// `extra_depth` multiplies the optical depth for birth-cloud stars (the
/// young-star `dust1` term); pass 1.0 for the diffuse screen alone.
pub fn attenuation_mag(band: usize, dust2: f64, law: DustLaw, extra_depth: f64) -> f64 {
    let exponent = match law {
        DustLaw::PowerLaw => 0.7,
        DustLaw::Calzetti => 1.2,
    };
    let shape = (LAMBDA_V / BAND_WAVELENGTHS[band]).powf(exponent);
    1.086 * dust2 * extra_depth * shape
}

/// Flux transmission factor for `attenuation_mag`.
pub fn attenuation_factor(band: usize, dust2: f64, law: DustLaw, extra_depth: f64) -> f64 {
    10f64.powf(-0.4 * attenuation_mag(band, dust2, law, extra_depth))
}

/// IGM transmission for an observed band at source redshift `z`.
///
/// Only wavelengths blueward of the redshifted Lyman-α line see the forest;
/// the effective optical depth follows the Madau scaling `τ ∝ (1+z)^3.46`.
/// Identity at the survey's low redshifts.
pub fn igm_transmission(band: usize, z: f64) -> f64 {
    let observed = BAND_WAVELENGTHS[band];
    if observed >= LYMAN_ALPHA * (1.0 + z) {
        return 1.0;
    }
    let z_abs = observed / LYMAN_ALPHA - 1.0;
    let tau = 0.0036 * (1.0 + z_abs.max(0.0)).powf(3.46);
    (-tau).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_populations_are_redder_than_young() {
        let color = |age: f64| {
            let u = band_luminosity(0, age, 0.0, MetallicityMode::Continuous, false);
            let r = band_luminosity(2, age, 0.0, MetallicityMode::Continuous, false);
            // u - r in magnitudes.
            -2.5 * (u / r).log10()
        };
        assert!(color(10.0) > color(0.1) + 0.5);
    }

    #[test]
    fn luminosity_fades_with_age() {
        for band in 0..5 {
            let young = band_luminosity(band, 0.1, 0.0, MetallicityMode::Continuous, false);
            let old = band_luminosity(band, 10.0, 0.0, MetallicityMode::Continuous, false);
            assert!(young > old, "band {band} did not fade");
        }
    }

    #[test]
    fn nearest_mode_snaps_to_grid() {
        let a = band_luminosity(1, 1.0, -0.45, MetallicityMode::Nearest, false);
        let b = band_luminosity(1, 1.0, -0.5, MetallicityMode::Nearest, false);
        assert_eq!(a, b);
    }

    #[test]
    fn attenuation_is_stronger_in_the_blue() {
        let u = attenuation_mag(0, 0.5, DustLaw::PowerLaw, 1.0);
        let z = attenuation_mag(4, 0.5, DustLaw::PowerLaw, 1.0);
        assert!(u > z);
        assert!(attenuation_factor(0, 0.5, DustLaw::PowerLaw, 1.0) < 1.0);
    }

    #[test]
    fn no_dust_means_no_attenuation() {
        for band in 0..5 {
            assert_eq!(attenuation_mag(band, 0.0, DustLaw::Calzetti, 1.0), 0.0);
        }
    }

    #[test]
    fn igm_is_transparent_at_low_redshift() {
        for band in 0..5 {
            assert_eq!(igm_transmission(band, 0.065), 1.0);
        }
        // The u band enters the forest only at z ≳ 1.9.
        assert!(igm_transmission(0, 2.5) < 1.0);
    }

    #[test]
    fn nebular_boost_only_matters_when_young() {
        let young_on = band_luminosity(1, 0.002, 0.0, MetallicityMode::Continuous, true);
        let young_off = band_luminosity(1, 0.002, 0.0, MetallicityMode::Continuous, false);
        let old_on = band_luminosity(1, 5.0, 0.0, MetallicityMode::Continuous, true);
        let old_off = band_luminosity(1, 5.0, 0.0, MetallicityMode::Continuous, false);
        assert!(young_on > young_off * 1.1);
        assert!((old_on - old_off).abs() / old_off < 1e-6);
    }
}
