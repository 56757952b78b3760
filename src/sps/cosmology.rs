//! Flat ΛCDM background cosmology.
//!
//! The pipeline needs two quantities per object:
//!
//! - the distance modulus at the host redshift (to place model magnitudes
//!   on the apparent scale)
//! - the age of the universe at that redshift (the upper limit of the
//!   star-formation integral)
//!
//! Both are smooth one-dimensional integrals, evaluated with composite
//! Simpson quadrature on a fixed grid. Parameters are fixed survey-wide.

/// Hubble constant (km/s/Mpc).
pub const H0: f64 = 70.0;

/// Matter density parameter; ΩΛ = 1 - Ωm (flat).
pub const OMEGA_M: f64 = 0.3;

/// Speed of light (km/s).
const C_KM_S: f64 = 299_792.458;

/// Hubble time for `H0` in Gyr (1/H0, with km/s/Mpc → 1/Gyr conversion).
const HUBBLE_TIME_GYR: f64 = 977.8 / H0;

/// Simpson subdivisions (even).
const N_STEPS: usize = 256;

fn e_of_z(z: f64) -> f64 {
    let omega_l = 1.0 - OMEGA_M;
    (OMEGA_M * (1.0 + z).powi(3) + omega_l).sqrt()
}

/// Composite Simpson over [a, b].
fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64) -> f64 {
    let h = (b - a) / N_STEPS as f64;
    let mut sum = f(a) + f(b);
    for i in 1..N_STEPS {
        let x = a + h * i as f64;
        sum += if i % 2 == 1 { 4.0 * f(x) } else { 2.0 * f(x) };
    }
    sum * h / 3.0
}

/// Comoving distance (Mpc).
pub fn comoving_distance(z: f64) -> f64 {
    if z <= 0.0 {
        return 0.0;
    }
    (C_KM_S / H0) * simpson(|zp| 1.0 / e_of_z(zp), 0.0, z)
}

/// Luminosity distance (Mpc).
pub fn luminosity_distance(z: f64) -> f64 {
    (1.0 + z) * comoving_distance(z)
}

/// Distance modulus `5 log10(D_L / 10pc)`.
pub fn distance_modulus(z: f64) -> f64 {
    let d_l_mpc = luminosity_distance(z);
    // 1 Mpc = 1e5 × 10 pc.
    5.0 * (d_l_mpc * 1.0e5).log10()
}

/// Age of the universe at redshift `z` (Gyr).
///
/// `t(z) = (1/H0) ∫_0^{a(z)} da / (a E(1/a - 1))`, where the integrand
/// `da / sqrt(Ωm/a + ΩΛ a²)` vanishes as `sqrt(a)` at the lower limit.
pub fn age_at(z: f64) -> f64 {
    let omega_l = 1.0 - OMEGA_M;
    let a_end = 1.0 / (1.0 + z);
    let integrand = |a: f64| {
        if a <= 0.0 {
            0.0
        } else {
            1.0 / (OMEGA_M / a + omega_l * a * a).sqrt()
        }
    };
    HUBBLE_TIME_GYR * simpson(integrand, 0.0, a_end)
}
