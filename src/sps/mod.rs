//! Forward model: parameter vector → predicted apparent magnitudes.
//!
//! `StellarPopulation` wraps the synthesis pieces (SFH, SSP band
//! luminosities, dust, IGM, cosmology) behind one call. All configuration is
//! explicit in `SpsConfig`; nothing here reads defaults from hidden state.
//!
//! Out-of-range parameters produce `SpsError::OutOfDomain`, which the
//! likelihood converts into a rejection. The adapter itself never panics on
//! bad draws.

pub mod cosmology;
pub mod sfh;
pub mod ssp;

use crate::domain::{SpsConfig, Theta, N_BANDS};
use self::ssp::BAND_WAVELENGTHS;

/// Trapezoid subdivisions for the composite-population integral.
const N_STEPS: usize = 200;

/// Modeling failure for a single parameter draw.
#[derive(Debug, Clone)]
pub enum SpsError {
    /// Parameters outside the physically valid range.
    OutOfDomain(String),
    /// The synthesis produced non-finite or degenerate output.
    Numeric(String),
}

impl std::fmt::Display for SpsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpsError::OutOfDomain(reason) => write!(f, "out-of-domain parameters: {reason}"),
            SpsError::Numeric(reason) => write!(f, "synthesis failure: {reason}"),
        }
    }
}

impl std::error::Error for SpsError {}

/// Configured synthesis engine; cheap to construct, stateless across calls.
#[derive(Debug, Clone)]
pub struct StellarPopulation {
    config: SpsConfig,
}

impl StellarPopulation {
    pub fn new(config: SpsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpsConfig {
        &self.config
    }

    /// Physical-validity check shared by `magnitudes` and the prior.
    pub fn check_domain(&self, theta: &Theta, redshift: f64) -> Result<f64, SpsError> {
        if !(redshift.is_finite() && redshift > 0.0) {
            return Err(SpsError::OutOfDomain(format!("redshift {redshift}")));
        }
        for (label, value) in [
            ("logzsol", theta.logzsol),
            ("dust2", theta.dust2),
            ("tau", theta.tau),
            ("tStart", theta.t_start),
            ("sfTrans", theta.sf_trans),
            ("sfSlope", theta.sf_slope),
            ("c", theta.c),
        ] {
            if !value.is_finite() {
                return Err(SpsError::OutOfDomain(format!("non-finite {label}")));
            }
        }
        if theta.tau <= 0.0 {
            return Err(SpsError::OutOfDomain(format!("tau {} <= 0", theta.tau)));
        }
        if theta.dust2 < 0.0 {
            return Err(SpsError::OutOfDomain(format!("dust2 {} < 0", theta.dust2)));
        }
        if theta.t_start >= theta.sf_trans {
            return Err(SpsError::OutOfDomain(format!(
                "tStart {} >= sfTrans {}",
                theta.t_start, theta.sf_trans
            )));
        }
        let t_obs = cosmology::age_at(redshift);
        if theta.t_start >= t_obs {
            return Err(SpsError::OutOfDomain(format!(
                "tStart {} at or after the observation epoch {t_obs:.3}",
                theta.t_start
            )));
        }
        Ok(t_obs)
    }

    /// Predicted apparent ugriz magnitudes for `theta` at `redshift`.
    pub fn magnitudes(&self, theta: &Theta, redshift: f64) -> Result<[f64; N_BANDS], SpsError> {
        let t_obs = self.check_domain(theta, redshift)?;

        // Composite rest-frame band luminosities: SFR-weighted SSP light with
        // age-dependent dust. Birth-cloud stars see the diffuse screen plus
        // the extra young-star term.
        let mut lums = [0.0; N_BANDS];
        let h = (t_obs - theta.t_start) / N_STEPS as f64;
        let mut prev = self.band_emission(theta, t_obs, theta.t_start);
        for i in 1..=N_STEPS {
            let t = theta.t_start + h * i as f64;
            let cur = self.band_emission(theta, t_obs, t);
            for b in 0..N_BANDS {
                lums[b] += 0.5 * (prev[b] + cur[b]) * h;
            }
            prev = cur;
        }

        if lums.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(SpsError::Numeric(
                "no stellar light formed by the observation epoch".to_string(),
            ));
        }

        // Band shifting: the observed band samples the rest-frame SED at
        // λ/(1+z); interpolate the composite luminosities in log-wavelength.
        let dm = cosmology::distance_modulus(redshift);
        let stretch = 2.5 * (1.0 + redshift).log10();
        let mut mags = [0.0; N_BANDS];
        for b in 0..N_BANDS {
            let lam_rest = BAND_WAVELENGTHS[b] / (1.0 + redshift);
            let mut lum = interp_log(&BAND_WAVELENGTHS, &lums, lam_rest);
            if self.config.igm_absorption {
                lum *= ssp::igm_transmission(b, redshift);
            }
            let mag = -2.5 * lum.log10() + dm - stretch + theta.c;
            if !mag.is_finite() {
                return Err(SpsError::Numeric(format!("non-finite magnitude in band {b}")));
            }
            mags[b] = mag;
        }
        Ok(mags)
    }

    /// Mass-weighted age (Gyr) of the population described by `theta` at the
    /// epoch corresponding to `redshift`.
    pub fn mass_weighted_age(&self, theta: &Theta, redshift: f64) -> Result<f64, SpsError> {
        let t_obs = self.check_domain(theta, redshift)?;
        sfh::mass_weighted_age(self.config.sfh, theta, t_obs).ok_or_else(|| {
            SpsError::Numeric("no stellar mass formed by the observation epoch".to_string())
        })
    }

    /// Instantaneous per-band emission at formation time `t`, observed at
    /// `t_obs` (so stellar age is `t_obs - t`).
    fn band_emission(&self, theta: &Theta, t_obs: f64, t: f64) -> [f64; N_BANDS] {
        let rate = sfh::sfr(self.config.sfh, theta, t);
        let mut out = [0.0; N_BANDS];
        if rate <= 0.0 {
            return out;
        }
        let age = t_obs - t;
        let extra_depth = if age < self.config.birth_cloud_age {
            1.0 + self.config.young_dust_factor
        } else {
            1.0
        };
        for b in 0..N_BANDS {
            let lum = ssp::band_luminosity(
                b,
                age,
                theta.logzsol,
                self.config.metallicity,
                self.config.neb_emission,
            );
            out[b] = rate * lum * ssp::attenuation_factor(b, theta.dust2, self.config.dust_law, extra_depth);
        }
        out
    }
}

/// Piecewise-linear interpolation in (ln λ, ln L), with end-segment
/// extrapolation. `xs` must be ascending.
fn interp_log(xs: &[f64; N_BANDS], ys: &[f64; N_BANDS], x: f64) -> f64 {
    let lx = x.ln();
    let lxs: [f64; N_BANDS] = xs.map(f64::ln);
    let lys: [f64; N_BANDS] = ys.map(f64::ln);

    let seg = if lx <= lxs[0] {
        0
    } else if lx >= lxs[N_BANDS - 1] {
        N_BANDS - 2
    } else {
        let mut s = 0;
        for i in 0..N_BANDS - 1 {
            if lx >= lxs[i] && lx <= lxs[i + 1] {
                s = i;
                break;
            }
        }
        s
    };

    let slope = (lys[seg + 1] - lys[seg]) / (lxs[seg + 1] - lxs[seg]);
    (lys[seg] + slope * (lx - lxs[seg])).exp()
}
