//! Flat-prior log-posterior over the SFH parameter vector.
//!
//! All three functions are pure: the same `(theta, observation, engine)`
//! always produces the same value, and nothing here mutates state. Rejection
//! is signaled with `f64::NEG_INFINITY`, never an error or panic, so the
//! sampler can treat any draw uniformly.

use crate::domain::{Observation, Theta, N_BANDS, N_PARAMS};
use crate::sps::StellarPopulation;

/// Flat-prior box, in `Theta` field order.
///
/// The slope lower bound is zero: a negative late-time slope is outside the
/// supported domain, matching the hard-rejection contract for invalid
/// orderings. Declining histories are expressed through `tau` and an early
/// `sfTrans` instead.
pub const PRIOR_LOWER: [f64; N_PARAMS] = [-2.5, 0.0, 0.1, 0.5, 0.5, 0.0, -40.0];
pub const PRIOR_UPPER: [f64; N_PARAMS] = [0.5, 2.0, 10.0, 13.8, 13.8, 20.0, 0.0];

/// Log of the (unnormalized) flat prior: `0.0` inside the supported domain,
/// `-inf` outside.
///
/// The domain is the prior box intersected with the orderings the forward
/// model requires: `tStart < sfTrans` and star formation beginning before the
/// observation epoch.
pub fn ln_prior(theta: &Theta, redshift: f64, sp: &StellarPopulation) -> f64 {
    let values = theta.to_array();
    for i in 0..N_PARAMS {
        if !values[i].is_finite() || values[i] < PRIOR_LOWER[i] || values[i] > PRIOR_UPPER[i] {
            return f64::NEG_INFINITY;
        }
    }
    if theta.t_start >= theta.sf_trans {
        return f64::NEG_INFINITY;
    }
    if sp.check_domain(theta, redshift).is_err() {
        return f64::NEG_INFINITY;
    }
    0.0
}

/// Chi-square log-likelihood over the observed bands.
///
/// A forward-model failure (out-of-domain draw) is a rejection, not an error.
pub fn ln_like(theta: &Theta, obs: &Observation, sp: &StellarPopulation) -> f64 {
    let predicted = match sp.magnitudes(theta, obs.redshift) {
        Ok(mags) => mags,
        Err(_) => return f64::NEG_INFINITY,
    };

    let mut chi2 = 0.0;
    for b in 0..N_BANDS {
        let sigma = obs.uncertainties[b];
        if !(sigma.is_finite() && sigma > 0.0) || !obs.magnitudes[b].is_finite() {
            return f64::NEG_INFINITY;
        }
        let r = (predicted[b] - obs.magnitudes[b]) / sigma;
        chi2 += r * r;
    }
    -0.5 * chi2
}

/// Log-posterior under the flat prior.
pub fn ln_prob(theta: &Theta, obs: &Observation, sp: &StellarPopulation) -> f64 {
    let prior = ln_prior(theta, obs.redshift, sp);
    if !prior.is_finite() {
        return f64::NEG_INFINITY;
    }
    prior + ln_like(theta, obs, sp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpsConfig;

    fn observation() -> Observation {
        Observation {
            snid: 10028,
            name: None,
            redshift: 0.065,
            magnitudes: [21.22, 19.45, 18.64, 18.27, 17.98],
            uncertainties: [0.041, 0.004, 0.019, 0.012, 0.004],
        }
    }

    fn theta() -> Theta {
        Theta {
            logzsol: 0.0,
            dust2: 0.1,
            tau: 1.0,
            t_start: 1.0,
            sf_trans: 10.0,
            sf_slope: 1.0,
            c: -20.0,
        }
    }

    #[test]
    fn in_domain_theta_has_finite_posterior() {
        let sp = StellarPopulation::new(SpsConfig::default());
        let obs = observation();
        let lp = ln_prob(&theta(), &obs, &sp);
        assert!(lp.is_finite(), "lp = {lp}");
    }

    #[test]
    fn start_after_transition_is_rejected() {
        let sp = StellarPopulation::new(SpsConfig::default());
        let obs = observation();
        for (t_start, sf_trans) in [(10.0, 10.0), (10.5, 10.0), (9.0, 3.0)] {
            let th = Theta {
                t_start,
                sf_trans,
                ..theta()
            };
            assert_eq!(ln_like(&th, &obs, &sp), f64::NEG_INFINITY);
            assert_eq!(ln_prob(&th, &obs, &sp), f64::NEG_INFINITY);
            assert_eq!(ln_prior(&th, obs.redshift, &sp), f64::NEG_INFINITY);
        }
    }

    #[test]
    fn out_of_box_parameters_are_rejected() {
        let sp = StellarPopulation::new(SpsConfig::default());
        let obs = observation();
        let cases = [
            Theta { logzsol: -5.0, ..theta() },
            Theta { dust2: -0.1, ..theta() },
            Theta { tau: 0.0, ..theta() },
            Theta { sf_slope: -0.5, ..theta() },
            Theta { c: 5.0, ..theta() },
            Theta { tau: f64::NAN, ..theta() },
        ];
        for th in cases {
            assert_eq!(ln_prior(&th, obs.redshift, &sp), f64::NEG_INFINITY);
        }
    }

    #[test]
    fn posterior_is_deterministic() {
        let sp = StellarPopulation::new(SpsConfig::default());
        let obs = observation();
        let a = ln_prob(&theta(), &obs, &sp);
        let b = ln_prob(&theta(), &obs, &sp);
        assert_eq!(a, b);
    }

    #[test]
    fn closer_prediction_scores_higher() {
        let sp = StellarPopulation::new(SpsConfig::default());
        let obs = observation();
        // Shift c so the model is grossly off; the likelihood must drop.
        let off = Theta { c: -5.0, ..theta() };
        assert!(ln_like(&theta(), &obs, &sp) > ln_like(&off, &obs, &sp));
    }
}
