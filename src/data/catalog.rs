//! Cone-search client for host-galaxy photometry.
//!
//! When a host is missing from the tabulated slices we query the survey's
//! search service by sky position. The strategy is fixed:
//!
//! 1. tight radius, spectroscopic objects only (gets a redshift too)
//! 2. on an empty result, wide radius without the spectroscopy constraint
//! 3. both empty → `NotFound` (logged by the caller, never an error)
//!
//! Several returned rows that share one catalog `objid` are duplicate
//! detections of the same object; genuinely distinct rows are reported as
//! `Ambiguous` for manual review rather than auto-resolved.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::Observation;
use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://skyserver.sdss.org/dr16/SkyServerWS/SearchTools/RadialSearch";

/// Columns requested from the catalog, matching `HostRow`.
const QUERY_FIELDS: &str = "objid,ra,dec,specz,u,g,r,i,z,err_u,err_g,err_r,err_i,err_z";

/// Spectroscopic pass radius (arcsec).
pub const TIGHT_RADIUS_ARCSEC: f64 = 3.0;

/// Photometry-only fallback radius (arcsec).
pub const WIDE_RADIUS_ARCSEC: f64 = 5.0;

/// One catalog row: position, ugriz model magnitudes, and the spectroscopic
/// redshift when the query asked for spectroscopy.
#[derive(Debug, Clone, Deserialize)]
pub struct HostRow {
    pub objid: u64,
    pub ra: f64,
    pub dec: f64,
    #[serde(default)]
    pub specz: Option<f64>,
    pub u: f64,
    pub g: f64,
    pub r: f64,
    pub i: f64,
    pub z: f64,
    pub err_u: f64,
    pub err_g: f64,
    pub err_r: f64,
    pub err_i: f64,
    pub err_z: f64,
}

impl HostRow {
    /// Convert to a typed observation; requires a spectroscopic redshift.
    pub fn to_observation(&self, snid: u64) -> Option<Observation> {
        let redshift = self.specz?;
        if !(redshift.is_finite() && redshift > 0.0) {
            return None;
        }
        Some(Observation {
            snid,
            name: None,
            redshift,
            magnitudes: [self.u, self.g, self.r, self.i, self.z],
            uncertainties: [self.err_u, self.err_g, self.err_r, self.err_i, self.err_z],
        })
    }
}

/// Result of a host lookup.
#[derive(Debug, Clone)]
pub enum HostQueryOutcome {
    Found(HostRow),
    NotFound,
    /// Distinct objects inside the search radius; left for manual review.
    Ambiguous(Vec<HostRow>),
}

pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    /// Build a client; `SNAGE_CATALOG_URL` (env or `.env`) overrides the
    /// default endpoint, which keeps integration tests off the network.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var("SNAGE_CATALOG_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Look up the host at `(ra, dec)` (degrees) with the fixed two-pass
    /// radius strategy.
    pub fn fetch_host(&self, ra: f64, dec: f64) -> Result<HostQueryOutcome, AppError> {
        fetch_host_with(|radius_arcsec, spectro| self.query_region(ra, dec, radius_arcsec, spectro))
    }

    /// Single cone-search request.
    pub fn query_region(
        &self,
        ra: f64,
        dec: f64,
        radius_arcsec: f64,
        spectro: bool,
    ) -> Result<Vec<HostRow>, AppError> {
        let radius_arcmin = radius_arcsec / 60.0;
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("ra", ra.to_string()),
                ("dec", dec.to_string()),
                ("radius", radius_arcmin.to_string()),
                ("spectro", if spectro { "1".to_string() } else { "0".to_string() }),
                ("fields", QUERY_FIELDS.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .map_err(|e| AppError::runtime(format!("Catalog request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::runtime(
                format!("Catalog request failed with status {}.", resp.status()),
            ));
        }

        let rows: Vec<HostRow> = resp
            .json()
            .map_err(|e| AppError::runtime(format!("Failed to parse catalog response: {e}")))?;
        Ok(rows)
    }
}

/// Two-pass lookup over an injectable query function.
///
/// Factored out of `CatalogClient` so the radius-fallback ordering is
/// testable without HTTP.
pub fn fetch_host_with(
    mut query: impl FnMut(f64, bool) -> Result<Vec<HostRow>, AppError>,
) -> Result<HostQueryOutcome, AppError> {
    let mut rows = query(TIGHT_RADIUS_ARCSEC, true)?;
    if rows.is_empty() {
        rows = query(WIDE_RADIUS_ARCSEC, false)?;
    }
    Ok(resolve_rows(rows))
}

/// Collapse duplicate detections; report distinct objects as ambiguous.
pub fn resolve_rows(mut rows: Vec<HostRow>) -> HostQueryOutcome {
    let Some(first) = rows.first() else {
        return HostQueryOutcome::NotFound;
    };
    let first_id = first.objid;
    if rows.iter().all(|r| r.objid == first_id) {
        HostQueryOutcome::Found(rows.swap_remove(0))
    } else {
        HostQueryOutcome::Ambiguous(rows)
    }
}
