//! Photovoltaic performance metrics.
//!
//! Ratios are elementwise over aligned series (typically daily totals from
//! [`insolation`] and [`energy`]). Integrals are in value-seconds.

use qcwatch_types::Timestamp;
use tracing::info;

use crate::error::{QcError, Result};
use crate::metrics::{time_integral, Summary};

/// Reference irradiance at standard test conditions, W/m².
pub const G_REF: f64 = 1000.0;

fn ratio(numerator: &[f64], denominator: &[f64], scale: f64) -> Result<Vec<f64>> {
    if numerator.len() != denominator.len() {
        return Err(QcError::ShapeMismatch {
            expected: numerator.len(),
            got: denominator.len(),
        });
    }
    Ok(numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| n / d * scale)
        .collect())
}

/// Insolation `H = ∫ G dt` from irradiance.
pub fn insolation(
    index: &[Timestamp],
    irradiance: &[Vec<f64>],
    filter: Option<&[bool]>,
    per_day: bool,
) -> Result<Summary<Vec<f64>>> {
    time_integral(index, irradiance, filter, per_day)
}

/// Energy `E = ∫ P dt` from power.
pub fn energy(
    index: &[Timestamp],
    power: &[Vec<f64>],
    filter: Option<&[bool]>,
    per_day: bool,
) -> Result<Summary<Vec<f64>>> {
    time_integral(index, power, filter, per_day)
}

/// Performance ratio `(E / P_ref) / (H_poa / G_ref)`.
pub fn performance_ratio(energy: &[f64], h_poa: &[f64], p_ref: f64, g_ref: f64) -> Result<Vec<f64>> {
    info!("Compute Performance Ratio");
    ratio(energy, h_poa, g_ref / p_ref)
}

/// Normalized current `(I / I_sco) / (G_poa / G_ref)`.
pub fn normalized_current(current: &[f64], g_poa: &[f64], i_sco: f64, g_ref: f64) -> Result<Vec<f64>> {
    info!("Compute Normalized Current");
    ratio(current, g_poa, g_ref / i_sco)
}

/// Normalized efficiency `(P / P_ref) / (G_poa / G_ref)`.
pub fn normalized_efficiency(power: &[f64], g_poa: &[f64], p_ref: f64, g_ref: f64) -> Result<Vec<f64>> {
    info!("Compute Normalized Efficiency");
    ratio(power, g_poa, g_ref / p_ref)
}

/// Performance index `E / E_predicted`.
pub fn performance_index(energy: &[f64], predicted: &[f64]) -> Result<Vec<f64>> {
    info!("Compute Performance Index");
    ratio(energy, predicted, 1.0)
}

/// Energy yield `E / P_ref`.
pub fn energy_yield(energy: &[f64], p_ref: f64) -> Vec<f64> {
    info!("Compute Energy Yield");
    energy.iter().map(|e| e / p_ref).collect()
}

/// Clearness index `H_dn / H_ea`.
pub fn clearness_index(h_dn: &[f64], h_ea: &[f64]) -> Result<Vec<f64>> {
    info!("Compute Clearness Index");
    ratio(h_dn, h_ea, 1.0)
}
