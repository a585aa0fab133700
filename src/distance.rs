//! Log-distance path loss helpers
//!
//! Uses the Log-Distance Path Loss Model:
//! distance = 10 ^ ((tx_power - rssi) / (10 * n))
//!
//! Where:
//! - tx_power: Reference signal strength at 1 meter (dBm)
//! - rssi: Measured signal strength (dBm)
//! - n: Path loss exponent (environment dependent)

/// Reference power at 1 meter used by the estimator fallback (dBm)
pub const REFERENCE_POWER_AT_1M_DBM: f64 = -59.0;

/// Free-space path loss exponent
pub const FREE_SPACE_EXPONENT: f64 = 2.0;

pub const MIN_PATH_LOSS_DISTANCE_M: f64 = 0.1;
pub const MAX_PATH_LOSS_DISTANCE_M: f64 = 100.0;

/// Estimate distance in meters from RSSI with the path loss model
///
/// # Arguments
/// * `rssi_dbm` - Received signal strength in dBm
/// * `tx_power_dbm` - Reference signal at 1 meter
/// * `path_loss_exponent` - Environment factor (2.0=free space, 3.0=indoor, 4.0=dense obstacles)
///
/// # Returns
/// Distance clamped to [0.1, 100] meters, or None if the inputs are unusable
pub fn path_loss_distance(rssi_dbm: f64, tx_power_dbm: f64, path_loss_exponent: f64) -> Option<f64> {
    if !rssi_dbm.is_finite() || !tx_power_dbm.is_finite() || path_loss_exponent <= 0.0 {
        return None;
    }

    let exponent = (tx_power_dbm - rssi_dbm) / (10.0 * path_loss_exponent);
    let distance = 10.0_f64.powf(exponent);

    Some(distance.clamp(MIN_PATH_LOSS_DISTANCE_M, MAX_PATH_LOSS_DISTANCE_M))
}

/// Get a human-readable distance category
pub fn distance_category(distance_m: f64) -> &'static str {
    match distance_m {
        d if d < 1.0 => "immediate (<1m)",
        d if d < 3.0 => "very close (1-3m)",
        d if d < 10.0 => "close (3-10m)",
        d if d < 20.0 => "nearby (10-20m)",
        d if d < 40.0 => "far (20-40m)",
        _ => "very far (>40m)",
    }
}

/// Format distance for display
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 10.0 {
        format!("{:.1}m", distance_m)
    } else {
        format!("{:.0}m", distance_m)
    }
}
