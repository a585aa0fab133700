//! RSSI to distance estimation
//!
//! A single-feature regression is fitted once over a calibration table of
//! (signal strength, distance) pairs. The feature is the signal strength
//! min-max normalized over the table's range. Predictions are clamped to
//! the calibrated input range and a plausible output range, and fall back
//! to the free-space path loss model when the regression collapses on a
//! weak signal it never saw during calibration.

use crate::distance::{path_loss_distance, FREE_SPACE_EXPONENT, REFERENCE_POWER_AT_1M_DBM};
use log::debug;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

pub const MIN_SIGNAL_DBM: f64 = -100.0;
pub const MAX_SIGNAL_DBM: f64 = -30.0;
pub const MIN_DISTANCE_M: f64 = 0.0;
pub const MAX_DISTANCE_M: f64 = 100.0;

/// Predictions at or below this are treated as a collapsed model
const COLLAPSED_PREDICTION_M: f64 = 0.01;
/// Signals at or below this are weaker than anything in the calibration table
const WEAK_SIGNAL_DBM: f64 = -85.0;

/// Caller-side check for a reading worth estimating: finite and below 0 dBm
pub fn is_plausible_reading(signal_dbm: f64) -> bool {
    signal_dbm.is_finite() && signal_dbm < 0.0
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("invalid signal strength: {0}")]
    InvalidInput(f64),
    #[error("estimation produced an invalid distance: {0}")]
    EstimationFailed(f64),
    #[error("calibration failed: {0}")]
    Calibration(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub signal_dbm: f64,
    pub distance_m: f64,
}

impl CalibrationSample {
    pub const fn new(signal_dbm: f64, distance_m: f64) -> Self {
        CalibrationSample {
            signal_dbm,
            distance_m,
        }
    }
}

/// Field measurements of a BLE tag at known distances
pub const DEFAULT_CALIBRATION: [CalibrationSample; 8] = [
    CalibrationSample::new(-35.0, 1.0),
    CalibrationSample::new(-45.0, 2.0),
    CalibrationSample::new(-55.0, 4.0),
    CalibrationSample::new(-60.0, 6.0),
    CalibrationSample::new(-65.0, 9.0),
    CalibrationSample::new(-70.0, 12.0),
    CalibrationSample::new(-75.0, 18.0),
    CalibrationSample::new(-80.0, 25.0),
];

/// Shape of the fitted curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Regression {
    /// distance = a + b * x
    Linear,
    /// ln(distance) = a + b * x
    #[default]
    LogLinear,
}

/// Least-squares fit over normalized signal strength. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    kind: Regression,
    intercept: f64,
    slope: f64,
    min_signal: f64,
    signal_span: f64,
}

impl FittedModel {
    pub fn fit(samples: &[CalibrationSample], kind: Regression) -> Result<Self, EstimateError> {
        if samples.len() < 2 {
            return Err(EstimateError::Calibration(format!(
                "need at least 2 samples, got {}",
                samples.len()
            )));
        }

        if let Some(bad) = samples
            .iter()
            .find(|s| !s.signal_dbm.is_finite() || !s.distance_m.is_finite())
        {
            return Err(EstimateError::Calibration(format!(
                "non-finite sample ({}, {})",
                bad.signal_dbm, bad.distance_m
            )));
        }

        if kind == Regression::LogLinear {
            if let Some(bad) = samples.iter().find(|s| s.distance_m <= 0.0) {
                return Err(EstimateError::Calibration(format!(
                    "log-linear fit requires positive distances, got {}",
                    bad.distance_m
                )));
            }
        }

        let min_signal = samples
            .iter()
            .map(|s| s.signal_dbm)
            .fold(f64::INFINITY, f64::min);
        let max_signal = samples
            .iter()
            .map(|s| s.signal_dbm)
            .fold(f64::NEG_INFINITY, f64::max);
        let signal_span = max_signal - min_signal;

        if signal_span <= f64::EPSILON {
            return Err(EstimateError::Calibration(
                "all samples share the same signal strength".to_string(),
            ));
        }

        let design = DMatrix::from_fn(samples.len(), 2, |row, col| {
            if col == 0 {
                1.0
            } else {
                (samples[row].signal_dbm - min_signal) / signal_span
            }
        });
        let target = DVector::from_iterator(
            samples.len(),
            samples.iter().map(|s| match kind {
                Regression::Linear => s.distance_m,
                Regression::LogLinear => s.distance_m.ln(),
            }),
        );

        let coefficients = design
            .svd(true, true)
            .solve(&target, 1e-12)
            .map_err(|e| EstimateError::Calibration(e.to_string()))?;

        let model = FittedModel {
            kind,
            intercept: coefficients[0],
            slope: coefficients[1],
            min_signal,
            signal_span,
        };

        if !model.intercept.is_finite() || !model.slope.is_finite() {
            return Err(EstimateError::Calibration(
                "least-squares solution is not finite".to_string(),
            ));
        }

        debug!(
            "Fitted {:?} model: intercept={:.4}, slope={:.4} over [{}, {}] dBm",
            kind, model.intercept, model.slope, min_signal, max_signal
        );

        Ok(model)
    }

    pub fn kind(&self) -> Regression {
        self.kind
    }

    /// Raw prediction in meters, without any clamping
    pub fn evaluate(&self, signal_dbm: f64) -> f64 {
        let x = (signal_dbm - self.min_signal) / self.signal_span;
        let y = self.intercept + self.slope * x;
        match self.kind {
            Regression::Linear => y,
            Regression::LogLinear => y.exp(),
        }
    }
}

/// Converts signal strength readings into distances.
///
/// Holds only immutable state, so a single instance can be shared across
/// request handlers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    model: FittedModel,
}

impl DistanceEstimator {
    /// Fit the default log-linear model over the built-in calibration table
    pub fn new() -> Result<Self, EstimateError> {
        Self::from_samples(&DEFAULT_CALIBRATION, Regression::default())
    }

    pub fn from_samples(
        samples: &[CalibrationSample],
        kind: Regression,
    ) -> Result<Self, EstimateError> {
        Ok(Self::with_model(FittedModel::fit(samples, kind)?))
    }

    pub fn with_model(model: FittedModel) -> Self {
        DistanceEstimator { model }
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn estimate(&self, signal_dbm: f64) -> Result<f64, EstimateError> {
        if !signal_dbm.is_finite() {
            return Err(EstimateError::InvalidInput(signal_dbm));
        }

        let clamped_signal = signal_dbm.clamp(MIN_SIGNAL_DBM, MAX_SIGNAL_DBM);
        let raw = self.model.evaluate(clamped_signal);
        let mut meters = raw.clamp(MIN_DISTANCE_M, MAX_DISTANCE_M);

        if meters <= COLLAPSED_PREDICTION_M && clamped_signal <= WEAK_SIGNAL_DBM {
            debug!(
                "Model collapsed to {:.4}m at {} dBm, using path loss fallback",
                raw, clamped_signal
            );
            meters = path_loss_distance(
                clamped_signal,
                REFERENCE_POWER_AT_1M_DBM,
                FREE_SPACE_EXPONENT,
            )
            .ok_or(EstimateError::EstimationFailed(meters))?;
        }

        if !meters.is_finite() || meters < 0.0 {
            return Err(EstimateError::EstimationFailed(meters));
        }

        Ok(meters)
    }
}
