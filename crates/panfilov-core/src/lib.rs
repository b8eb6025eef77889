//! # Panfilov Core
//!
//! Shared types and utilities for cardiac excitation modeling.
//!
//! ## Model Family
//!
//! | Model | Variables | Reference |
//! |-------|-----------|-----------|
//! | Aliev-Panfilov | u (potential), v (recovery) | Chaos, Solitons & Fractals 7(3), 1996 |
//!
//! ## Design Philosophy
//!
//! 1. Preserve numerical equivalence with the published equations
//! 2. Typed state records instead of name-to-value maps
//! 3. Fail fast on non-finite state instead of silent NaN propagation

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum PanfilovError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Numerical instability at step {step}: {variable} = {value}")]
    NumericalInstability {
        step: usize,
        variable: &'static str,
        value: f64,
    },

}

pub type Result<T> = std::result::Result<T, PanfilovError>;

/// Time point (ms)
pub type Time = f64;

/// Transmembrane potential (dimensionless, 0..1 range in the model)
pub type Potential = f64;

/// Time series data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Time points
    pub time: Vec<Time>,
    /// Values at each time point
    pub values: Vec<f64>,
    /// Variable name
    pub name: String,
}

impl TimeSeries {
    pub fn new(name: &str) -> Self {
        Self {
            time: Vec::new(),
            values: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn push(&mut self, t: Time, v: f64) {
        self.time.push(t);
        self.values.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Last recorded value, if any
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Time axis for a fixed-step run: t = 0, dt, 2*dt, ... up to (excluding) t_max
pub fn time_axis(t_max: Time, dt: Time) -> Array1<Time> {
    let n_steps = (t_max / dt) as usize;
    Array1::from_iter((0..n_steps).map(|i| dt * i as f64))
}
