//! # Panfilov-Zero-D
//!
//! Aliev-Panfilov two-variable cardiac excitation model in a single,
//! spatially-unresolved (0D) compartment.
//!
//! ## Model
//!
//! Two coupled nonlinear ODEs:
//!
//! ```text
//! du/dt = -k*u*(u - a)*(u - 1) - u*v + I_stim(t)
//! dv/dt = -(eps + mu1*v/(mu2 + u)) * (v + k*u*(u - a - 1))
//! ```
//!
//! where u is the transmembrane potential analogue (fast variable) and v is
//! the recovery variable (slow variable). External stimulation enters as a
//! sum of rectangular current pulses added to du/dt.
//!
//! ## Integration
//!
//! Fixed-step semi-implicit Euler: within a step, v is advanced first and the
//! already-updated v is used to evaluate u's reaction term. This write-before-
//! read ordering differs from a simultaneous-update explicit Euler scheme and
//! is preserved as the model's reference behavior; reordering the two updates
//! changes every numerical output.
//!
//! ## References
//!
//! - Aliev, R. R., & Panfilov, A. V. (1996). A simple two-variable model of
//!   cardiac excitation. Chaos, Solitons & Fractals, 7(3), 293-301.

use panfilov_core::{PanfilovError, Potential, Result, Time, TimeSeries};
use serde::{Deserialize, Serialize};

// ============================================================================
// MODEL EQUATIONS
// ============================================================================

/// Reaction term for the transmembrane potential u:
/// `-k*u*(u - a)*(u - 1) - u*v`
///
/// Cubic source term modeling fast depolarization, minus the bilinear
/// coupling with the recovery variable. Pure; defined for all finite inputs.
pub fn calc_rhs(u: f64, v: f64, a: f64, k: f64) -> f64 {
    -k * u * (u - a) * (u - 1.0) - u * v
}

/// Rate of change of the recovery variable v:
/// `-(eps + mu1*v/(mu2 + u)) * (v + k*u*(u - a - 1))`
///
/// The denominator `mu2 + u` is not guarded; a state/parameter combination
/// that drives it to zero produces a non-finite rate, which the run loop
/// surfaces as a numerical instability.
pub fn calc_dv(v: f64, u: f64, a: f64, k: f64, eps: f64, mu1: f64, mu2: f64) -> f64 {
    -(eps + (mu1 * v) / (mu2 + u)) * (v + k * u * (u - a - 1.0))
}

// ============================================================================
// PARAMETERS & STATE
// ============================================================================

/// Model parameters, immutable for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Excitability threshold
    pub a: f64,
    /// Strength of the nonlinear source term
    pub k: f64,
    /// Baseline recovery rate
    pub eps: f64,
    /// Recovery scaling
    pub mu1: f64,
    /// Recovery offset
    pub mu2: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            a: 0.1,
            k: 8.0,
            eps: 0.01,
            mu1: 0.2,
            mu2: 0.3,
        }
    }
}

/// State variables, owned and mutated only by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Transmembrane potential analogue
    pub u: Potential,
    /// Recovery variable
    pub v: f64,
}

impl State {
    pub fn is_finite(&self) -> bool {
        self.u.is_finite() && self.v.is_finite()
    }
}

// ============================================================================
// STIMULATION
// ============================================================================

/// Rectangular stimulus pulse, active on the half-open window
/// `[t_start, t_start + duration)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stimulation {
    /// Window start time (ms)
    pub t_start: Time,
    /// Pulse duration (ms)
    pub duration: Time,
    /// Pulse amplitude (du/dt contribution, units/ms)
    pub amplitude: f64,
}

impl Stimulation {
    pub fn new(t_start: Time, duration: Time, amplitude: f64) -> Self {
        Self {
            t_start,
            duration,
            amplitude,
        }
    }

    /// Instantaneous stimulus value at time t
    pub fn value_at(&self, t: Time) -> f64 {
        if self.t_start <= t && t < self.t_start + self.duration {
            self.amplitude
        } else {
            0.0
        }
    }
}

// ============================================================================
// SIMULATION ENGINE
// ============================================================================

/// Recorded trace of both state variables, one entry per completed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub u: TimeSeries,
    pub v: TimeSeries,
}

impl History {
    fn new() -> Self {
        Self {
            u: TimeSeries::new("u"),
            v: TimeSeries::new("v"),
        }
    }

    /// Number of completed steps; u and v always have the same length
    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

/// Aliev-Panfilov 0D simulation engine
///
/// Owns the current state, advances it one fixed-size time step at a time,
/// and accumulates a trace of both variables.
#[derive(Debug, Clone)]
pub struct AlievPanfilov0D {
    dt: Time,
    stimulations: Vec<Stimulation>,
    parameters: Parameters,
    state: State,
    history: History,
}

impl AlievPanfilov0D {
    /// Create a new engine with default parameters and state at rest.
    ///
    /// Rejects `dt <= 0` and any stimulation with a negative duration.
    /// Overlapping pulses are permitted; their contributions sum.
    pub fn new(dt: Time, stimulations: Vec<Stimulation>) -> Result<Self> {
        if dt <= 0.0 {
            return Err(PanfilovError::ConfigError(format!(
                "time step must be positive, got {dt}"
            )));
        }
        for stim in &stimulations {
            if stim.duration < 0.0 {
                return Err(PanfilovError::ConfigError(format!(
                    "stimulation at t_start = {} has negative duration {}",
                    stim.t_start, stim.duration
                )));
            }
        }

        Ok(Self {
            dt,
            stimulations,
            parameters: Parameters::default(),
            state: State::default(),
            history: History::new(),
        })
    }

    /// Replace the default parameters (e.g. from a config file)
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn dt(&self) -> Time {
        self.dt
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Total external stimulus at time t (pulses superpose)
    pub fn stimulus_at(&self, t: Time) -> f64 {
        self.stimulations.iter().map(|s| s.value_at(t)).sum()
    }

    /// Advance the state by one time step.
    ///
    /// The step index i enters only through the stimulus time `t = dt*i`;
    /// the model is otherwise autonomous. Update order is fixed: v first,
    /// then u using the already-updated v (semi-implicit splitting).
    pub fn step(&mut self, i: usize) {
        let p = self.parameters;

        let dv = calc_dv(
            self.state.v,
            self.state.u,
            p.a,
            p.k,
            p.eps,
            p.mu1,
            p.mu2,
        );
        self.state.v += self.dt * dv;

        let rhs = calc_rhs(self.state.u, self.state.v, p.a, p.k);
        let stim = self.stimulus_at(self.dt * i as f64);
        self.state.u += self.dt * (rhs + stim);
    }

    /// Run the simulation up to t_max, recording both variables after every
    /// step.
    ///
    /// Takes `floor(t_max / dt)` steps. Fails fast with the step index and
    /// offending variable if a step produces a non-finite value; the
    /// offending value is not recorded, so the history covers exactly the
    /// completed steps.
    pub fn run(&mut self, t_max: Time) -> Result<()> {
        let n_steps = (t_max / self.dt) as usize;
        for i in 0..n_steps {
            self.step(i);
            self.check_finite(i)?;
            let t = self.dt * i as f64;
            self.history.u.push(t, self.state.u);
            self.history.v.push(t, self.state.v);
        }
        Ok(())
    }

    // v is updated before u within a step, so when both go non-finite in
    // the same step, v is the offending variable: check it first.
    fn check_finite(&self, step: usize) -> Result<()> {
        if !self.state.v.is_finite() {
            return Err(PanfilovError::NumericalInstability {
                step,
                variable: "v",
                value: self.state.v,
            });
        }
        if !self.state.u.is_finite() {
            return Err(PanfilovError::NumericalInstability {
                step,
                variable: "u",
                value: self.state.u,
            });
        }
        Ok(())
    }
}

// ============================================================================
// STANDARD PROTOCOLS
// ============================================================================

pub mod protocols {
    use super::Stimulation;

    /// Single suprathreshold pulse at t = 0
    pub fn single_pulse() -> Vec<Stimulation> {
        vec![Stimulation::new(0.0, 0.1, 2.0)]
    }

    /// Three-beat pacing protocol (pulses at t = 0, 40, 70 ms)
    pub fn paced() -> Vec<Stimulation> {
        vec![
            Stimulation::new(0.0, 0.1, 2.0),
            Stimulation::new(40.0, 0.1, 2.0),
            Stimulation::new(70.0, 0.1, 2.0),
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equations_at_rest() {
        let p = Parameters::default();
        assert_eq!(calc_rhs(0.0, 0.0, p.a, p.k), 0.0);
        assert_eq!(calc_dv(0.0, 0.0, p.a, p.k, p.eps, p.mu1, p.mu2), 0.0);
    }

    #[test]
    fn test_rhs_known_value() {
        // -8*0.5*(0.5-0.1)*(0.5-1) - 0.5*0 = 0.8
        let rhs = calc_rhs(0.5, 0.0, 0.1, 8.0);
        assert!((rhs - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_dv_known_value() {
        // -(0.01 + 0) * (0 + 8*0.5*(0.5 - 1.1)) = 0.024
        let dv = calc_dv(0.0, 0.5, 0.1, 8.0, 0.01, 0.2, 0.3);
        assert!((dv - 0.024).abs() < 1e-12);
    }

    #[test]
    fn test_stimulation_window() {
        let stim = Stimulation::new(0.0, 0.1, 2.0);
        assert_eq!(stim.value_at(0.0), 2.0);
        assert_eq!(stim.value_at(0.099), 2.0);
        assert_eq!(stim.value_at(0.1), 0.0);
        assert_eq!(stim.value_at(-0.001), 0.0);
    }

    #[test]
    fn test_stimulus_superposition() {
        let mut sim = AlievPanfilov0D::new(
            0.01,
            vec![
                Stimulation::new(0.0, 0.1, 2.0),
                Stimulation::new(0.0, 0.05, 1.5),
            ],
        )
        .unwrap();

        assert_eq!(sim.stimulus_at(0.0), 3.5);
        assert_eq!(sim.stimulus_at(0.06), 2.0);

        // From rest both reaction terms are zero, so the first step is pure
        // stimulus: u = dt * (amp1 + amp2)
        sim.step(0);
        assert_eq!(sim.state().u, 0.01 * 3.5);
    }

    #[test]
    fn test_zero_stimulus_equilibrium() {
        let mut sim = AlievPanfilov0D::new(0.01, Vec::new()).unwrap();
        sim.run(1.0).unwrap();

        assert_eq!(sim.history().len(), 100);
        assert!(sim.history().u.values.iter().all(|&u| u == 0.0));
        assert!(sim.history().v.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_history_length_invariant() {
        let mut sim = AlievPanfilov0D::new(0.01, protocols::single_pulse()).unwrap();
        sim.run(2.5).unwrap();

        let n = (2.5f64 / 0.01) as usize;
        assert_eq!(sim.history().u.len(), n);
        assert_eq!(sim.history().v.len(), n);
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut sim = AlievPanfilov0D::new(0.01, protocols::paced()).unwrap();
            sim.run(100.0).unwrap();
            (
                sim.history().u.values.clone(),
                sim.history().v.values.clone(),
            )
        };

        let (u1, v1) = run();
        let (u2, v2) = run();
        assert_eq!(u1, u2);
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_single_pulse_scenario() {
        let mut sim = AlievPanfilov0D::new(0.01, protocols::single_pulse()).unwrap();
        sim.run(1.0).unwrap();

        let u = &sim.history().u.values;
        assert_eq!(u.len(), 100);

        // Strictly increasing while the pulse is active (steps 0..=9)
        assert!(u[0] > 0.0);
        for i in 0..9 {
            assert!(u[i + 1] > u[i], "u not increasing at step {}", i + 1);
        }

        assert!(sim.history().u.values.iter().all(|x| x.is_finite()));
        assert!(sim.history().v.values.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_rejects_bad_dt() {
        assert!(AlievPanfilov0D::new(0.0, Vec::new()).is_err());
        assert!(AlievPanfilov0D::new(-0.01, Vec::new()).is_err());
    }

    #[test]
    fn test_rejects_negative_duration() {
        let result = AlievPanfilov0D::new(0.01, vec![Stimulation::new(0.0, -0.1, 2.0)]);
        assert!(matches!(result, Err(PanfilovError::ConfigError(_))));
    }

    #[test]
    fn test_instability_fails_fast() {
        // mu2 = 0 with u = v = 0 makes the recovery rate 0/0 on the very
        // first step
        let params = Parameters {
            mu2: 0.0,
            ..Parameters::default()
        };
        let mut sim = AlievPanfilov0D::new(0.01, Vec::new())
            .unwrap()
            .with_parameters(params);

        let result = sim.run(1.0);
        match result {
            Err(PanfilovError::NumericalInstability { step, variable, .. }) => {
                assert_eq!(step, 0);
                assert_eq!(variable, "v");
            }
            other => panic!("expected instability error, got {other:?}"),
        }
        assert!(sim.history().is_empty());
    }

    #[test]
    fn test_parameters_from_partial_json() {
        let params: Parameters = serde_json::from_str(r#"{"k": 10.0}"#).unwrap();
        assert_eq!(params.k, 10.0);
        assert_eq!(params.a, 0.1);
        assert_eq!(params.mu2, 0.3);
    }

    #[test]
    fn test_paced_protocol() {
        let stims = protocols::paced();
        assert_eq!(stims.len(), 3);
        assert_eq!(stims[1].t_start, 40.0);
        assert_eq!(stims[2].value_at(70.05), 2.0);
    }
}
