//! Decay schedules for the episode start-position distribution.
//!
//! Both functions map a cumulative train-sample counter to a decayed
//! beta-distribution parameter, collapsing to 1.0 (uniform) once the
//! annealing budget is spent. Pure and deterministic.

/// Steepness of the exponential annealing curve.
pub const DECAY_GAMMA: f64 = 3.5;

/// Linear decay from `param_0` to 1.0 in `max_steps`.
///
/// A non-positive `max_steps` disables annealing: `param_0` is returned
/// unchanged for every step.
pub fn linear_decay(step: u64, param_0: f64, max_steps: i64) -> f64 {
    if max_steps > 0 {
        if step as i64 <= max_steps {
            ((1.0 - param_0) / max_steps as f64) * step as f64 + param_0
        } else {
            1.0
        }
    } else {
        param_0
    }
}

/// For `step <= max_steps` returns the exp-decayed value in `[param_0, 1]`;
/// returns 1.0 once past `max_steps`. `gamma` controls steepness.
///
/// A non-positive `max_steps` disables annealing, as with [`linear_decay`].
pub fn exp_decay(step: u64, param_0: f64, max_steps: i64, gamma: f64) -> f64 {
    if max_steps > 0 {
        if step as i64 <= max_steps {
            let s = 2.0 - step as f64 / max_steps as f64;
            (s.powf(gamma) - 2.0_f64.powf(gamma)).exp() * (param_0 - 1.0) + 1.0
        } else {
            1.0
        }
    } else {
        param_0
    }
}
