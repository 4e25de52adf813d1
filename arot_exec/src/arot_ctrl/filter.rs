//! Single pole low pass filter used as the following trim in each regulator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// First order IIR low pass filter with a runtime settable cut off.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassFilter {
    cutoff_hz: f64,
    output: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LowPassFilter {
    pub fn new(cutoff_hz: f64) -> Self {
        Self {
            cutoff_hz,
            output: 0.0,
        }
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f64) {
        self.cutoff_hz = cutoff_hz;
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff_hz
    }

    /// Set the filter state to `value` without a transient.
    pub fn reset(&mut self, value: f64) {
        self.output = value;
    }

    /// Feed a new sample through the filter and return the filtered value.
    ///
    /// A non-positive cut off or time step disables the filter, so the input
    /// passes straight through.
    pub fn apply(&mut self, input: f64, dt: f64) -> f64 {
        self.output += (input - self.output) * self.alpha(dt);
        self.output
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    fn alpha(&self, dt: f64) -> f64 {
        if self.cutoff_hz <= 0.0 || dt <= 0.0 {
            return 1.0;
        }

        let rc = 1.0 / (2.0 * PI * self.cutoff_hz);
        dt / (dt + rc)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
