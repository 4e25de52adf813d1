//! Autorotation executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the autorotation executable's main loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Simulated time after which the run is stopped if the mode hasn't already exited or landed.
    ///
    /// Units: seconds
    pub max_duration_s: f64,

    /// Time the vehicle is held on the ground after landing before the run is stopped.
    ///
    /// Units: seconds
    pub post_landing_s: f64,

    /// If true telemetry records are written to the session's CSV archives.
    pub archive_telemetry: bool,

    /// If true each cycle is padded out to the cycle period in wall clock time.
    pub real_time: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.0025,
            max_duration_s: 120.0,
            post_landing_s: 1.0,
            archive_telemetry: true,
            real_time: false,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let p: ExecParams = util::params::from_str("real_time = true\ncycle_period_s = 0.01")
            .unwrap();

        assert!(p.real_time);
        assert_eq!(p.cycle_period_s, 0.01);
        assert_eq!(p.max_duration_s, 120.0);
        assert!(p.archive_telemetry);
    }
}
