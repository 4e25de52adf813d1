//! Simulation parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::vehicle::FrameType;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the point mass rotorcraft model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Airframe reported to the controller.
    pub frame: FrameType,

    // ---- INITIAL CONDITIONS ----
    /// Units: meters
    pub initial_alt_m: f64,

    /// Units: meters/second
    pub initial_vel_fwd_ms: f64,

    /// Climb rate at power loss, negative for descent.
    ///
    /// Units: meters/second
    pub initial_vel_z_ms: f64,

    /// Head speed at power loss as a fraction of `rpm_nominal`.
    pub initial_head_speed_ratio: f64,

    /// Collective held before the controller takes over.
    pub initial_collective: f64,

    /// Units: degrees
    pub heading_deg: f64,

    // ---- ROTOR ----
    /// Head speed the ratios are relative to.
    ///
    /// Units: revolutions/minute
    pub rpm_nominal: f64,

    /// Rotor thrust at full collective and nominal head speed.
    ///
    /// Units: g
    pub thrust_coeff: f64,

    /// Rotor acceleration per unit of descent rate from the inflow through the disc.
    ///
    /// Units: 1/meter
    pub inflow_gain: f64,

    /// Rotor deceleration per unit of collective from the induced drag of the blades.
    ///
    /// Units: 1/second
    pub rotor_drag_gain: f64,

    /// Gain with which the engine governor holds nominal head speed while the interlock is
    /// engaged.
    ///
    /// Units: 1/second
    pub governor_gain: f64,

    // ---- AIRFRAME ----
    /// Quadratic fuselage drag coefficient in the forward direction.
    ///
    /// Units: 1/meter
    pub fwd_drag_coeff: f64,

    /// Time constant of the attitude response to a pitch target.
    ///
    /// Units: seconds
    pub pitch_time_const_s: f64,

    /// Lean angle limit of the attitude controller.
    ///
    /// Units: degrees
    pub lean_angle_max_deg: f64,

    /// Proportional gain of the emulated vertical rate controller.
    ///
    /// Units: 1/second
    pub z_rate_p: f64,

    // ---- EVENTS ----
    /// Time at which the pilot re-engages the interlock, if at all.
    ///
    /// Units: seconds
    pub interlock_at_s: Option<f64>,

    /// Window during which the RPM sensor reports an unreliable reading, `[start, end]`.
    ///
    /// Units: seconds
    pub rpm_fault_window_s: Option<[f64; 2]>,

    // ---- PILOT ----
    /// Units: meters/second
    pub pilot_climb_rate_ms: f64,

    /// Units: meters/second
    pub pilot_speed_up_ms: f64,

    /// Units: meters/second
    pub pilot_speed_down_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            frame: FrameType::TradHeli,
            initial_alt_m: 80.0,
            initial_vel_fwd_ms: 11.0,
            initial_vel_z_ms: -1.0,
            initial_head_speed_ratio: 1.05,
            initial_collective: 0.4,
            heading_deg: 0.0,
            rpm_nominal: 1500.0,
            thrust_coeff: 2.5,
            inflow_gain: 0.08,
            rotor_drag_gain: 1.0,
            governor_gain: 2.0,
            fwd_drag_coeff: 0.005,
            pitch_time_const_s: 0.2,
            lean_angle_max_deg: 30.0,
            z_rate_p: 2.0,
            interlock_at_s: None,
            rpm_fault_window_s: None,
            pilot_climb_rate_ms: 0.0,
            pilot_speed_up_ms: 2.5,
            pilot_speed_down_ms: 1.5,
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
    fn test_stock_file_matches_defaults() {
        let p: SimParams =
            util::params::from_str(include_str!("../../../params/sim.toml")).unwrap();
        let d = SimParams::default();

        assert_eq!(p.frame, d.frame);
        assert_eq!(p.initial_alt_m, d.initial_alt_m);
        assert_eq!(p.thrust_coeff, d.thrust_coeff);
        assert_eq!(p.interlock_at_s, None);
        assert_eq!(p.rpm_fault_window_s, None);
    }

    #[test]
    fn test_events() {
        let p: SimParams =
            util::params::from_str("interlock_at_s = 6.0\nrpm_fault_window_s = [3.0, 3.5]")
                .unwrap();

        assert_eq!(p.interlock_at_s, Some(6.0));
        assert_eq!(p.rpm_fault_window_s, Some([3.0, 3.5]));
        assert_eq!(p.frame, FrameType::TradHeli);
    }
}
