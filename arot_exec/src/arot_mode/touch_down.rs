//! # [`ArotMode`](super::ArotMode) touch down phase

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{ArotModePersistantData, ModeOutcome};
use crate::vehicle::Vehicle;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Lowest altitude used when sizing the touch down deceleration.
///
/// Units: meters
const TD_ALT_FLOOR_M: f64 = 0.1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Touch down phase.
///
/// The altitude controller takes over collective and holds the touch down descent rate, with the
/// vehicle held level. The phase continues until the outer mode manager detects the landing.
#[derive(Debug)]
pub struct TouchDown {
    pub start_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TouchDown {
    pub fn enter<V: Vehicle>(p: &mut ArotModePersistantData<V>) -> Self {
        if !p.vehicle.is_active_z() {
            p.vehicle.relax_alt_hold(p.ctrl.last_collective());
        }

        let vel_z = p.vehicle.climb_rate_ms();
        let end_vel = p.ctrl.td_vel_targ_ms();
        let alt = p.vehicle.altitude_m().max(TD_ALT_FLOOR_M);

        // Constant deceleration reaching the touch down speed at the ground
        let accel_linear = (end_vel * end_vel - vel_z * vel_z) / (2.0 * alt);

        debug!(
            "Touch down from {:.2} m at {:.2} m/s, accel limit {:.2} m/s/s",
            alt,
            vel_z,
            accel_linear.abs()
        );

        p.vehicle.set_max_vertical_accel(accel_linear.abs());
        p.vehicle.set_max_vertical_speed(vel_z, 0.0);

        Self { start_s: p.clock_s }
    }

    pub fn step<V: Vehicle>(&mut self, p: &mut ArotModePersistantData<V>) -> ModeOutcome {
        let td_vel = p.ctrl.td_vel_targ_ms().abs();
        p.vehicle.set_vertical_rate_target(-td_vel, p.dt);
        p.vehicle.update_z();

        p.pitch_target_deg = 0.0;

        ModeOutcome::Continue
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
