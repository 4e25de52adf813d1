//! Forward speed regulator
//!
//! Converts a glide ground speed target into a pitch angle. The commanded
//! velocity is ramped towards the target, turned into an acceleration target
//! by a P + FF law, filtered, rate limited, and finally converted to the
//! pitch angle which would produce that acceleration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::{ArotCtrl, LowPassFilter, GRAVITY_MSS};
use crate::vehicle::Ahrs;
use util::maths::move_towards;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Cut off of the acceleration target filter.
///
/// Units: Hz
const ACCEL_TARGET_CUTOFF_HZ: f64 = 10.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Working state of the forward speed regulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FwdSpeedState {
    /// Ground speed the glide is heading towards.
    pub vel_target_ms: f64,

    /// Ramped velocity command.
    pub cmd_vel_ms: f64,

    pub speed_fwd_last_ms: f64,

    pub vel_p: f64,
    pub vel_ff: f64,

    /// Filtered acceleration target, before the output rate limit.
    pub accel_target_mss: f64,
    pub accel_out_mss: f64,
    pub accel_out_last_mss: f64,

    /// Set when the measured speed changed faster than the acceleration
    /// limit on the last cycle.
    pub limit_accel: bool,

    pub accel_target_lpf: LowPassFilter,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArotCtrl {
    /// Initialise the forward speed regulator from the current forward speed.
    pub fn init_fwd_spd_controller<A: Ahrs + ?Sized>(&mut self, ahrs: &A) {
        let speed_fwd_ms = ahrs.speed_forward_ms();

        self.fwd.accel_target_mss = 0.0;
        self.fwd.cmd_vel_ms = speed_fwd_ms;
        self.fwd.speed_fwd_last_ms = speed_fwd_ms;
        self.fwd.accel_out_last_mss = speed_fwd_ms * self.params.fwd_vel_ff;

        self.fwd.accel_target_lpf = LowPassFilter::new(ACCEL_TARGET_CUTOFF_HZ);
        self.fwd.accel_target_lpf.reset(self.fwd.accel_out_last_mss);
    }

    /// Target the configured glide ground speed.
    pub fn set_desired_fwd_speed(&mut self) {
        self.fwd.vel_target_ms = self.params.target_gnd_speed_ms;
    }

    /// Run one cycle of the forward speed regulator and update the pitch
    /// target.
    pub fn update_forward_speed_controller<A: Ahrs + ?Sized>(&mut self, ahrs: &A) {
        let fwd = &mut self.fwd;
        let accel_max = self.accel_max_mss;

        let speed_fwd_ms = ahrs.speed_forward_ms();
        let delta_speed_fwd = speed_fwd_ms - fwd.speed_fwd_last_ms;
        fwd.speed_fwd_last_ms = speed_fwd_ms;

        // Ramp the command to avoid steps
        fwd.cmd_vel_ms =
            move_towards(fwd.cmd_vel_ms, fwd.vel_target_ms, accel_max * self.dt);

        fwd.vel_p = self.params.fwd_vel_p * (fwd.cmd_vel_ms - speed_fwd_ms);
        fwd.vel_ff = fwd.cmd_vel_ms * self.params.fwd_vel_ff;

        fwd.accel_target_mss = fwd
            .accel_target_lpf
            .apply(fwd.vel_p + fwd.vel_ff, self.dt);

        // Limit the change in output
        fwd.accel_target_mss = fwd.accel_target_mss.max(fwd.accel_out_last_mss - accel_max);
        fwd.accel_target_mss = fwd.accel_target_mss.min(fwd.accel_out_last_mss + accel_max);

        // Noisy speed estimates must not be amplified, so while the measured
        // speed is changing quickly only reductions in output are accepted
        fwd.limit_accel = delta_speed_fwd.abs() > accel_max * self.dt;

        if !fwd.limit_accel
            || fwd.accel_target_mss.abs() < fwd.accel_out_last_mss.abs()
        {
            fwd.accel_out_mss = fwd.accel_target_mss;
        } else {
            fwd.accel_out_mss = fwd.accel_out_last_mss;
        }
        fwd.accel_out_last_mss = fwd.accel_out_mss;

        self.pitch_target_deg = (-fwd.accel_out_mss / GRAVITY_MSS).atan().to_degrees();

        trace!(
            "Forward speed: measured {:.2}, cmd {:.2}, accel out {:.3}, pitch {:.2}",
            speed_fwd_ms,
            self.fwd.cmd_vel_ms,
            self.fwd.accel_out_mss,
            self.pitch_target_deg
        );
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
