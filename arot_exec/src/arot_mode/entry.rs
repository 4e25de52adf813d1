//! # [`ArotMode`](super::ArotMode) entry phase

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use util::maths::move_towards;

use super::{ArotModePersistantData, ModeOutcome, ENTRY_TIME_S, HEAD_SPEED_TARGET_RATIO};
use crate::vehicle::Vehicle;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Half width of the band around the nominal head speed in which the target snaps to nominal.
const HEAD_SPEED_BAND: f64 = 0.005;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Entry phase.
///
/// The head speed target is ramped linearly from the head speed at activation to the nominal
/// head speed over the entry duration. Once the measured head speed is within half a percent of
/// nominal the target snaps to nominal.
#[derive(Debug)]
pub struct Entry {
    pub start_s: f64,

    /// Current normalised head speed target.
    target_head_speed: f64,

    /// Rate at which the target approaches nominal.
    ///
    /// Units: 1/second
    hs_decay: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Entry {
    pub fn enter<V: Vehicle>(p: &mut ArotModePersistantData<V>) -> Self {
        let col_entry_cutoff_hz = p.ctrl.params().col_entry_cutoff_hz;
        p.ctrl.set_col_cutoff_freq(col_entry_cutoff_hz);
        p.ctrl.set_desired_fwd_speed();
        p.ctrl.set_target_head_speed(p.initial_ratio);

        let hs_decay = (p.initial_ratio - HEAD_SPEED_TARGET_RATIO) / ENTRY_TIME_S;
        debug!(
            "Entry from head speed ratio {:.3}, decaying at {:.4}/s",
            p.initial_ratio, hs_decay
        );

        Self {
            start_s: p.clock_s,
            target_head_speed: p.initial_ratio,
            hs_decay,
        }
    }

    pub fn step<V: Vehicle>(&mut self, p: &mut ArotModePersistantData<V>) -> ModeOutcome {
        let ratio = p.ctrl.read_rpm_ratio(&p.vehicle);

        if (ratio - HEAD_SPEED_TARGET_RATIO).abs() > HEAD_SPEED_TARGET_RATIO * HEAD_SPEED_BAND {
            self.target_head_speed = move_towards(
                self.target_head_speed,
                HEAD_SPEED_TARGET_RATIO,
                self.hs_decay * p.dt,
            );
        } else {
            self.target_head_speed = HEAD_SPEED_TARGET_RATIO;
        }
        p.ctrl.set_target_head_speed(self.target_head_speed);

        p.ctrl.update_forward_speed_controller(&p.vehicle);
        p.pitch_target_deg = p.ctrl.pitch_target_deg();

        p.bad_rpm = p.ctrl.update_hs_glide_controller(&mut p.vehicle);

        ModeOutcome::Continue
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
