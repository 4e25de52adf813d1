//! # [`ArotMode`](super::ArotMode) flare phase

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{ArotModePersistantData, ModeOutcome, HEAD_SPEED_TARGET_RATIO};
use crate::vehicle::Vehicle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Flare phase.
///
/// Flies the flare trajectory predicted on the cycle the flare was found feasible. The head speed
/// regulator is not run.
#[derive(Debug)]
pub struct Flare {
    pub start_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Flare {
    pub fn enter<V: Vehicle>(p: &mut ArotModePersistantData<V>) -> Self {
        let col_flare_cutoff_hz = p.ctrl.params().col_flare_cutoff_hz;
        p.ctrl.set_col_cutoff_freq(col_flare_cutoff_hz);

        p.ctrl.set_flare_initial_cond(&p.vehicle);
        p.ctrl.init_flare_controller(&p.vehicle);

        Self { start_s: p.clock_s }
    }

    pub fn step<V: Vehicle>(&mut self, p: &mut ArotModePersistantData<V>) -> ModeOutcome {
        p.ctrl.set_flare_time(p.clock_s - self.start_s);
        p.ctrl.set_target_head_speed(HEAD_SPEED_TARGET_RATIO);

        p.pitch_target_deg = p.ctrl.update_flare_controller(&mut p.vehicle);

        ModeOutcome::Continue
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
