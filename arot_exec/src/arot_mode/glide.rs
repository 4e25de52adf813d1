//! # [`ArotMode`](super::ArotMode) steady glide phase

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{ArotModePersistantData, ModeOutcome, HEAD_SPEED_TARGET_RATIO};
use crate::vehicle::Vehicle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Steady glide phase, holding nominal head speed and the glide ground speed.
#[derive(Debug)]
pub struct SteadyGlide {
    pub start_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteadyGlide {
    pub fn enter<V: Vehicle>(p: &mut ArotModePersistantData<V>) -> Self {
        let col_glide_cutoff_hz = p.ctrl.params().col_glide_cutoff_hz;
        p.ctrl.set_col_cutoff_freq(col_glide_cutoff_hz);
        p.ctrl.set_desired_fwd_speed();

        // The entry ramp may not have reached nominal
        p.ctrl.set_target_head_speed(HEAD_SPEED_TARGET_RATIO);

        Self { start_s: p.clock_s }
    }

    pub fn step<V: Vehicle>(&mut self, p: &mut ArotModePersistantData<V>) -> ModeOutcome {
        p.ctrl.update_forward_speed_controller(&p.vehicle);
        p.pitch_target_deg = p.ctrl.pitch_target_deg();

        p.bad_rpm = p.ctrl.update_hs_glide_controller(&mut p.vehicle);

        ModeOutcome::Continue
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::SteadyGlide;
    use crate::arot_mode::{test::enabled_mode, ArotMode, PhaseKind};
    use crate::vehicle::fake::FakeVehicle;

    const DT: f64 = 0.01;

    /// Run the entry phase out, returning once the glide has started.
    fn gliding_mode(vehicle: FakeVehicle) -> ArotMode<FakeVehicle> {
        let mut mode = enabled_mode(vehicle);
        mode.activate().unwrap();

        for _ in 0..300 {
            let out = mode.run(DT).unwrap();
            if out.phase == PhaseKind::SteadyGlide {
                return mode;
            }
        }

        panic!("Entry never completed");
    }

    #[test]
    fn test_enter_targets_nominal_head_speed() {
        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();

        // Entry ramp cut short
        mode.persistant.ctrl.set_target_head_speed(1.2);

        SteadyGlide::enter(&mut mode.persistant);

        let ctrl = mode.ctrl();
        assert_eq!(ctrl.target_head_speed(), 1.0);
        assert_eq!(ctrl.hs.col_cutoff_hz, ctrl.params().col_glide_cutoff_hz);
        assert_eq!(ctrl.fwd.vel_target_ms, ctrl.params().target_gnd_speed_ms);
    }

    #[test]
    fn test_glide_cutoff_reaches_collective_trim() {
        let mode = gliding_mode(FakeVehicle::default());

        let ctrl = mode.ctrl();
        assert_eq!(ctrl.params().col_glide_cutoff_hz, 0.1);
        assert_eq!(ctrl.col_trim_lpf.cutoff(), 0.1);
    }

    #[test]
    fn test_head_speed_regulator_runs() {
        let mut mode = gliding_mode(FakeVehicle::default());

        // Rotor 10% over speed, so collective is raised above the trim
        mode.vehicle_mut().rpm[0] = Some(1650.0);
        let trim = mode.ctrl().last_collective();
        let out = mode.run(DT).unwrap();

        assert_eq!(out.phase, PhaseKind::SteadyGlide);
        assert!((mode.ctrl().hs.error - 0.1).abs() < 1e-9);
        assert!(mode.ctrl().last_collective() > trim);
        assert_eq!(mode.vehicle().collective, Some(mode.ctrl().last_collective()));
        assert!(!mode.persistant.bad_rpm);
    }

    #[test]
    fn test_forward_speed_regulator_runs() {
        let mut mode = gliding_mode(FakeVehicle::default());
        let pitch_0 = mode.persistant.pitch_target_deg;

        // Well below the glide speed, the nose goes down to accelerate
        mode.vehicle_mut().groundspeed.x = 5.0;
        for _ in 0..50 {
            let out = mode.run(DT).unwrap();
            assert_eq!(out.phase, PhaseKind::SteadyGlide);
            assert_eq!(out.pitch_target_deg, mode.ctrl().pitch_target_deg());
        }

        assert!(mode.persistant.pitch_target_deg < pitch_0);
        assert!(mode.ctrl().fwd.vel_p > 0.0);
    }
}
