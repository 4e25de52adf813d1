//! # [`ArotMode`](super::ArotMode) bail out phase

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use util::maths::{constrain, move_towards};

use super::{
    ArotModePersistantData, ExitReason, ModeOutcome, BAIL_OUT_MIN_MARGIN_S,
    BAIL_OUT_MOTOR_RAMP_TIME_S, TIMER_TOLERANCE_S,
};
use crate::vehicle::{SpoolState, Vehicle};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Bail out phase.
///
/// Entered when power is restored in the air. Demands are held while the motors spool up, then the
/// climb rate is ramped to the pilot's demand and pitch towards level. Pitch moves at the rate which
/// would level it over the whole bail out time, so it is part way there when the mode exits and
/// the previous flight mode resumes.
#[derive(Debug)]
pub struct BailOut {
    pub start_s: f64,

    /// Total time of the bail out, including the motor spool up.
    bail_time_s: f64,

    /// Climb rate target, ramped towards the pilot's demand.
    desired_vel_z_ms: f64,

    /// Pilot's climb rate demand at the start of the bail out.
    pilot_vel_z_ms: f64,

    /// Rate at which the climb rate target is ramped.
    ///
    /// Units: meters/second^2
    climb_rate_adjust: f64,

    /// Rate at which the pitch target is ramped towards level.
    ///
    /// Units: degrees/second
    pitch_adjust: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BailOut {
    pub fn enter<V: Vehicle>(p: &mut ArotModePersistantData<V>) -> Self {
        let bail_time_s = p
            .ctrl
            .bail_time_s()
            .max(BAIL_OUT_MOTOR_RAMP_TIME_S + BAIL_OUT_MIN_MARGIN_S);
        let ramp_time_s = bail_time_s - BAIL_OUT_MOTOR_RAMP_TIME_S;

        let vel_z = p.vehicle.climb_rate_ms();

        if !p.vehicle.is_active_z() {
            p.vehicle.relax_alt_hold(p.ctrl.last_collective());
        }

        let pilot_spd_dn = -p.vehicle.speed_down_ms().abs();
        let pilot_spd_up = p.vehicle.speed_up_ms();
        p.vehicle.set_max_vertical_speed(vel_z, pilot_spd_up);

        let pilot_vel_z_ms =
            constrain(p.vehicle.desired_climb_rate_ms(), pilot_spd_dn, pilot_spd_up);

        let climb_rate_adjust = (vel_z - pilot_vel_z_ms) / ramp_time_s;
        let pitch_adjust = p.pitch_target_deg / bail_time_s;

        p.vehicle.set_max_vertical_accel(climb_rate_adjust.abs());
        p.vehicle.set_desired_spool_state(SpoolState::ThrottleUnlimited);

        debug!(
            "Bail out over {:.2} s from {:.2} m/s to {:.2} m/s",
            bail_time_s, vel_z, pilot_vel_z_ms
        );

        Self {
            start_s: p.clock_s,
            bail_time_s,
            desired_vel_z_ms: vel_z,
            pilot_vel_z_ms,
            climb_rate_adjust,
            pitch_adjust,
        }
    }

    pub fn step<V: Vehicle>(&mut self, p: &mut ArotModePersistantData<V>) -> ModeOutcome {
        let elapsed_s = p.clock_s - self.start_s;

        // Hold until the motors have spooled up
        if elapsed_s >= BAIL_OUT_MOTOR_RAMP_TIME_S - TIMER_TOLERANCE_S {
            self.desired_vel_z_ms = move_towards(
                self.desired_vel_z_ms,
                self.pilot_vel_z_ms,
                self.climb_rate_adjust * p.dt,
            );
            p.pitch_target_deg =
                move_towards(p.pitch_target_deg, 0.0, self.pitch_adjust * p.dt);
        }

        p.vehicle.set_vertical_rate_target(self.desired_vel_z_ms, p.dt);
        p.vehicle.update_z();

        if elapsed_s >= self.bail_time_s - TIMER_TOLERANCE_S {
            ModeOutcome::Exit(ExitReason::BailOutComplete)
        } else {
            ModeOutcome::Continue
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use crate::arot_mode::{test::enabled_mode, ExitReason, ModeOutcome, PhaseKind};
    use crate::vehicle::fake::FakeVehicle;

    const DT: f64 = 0.01;

    #[test]
    fn test_bail_out_timing() {
        let mut vehicle = FakeVehicle::default();
        vehicle.climb_rate_ms = -5.0;
        vehicle.pilot_climb_rate_ms = 1.0;
        let mut mode = enabled_mode(vehicle);
        mode.activate().unwrap();
        mode.run(DT).unwrap();

        mode.vehicle_mut().interlock = true;

        // First second of bail out holds the descent rate while the motors spool
        for _ in 0..100 {
            let out = mode.run(DT).unwrap();
            assert_eq!(out.phase, PhaseKind::BailOut);
            assert_eq!(mode.vehicle().rate_target_ms, Some(-5.0));
        }

        // Then ramps towards the pilot's demand
        let out = mode.run(DT).unwrap();
        assert_eq!(out.outcome, ModeOutcome::Continue);
        assert!((mode.vehicle().rate_target_ms.unwrap() + 4.94).abs() < 1e-9);

        let mut ticks = 1;
        loop {
            let out = mode.run(DT).unwrap();
            ticks += 1;
            if let ModeOutcome::Exit(reason) = out.outcome {
                assert_eq!(reason, ExitReason::BailOutComplete);
                break;
            }
            assert!(ticks < 200);
        }

        // Exits at 2 s, having reached the pilot's climb rate
        assert_eq!(ticks, 101);
        assert!((mode.vehicle().rate_target_ms.unwrap() - 1.0).abs() < 1e-9);
        assert!(!mode.is_active());
    }

    #[test]
    fn test_pitch_ramps_over_bail_time() {
        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();
        mode.run(DT).unwrap();

        // Glide pitch is nose down
        let pitch_0 = mode.persistant.pitch_target_deg;
        assert!(pitch_0 < 0.0);

        mode.vehicle_mut().interlock = true;

        // Held while the motors spool
        for _ in 0..100 {
            let out = mode.run(DT).unwrap();
            assert_eq!(out.pitch_target_deg, pitch_0);
        }

        // Then raised by a 2 s ramp's step per cycle, for the remaining second
        let mut last_pitch = pitch_0;
        for _ in 0..100 {
            let out = mode.run(DT).unwrap();
            assert!((out.pitch_target_deg - last_pitch + pitch_0 / 200.0).abs() < 1e-9);
            last_pitch = out.pitch_target_deg;
        }
        assert!((last_pitch - pitch_0 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pilot_demand_is_limited() {
        let mut vehicle = FakeVehicle::default();
        vehicle.pilot_climb_rate_ms = 10.0;
        let mut mode = enabled_mode(vehicle);
        mode.activate().unwrap();

        mode.vehicle_mut().interlock = true;
        for _ in 0..250 {
            if mode.run(DT).is_err() {
                break;
            }
        }

        assert!((mode.vehicle().rate_target_ms.unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(mode.vehicle().max_speed_z_ms, Some((-5.0, 2.5)));
    }
}
