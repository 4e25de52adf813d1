//! Vehicle interface implementations for [`SimVehicle`]

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::{Vector2, Vector3};
use util::maths::constrain;

use super::SimVehicle;
use crate::{
    arot_ctrl::TelemetryRecord,
    vehicle::{
        Ahrs, AttitudeControl, FrameType, LandDetector, Motors, Pilot, PosControl, RpmSource,
        SpoolState, Telemetry,
    },
};

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Motors for SimVehicle {
    fn frame_type(&self) -> FrameType {
        self.params.frame
    }

    fn interlock(&self) -> bool {
        self.interlock_engaged()
    }

    fn set_collective(&mut self, collective: f64) {
        self.collective_demand = constrain(collective, 0.0, 1.0);
    }

    fn set_collective_filter_cutoff(&mut self, cutoff_hz: f64) {
        self.collective_lpf.set_cutoff(cutoff_hz);
    }

    fn set_desired_spool_state(&mut self, state: SpoolState) {
        if state != self.spool {
            trace!("Sim: spool state {:?} -> {:?}", self.spool, state);
        }
        self.spool = state;
    }
}

impl AttitudeControl for SimVehicle {
    fn set_target_lean_angles(&mut self, roll_deg: f64, pitch_deg: f64, yaw_rate_degs: f64) {
        let max = self.params.lean_angle_max_deg;

        self.roll_target_deg = constrain(roll_deg, -max, max);
        self.pitch_target_rad = constrain(pitch_deg, -max, max).to_radians();
        self.yaw_rate_target_degs = yaw_rate_degs;
    }

    fn lean_angle_max_deg(&self) -> f64 {
        self.params.lean_angle_max_deg
    }
}

impl PosControl for SimVehicle {
    fn is_active_z(&self) -> bool {
        self.z_active
    }

    fn relax_alt_hold(&mut self, collective: f64) {
        self.collective_demand = constrain(collective, 0.0, 1.0);
        self.collective_lpf.reset(self.collective_demand);
        self.z_rate_target_ms = self.vel_z_ms;
        self.z_active = true;
    }

    fn set_vertical_rate_target(&mut self, rate_ms: f64, _dt_s: f64) {
        let down = self.z_speed_down_ms.min(self.z_speed_up_ms);
        let up = self.z_speed_up_ms.max(self.z_speed_down_ms);

        self.z_rate_target_ms = constrain(rate_ms, down, up);
    }

    fn set_max_vertical_accel(&mut self, accel_mss: f64) {
        self.z_accel_max_mss = accel_mss.abs();
    }

    fn set_max_vertical_speed(&mut self, down_ms: f64, up_ms: f64) {
        self.z_speed_down_ms = down_ms;
        self.z_speed_up_ms = up_ms;
    }

    fn update_z(&mut self) {
        let accel_up = constrain(
            self.params.z_rate_p * (self.z_rate_target_ms - self.vel_z_ms),
            -self.z_accel_max_mss,
            self.z_accel_max_mss,
        );

        self.collective_demand = self.collective_for_accel(accel_up);
        self.z_updated = true;
    }
}

impl Ahrs for SimVehicle {
    fn groundspeed_vector(&self) -> Vector2<f64> {
        self.heading() * self.vel_fwd_ms
    }

    fn yaw_rad(&self) -> f64 {
        self.params.heading_deg.to_radians()
    }

    fn pitch_rad(&self) -> f64 {
        self.pitch_rad
    }

    fn accel_ef(&self) -> Vector3<f64> {
        let fwd = self.heading() * self.specific_force_fwd_mss;
        Vector3::new(fwd[0], fwd[1], -self.specific_force_up_mss)
    }

    fn altitude_m(&self) -> f64 {
        self.alt_m
    }

    fn climb_rate_ms(&self) -> f64 {
        self.vel_z_ms
    }
}

impl LandDetector for SimVehicle {
    fn land_complete(&self) -> bool {
        self.landed
    }
}

impl RpmSource for SimVehicle {
    fn rpm(&self, instance: usize) -> Option<f64> {
        match instance {
            0 if self.rpm_faulty() => Some(-1.0),
            0 => Some(self.head_speed_ratio * self.params.rpm_nominal),
            _ => None,
        }
    }
}

impl Pilot for SimVehicle {
    fn desired_lean_angles_deg(&self, _angle_max_deg: f64) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn desired_yaw_rate_degs(&self) -> f64 {
        0.0
    }

    fn desired_climb_rate_ms(&self) -> f64 {
        self.params.pilot_climb_rate_ms
    }

    fn speed_up_ms(&self) -> f64 {
        self.params.pilot_speed_up_ms
    }

    fn speed_down_ms(&self) -> f64 {
        self.params.pilot_speed_down_ms
    }
}

impl Telemetry for SimVehicle {
    fn write_record(&mut self, record: TelemetryRecord) {
        self.num_tm_records += 1;

        if let Some(ref mut tm) = self.telemetry {
            tm.write_record(record);
        }
    }
}
