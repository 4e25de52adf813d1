//! # Vehicle collaborator interfaces
//!
//! The autorotation controller owns no hardware. Every sensor it reads and every demand it makes
//! goes through the traits in this module, which the host flight stack implements. All calls are
//! expected to return immediately with the latest cached value.
//!
//! [`Vehicle`] bundles every collaborator trait so the controller can be generic over a single
//! type parameter. It is implemented automatically for any type implementing all of them.
//!
//! Conventions used across the traits:
//! - Vertical quantities are positive up (altitude, climb rate).
//! - Angles passed to the attitude controller are in degrees, pitch positive nose up.
//! - Earth frame vectors are North-East(-Down).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::arot_ctrl::TelemetryRecord;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Airframe type reported by the motor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    /// Traditional single main rotor helicopter, the only frame autorotation supports.
    TradHeli,
    MultiCopter,
}

/// Motor spool states which can be demanded of the motor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpoolState {
    ShutDown,
    GroundIdle,
    ThrottleUnlimited,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Motor output and mixing layer.
pub trait Motors {
    fn frame_type(&self) -> FrameType;

    /// True if the rotor interlock is engaged, i.e. power is being delivered to the rotor.
    fn interlock(&self) -> bool;

    /// Set the collective demand, in the range `[0, 1]`.
    fn set_collective(&mut self, collective: f64);

    /// Set the cut off frequency of the motor layer's own collective filter.
    fn set_collective_filter_cutoff(&mut self, cutoff_hz: f64);

    fn set_desired_spool_state(&mut self, state: SpoolState);
}

/// Attitude controller.
pub trait AttitudeControl {
    /// Set the roll and pitch angle targets and the yaw rate target.
    fn set_target_lean_angles(&mut self, roll_deg: f64, pitch_deg: f64, yaw_rate_degs: f64);

    /// Maximum lean angle the attitude controller permits.
    fn lean_angle_max_deg(&self) -> f64;
}

/// Vertical position controller.
pub trait PosControl {
    /// True if the vertical controller has been run recently.
    fn is_active_z(&self) -> bool;

    /// Reset the vertical controller to hold altitude using the given collective as its trim.
    fn relax_alt_hold(&mut self, collective: f64);

    fn set_vertical_rate_target(&mut self, rate_ms: f64, dt_s: f64);

    fn set_max_vertical_accel(&mut self, accel_mss: f64);

    /// Set the vertical speed limits. `down_ms` is negative for descent.
    fn set_max_vertical_speed(&mut self, down_ms: f64, up_ms: f64);

    /// Run one cycle of the vertical controller.
    fn update_z(&mut self);
}

/// Inertial navigation and attitude estimator.
pub trait Ahrs {
    /// Ground velocity, North-East.
    fn groundspeed_vector(&self) -> Vector2<f64>;

    fn yaw_rad(&self) -> f64;

    fn pitch_rad(&self) -> f64;

    /// Blended earth frame acceleration, North-East-Down, including gravity (a stationary vehicle
    /// reads `[0, 0, -g]`).
    fn accel_ef(&self) -> Vector3<f64>;

    fn altitude_m(&self) -> f64;

    fn climb_rate_ms(&self) -> f64;

    /// Unit vector pointing along the vehicle's heading, North-East.
    fn heading(&self) -> Vector2<f64> {
        let yaw = self.yaw_rad();
        Vector2::new(yaw.cos(), yaw.sin())
    }

    /// Ground speed projected onto the vehicle's heading.
    fn speed_forward_ms(&self) -> f64 {
        self.groundspeed_vector().dot(&self.heading())
    }

    /// Measured acceleration decomposed into the upwards and forwards directions.
    ///
    /// Returns `(up, forward)`.
    fn accel_up_fwd_mss(&self) -> (f64, f64) {
        let accel = self.accel_ef();
        let fwd = Vector2::new(accel[0], accel[1]).dot(&self.heading());

        (-accel[2], fwd)
    }
}

/// Land detector.
pub trait LandDetector {
    fn land_complete(&self) -> bool;
}

/// RPM sensor driver.
pub trait RpmSource {
    /// Get the latest reading of the given sensor instance.
    ///
    /// Returns `None` if the instance does not exist. A reading at or below `-1` means the sensor
    /// considers its own measurement unreliable.
    fn rpm(&self, instance: usize) -> Option<f64>;
}

/// Decoded pilot inputs.
pub trait Pilot {
    /// Desired roll and pitch angles, limited to `angle_max_deg`.
    fn desired_lean_angles_deg(&self, angle_max_deg: f64) -> (f64, f64);

    fn desired_yaw_rate_degs(&self) -> f64;

    /// Desired climb rate from the throttle stick.
    fn desired_climb_rate_ms(&self) -> f64;

    /// Maximum climb rate the pilot may demand.
    fn speed_up_ms(&self) -> f64;

    /// Maximum descent rate the pilot may demand, as a positive magnitude.
    fn speed_down_ms(&self) -> f64;
}

/// Telemetry logging sink.
///
/// Delivery is best effort. Implementations must not block and must swallow their own errors.
pub trait Telemetry {
    fn write_record(&mut self, record: TelemetryRecord);
}

/// Every collaborator the autorotation controller needs.
pub trait Vehicle:
    Motors + AttitudeControl + PosControl + Ahrs + LandDetector + RpmSource + Pilot + Telemetry
{
}

impl<T> Vehicle for T where
    T: Motors + AttitudeControl + PosControl + Ahrs + LandDetector + RpmSource + Pilot + Telemetry
{
}

// ---------------------------------------------------------------------------
// TEST DOUBLE
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod fake {
    //! Scriptable vehicle used by the unit tests.

    use super::*;
    use crate::arot_ctrl::GRAVITY_MSS;

    /// A vehicle whose sensors are plain fields and whose actuators record the last demand.
    #[derive(Debug, Clone)]
    pub struct FakeVehicle {
        // Motors
        pub frame: FrameType,
        pub interlock: bool,
        pub collective: Option<f64>,
        pub collective_cutoff_hz: Option<f64>,
        pub spool: Option<SpoolState>,

        // Attitude control
        pub lean_angle_max_deg: f64,
        pub lean_targets: Option<(f64, f64, f64)>,

        // Position control
        pub active_z: bool,
        pub relaxed_with: Option<f64>,
        pub rate_target_ms: Option<f64>,
        pub max_accel_z_mss: Option<f64>,
        pub max_speed_z_ms: Option<(f64, f64)>,
        pub z_updates: usize,

        // Estimator
        pub groundspeed: Vector2<f64>,
        pub yaw_rad: f64,
        pub pitch_rad: f64,
        pub accel_ef: Vector3<f64>,
        pub altitude_m: f64,
        pub climb_rate_ms: f64,
        pub landed: bool,

        // RPM sensors
        pub rpm: [Option<f64>; 2],

        // Pilot
        pub pilot_climb_rate_ms: f64,
        pub pilot_speed_up_ms: f64,
        pub pilot_speed_down_ms: f64,

        // Telemetry
        pub records: Vec<TelemetryRecord>,
    }

    impl Default for FakeVehicle {
        fn default() -> Self {
            Self {
                frame: FrameType::TradHeli,
                interlock: false,
                collective: None,
                collective_cutoff_hz: None,
                spool: None,
                lean_angle_max_deg: 30.0,
                lean_targets: None,
                active_z: false,
                relaxed_with: None,
                rate_target_ms: None,
                max_accel_z_mss: None,
                max_speed_z_ms: None,
                z_updates: 0,
                groundspeed: Vector2::new(11.0, 0.0),
                yaw_rad: 0.0,
                pitch_rad: 0.0,
                accel_ef: Vector3::new(0.0, 0.0, -GRAVITY_MSS),
                altitude_m: 100.0,
                climb_rate_ms: -5.0,
                landed: false,
                rpm: [Some(1500.0), None],
                pilot_climb_rate_ms: 0.0,
                pilot_speed_up_ms: 2.5,
                pilot_speed_down_ms: 1.5,
                records: Vec::new(),
            }
        }
    }

    impl Motors for FakeVehicle {
        fn frame_type(&self) -> FrameType {
            self.frame
        }
        fn interlock(&self) -> bool {
            self.interlock
        }
        fn set_collective(&mut self, collective: f64) {
            self.collective = Some(collective);
        }
        fn set_collective_filter_cutoff(&mut self, cutoff_hz: f64) {
            self.collective_cutoff_hz = Some(cutoff_hz);
        }
        fn set_desired_spool_state(&mut self, state: SpoolState) {
            self.spool = Some(state);
        }
    }

    impl AttitudeControl for FakeVehicle {
        fn set_target_lean_angles(&mut self, roll_deg: f64, pitch_deg: f64, yaw_rate_degs: f64) {
            self.lean_targets = Some((roll_deg, pitch_deg, yaw_rate_degs));
        }
        fn lean_angle_max_deg(&self) -> f64 {
            self.lean_angle_max_deg
        }
    }

    impl PosControl for FakeVehicle {
        fn is_active_z(&self) -> bool {
            self.active_z
        }
        fn relax_alt_hold(&mut self, collective: f64) {
            self.relaxed_with = Some(collective);
            self.active_z = true;
        }
        fn set_vertical_rate_target(&mut self, rate_ms: f64, _dt_s: f64) {
            self.rate_target_ms = Some(rate_ms);
        }
        fn set_max_vertical_accel(&mut self, accel_mss: f64) {
            self.max_accel_z_mss = Some(accel_mss);
        }
        fn set_max_vertical_speed(&mut self, down_ms: f64, up_ms: f64) {
            self.max_speed_z_ms = Some((down_ms, up_ms));
        }
        fn update_z(&mut self) {
            self.z_updates += 1;
        }
    }

    impl Ahrs for FakeVehicle {
        fn groundspeed_vector(&self) -> Vector2<f64> {
            self.groundspeed
        }
        fn yaw_rad(&self) -> f64 {
            self.yaw_rad
        }
        fn pitch_rad(&self) -> f64 {
            self.pitch_rad
        }
        fn accel_ef(&self) -> Vector3<f64> {
            self.accel_ef
        }
        fn altitude_m(&self) -> f64 {
            self.altitude_m
        }
        fn climb_rate_ms(&self) -> f64 {
            self.climb_rate_ms
        }
    }

    impl LandDetector for FakeVehicle {
        fn land_complete(&self) -> bool {
            self.landed
        }
    }

    impl RpmSource for FakeVehicle {
        fn rpm(&self, instance: usize) -> Option<f64> {
            self.rpm.get(instance).copied().flatten()
        }
    }

    impl Pilot for FakeVehicle {
        fn desired_lean_angles_deg(&self, _angle_max_deg: f64) -> (f64, f64) {
            (0.0, 0.0)
        }
        fn desired_yaw_rate_degs(&self) -> f64 {
            0.0
        }
        fn desired_climb_rate_ms(&self) -> f64 {
            self.pilot_climb_rate_ms
        }
        fn speed_up_ms(&self) -> f64 {
            self.pilot_speed_up_ms
        }
        fn speed_down_ms(&self) -> f64 {
            self.pilot_speed_down_ms
        }
    }

    impl Telemetry for FakeVehicle {
        fn write_record(&mut self, record: TelemetryRecord) {
            self.records.push(record);
        }
    }
}

#[cfg(test)]
mod test {
    use super::fake::FakeVehicle;
    use super::*;

    #[test]
    fn test_speed_forward_projects_onto_heading() {
        let mut v = FakeVehicle::default();
        v.groundspeed = Vector2::new(0.0, 8.0);
        v.yaw_rad = std::f64::consts::FRAC_PI_2;
        assert!((v.speed_forward_ms() - 8.0).abs() < 1e-9);

        // Flying sideways has no forward component
        v.yaw_rad = 0.0;
        assert!(v.speed_forward_ms().abs() < 1e-9);
    }

    #[test]
    fn test_accel_up_fwd() {
        let mut v = FakeVehicle::default();
        v.accel_ef = Vector3::new(-1.5, 0.0, -9.0);
        let (up, fwd) = v.accel_up_fwd_mss();
        assert!((up - 9.0).abs() < 1e-9);
        assert!((fwd + 1.5).abs() < 1e-9);
    }
}
