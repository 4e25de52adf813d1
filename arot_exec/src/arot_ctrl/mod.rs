//! # Autorotation control module
//!
//! ArotCtrl holds the regulators which fly the vehicle through an
//! autorotation:
//!
//! - The head speed regulator, which holds main rotor speed with collective.
//! - The forward speed regulator, which converts a glide speed target into a
//!   pitch angle.
//! - The flare feasibility evaluator, which predicts whether a flare started
//!   now would meet the touch down constraints.
//! - The flare trajectory generator and tracker, which flies a half-cosine
//!   deceleration profile with collective and pitch.
//!
//! ArotCtrl does not decide which regulator runs. That is the job of the
//! phase state machine in [`crate::arot_mode`], which calls [`ArotCtrl::set_dt`]
//! and [`ArotCtrl::set_time`] once per cycle and then runs the regulators the
//! current phase needs.
//!
//! All quantities are SI, angles are in degrees and vertical quantities are
//! positive up.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filter;
mod flare;
mod fwd_speed;
mod head_speed;
mod params;
mod rpm_health;
mod tm;
mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
pub use filter::*;
pub use flare::*;
pub use fwd_speed::*;
pub use head_speed::*;
pub use params::*;
pub use rpm_health::*;
pub use tm::*;
pub use trajectory::*;

use crate::vehicle::{Ahrs, AttitudeControl, Telemetry};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Acceleration due to gravity.
///
/// Units: meters/second^2
pub const GRAVITY_MSS: f64 = 9.80665;

/// Cut off of the motor layer's collective filter.
///
/// Units: Hz
pub const COLLECTIVE_CUTOFF_HZ: f64 = 2.0;

/// Lowest peak acceleration a flare may use, as a multiple of gravity.
pub const FLARE_MIN_ACCEL_PEAK_G: f64 = 1.05;

/// Lower limit on the flare period.
///
/// Units: seconds
pub const FLARE_TIME_PERIOD_MIN_S: f64 = 0.5;

/// Lower limit on the pitch angle limit.
///
/// Units: degrees
pub const ANGLE_MAX_MIN_DEG: f64 = 15.0;

/// Upper limit on the forward acceleration limit.
///
/// Units: meters/second^2
pub const FWD_ACCEL_MAX_LIMIT_MSS: f64 = 0.6;

/// Lower limit on the head speed set point.
///
/// Units: RPM
pub const HS_SET_POINT_MIN_RPM: f64 = 500.0;

/// Below this forward speed drag estimates are not scaled by speed and are
/// taken as zero.
///
/// Units: meters/second
pub const DRAG_MIN_FWD_SPEED_MS: f64 = 1.0;

/// Collective demanded when the RPM sensor is bad.
pub const BAD_RPM_COLLECTIVE: f64 = 0.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Autorotation controller.
#[derive(Debug, Clone)]
pub struct ArotCtrl {
    pub(crate) params: Params,

    // ---- SANITISED LIMITS ----
    pub(crate) hs_set_point_rpm: f64,
    pub(crate) flare_period_s: f64,
    pub(crate) angle_max_deg: f64,
    pub(crate) accel_max_mss: f64,

    // ---- TIMING ----
    pub(crate) dt: f64,
    pub(crate) time_s: f64,
    pub(crate) flare_time_s: f64,

    // ---- SHARED OUTPUTS ----
    /// Collective demand, shared by the head speed and flare regulators.
    pub(crate) collective_out: f64,

    /// Pitch target, shared by the forward speed and flare regulators.
    pub(crate) pitch_target_deg: f64,

    /// Following trim on collective.
    pub(crate) col_trim_lpf: LowPassFilter,

    // ---- REGULATORS ----
    pub(crate) rpm_health: RpmHealth,
    pub(crate) hs: HeadSpeedState,
    pub(crate) fwd: FwdSpeedState,
    pub(crate) flare: FlareState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArotCtrl {
    pub fn new(params: Params) -> Self {
        Self {
            hs_set_point_rpm: params.hs_set_point_rpm.max(HS_SET_POINT_MIN_RPM),
            flare_period_s: params
                .flare_time_period_s
                .max(FLARE_TIME_PERIOD_MIN_S),
            angle_max_deg: params.angle_max_deg.max(ANGLE_MAX_MIN_DEG),
            accel_max_mss: params.fwd_accel_max_mss.min(FWD_ACCEL_MAX_LIMIT_MSS),
            dt: 0.0,
            time_s: 0.0,
            flare_time_s: 0.0,
            collective_out: 0.0,
            pitch_target_deg: 0.0,
            col_trim_lpf: LowPassFilter::new(params.col_entry_cutoff_hz),
            rpm_health: RpmHealth::default(),
            hs: HeadSpeedState::new(params.rpm_instance),
            fwd: FwdSpeedState::default(),
            flare: FlareState::new(&params),
            params,
        }
    }

    /// Reset the controller for a new autorotation and sanitise the limits.
    ///
    /// A zero pitch angle parameter takes the attitude controller's lean
    /// angle limit. The result is never below 15 degrees.
    pub fn init<A: AttitudeControl + ?Sized>(&mut self, attitude: &A) {
        let fresh = Self::new(self.params.clone());
        *self = fresh;

        let angle_max_deg = if self.params.angle_max_deg == 0.0 {
            attitude.lean_angle_max_deg()
        } else {
            self.params.angle_max_deg
        };
        self.angle_max_deg = angle_max_deg.max(ANGLE_MAX_MIN_DEG);

        debug!(
            "ArotCtrl limits: set point {} RPM, flare period {} s, angle max \
             {} deg, accel max {} m/s/s",
            self.hs_set_point_rpm,
            self.flare_period_s,
            self.angle_max_deg,
            self.accel_max_mss
        );
    }

    // ---- TIMING ----

    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
    }

    /// Set the controller time stamped onto telemetry.
    pub fn set_time(&mut self, time_s: f64) {
        self.time_s = time_s;
    }

    /// Set the time elapsed since the start of the flare.
    pub fn set_flare_time(&mut self, flare_time_s: f64) {
        self.flare_time_s = flare_time_s;
    }

    // ---- ACCESSORS ----

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_enabled(&self) -> bool {
        self.params.enable
    }

    pub fn hs_set_point_rpm(&self) -> f64 {
        self.hs_set_point_rpm
    }

    pub fn flare_time_period_s(&self) -> f64 {
        self.flare_period_s
    }

    pub fn angle_max_deg(&self) -> f64 {
        self.angle_max_deg
    }

    pub fn td_alt_targ_m(&self) -> f64 {
        self.params.td_alt_targ_m
    }

    pub fn td_vel_targ_ms(&self) -> f64 {
        self.params.td_vel_z_ms
    }

    pub fn bail_time_s(&self) -> f64 {
        self.params.bail_time_s
    }

    /// The most recent collective demand.
    pub fn last_collective(&self) -> f64 {
        self.collective_out
    }

    /// The most recent pitch target.
    pub fn pitch_target_deg(&self) -> f64 {
        self.pitch_target_deg
    }

    pub fn rpm_health(&self) -> &RpmHealth {
        &self.rpm_health
    }

    // ---- TELEMETRY ----

    /// Write the per cycle telemetry records.
    ///
    /// Tuning records are only written when enabled in the log bitmask.
    pub fn write_log<V>(&self, vehicle: &mut V)
    where
        V: Ahrs + Telemetry + ?Sized,
    {
        let speed_fwd_ms = vehicle.speed_forward_ms();

        if self.params.log_bitmask & LOG_BIT_GLIDE != 0 {
            vehicle.write_record(TelemetryRecord::GlideTuning(GlideTuning {
                time_s: self.time_s,
                p_term_hs: self.hs.p_term,
                head_speed_error: self.hs.error,
                collective_out: self.collective_out,
                ff_term_hs: self.hs.ff_term,
                current_rpm: self.hs.current_rpm,
                speed_fwd_ms,
                cmd_vel_ms: self.fwd.cmd_vel_ms,
                vel_p: self.fwd.vel_p,
                vel_ff: self.fwd.vel_ff,
                accel_out_mss: self.fwd.accel_out_mss,
                accel_target_mss: self.fwd.accel_target_mss,
                pitch_target_deg: self.pitch_target_deg,
            }));
        }

        if self.params.log_bitmask & LOG_BIT_FLARE != 0 {
            let t = &self.flare.tracking;
            vehicle.write_record(TelemetryRecord::FlareTuning(FlareTuning {
                time_s: self.time_s,
                z_accel_target_mss: t.z_accel_target_mss,
                adjusted_z_accel_target_mss: t.adjusted_z_accel_target_mss,
                z_vel_target_ms: t.z_vel_target_ms,
                alt_target_m: t.alt_target_m,
                fwd_accel_target_mss: t.fwd_accel_target_mss,
                adjusted_fwd_accel_target_mss: t.adjusted_fwd_accel_target_mss,
                p_term_pitch: t.p_term_pitch,
                pitch_out_deg: self.flare.pitch_out_deg,
                resultant_accel_peak_mss: self
                    .flare
                    .prediction
                    .resultant_accel_peak_mss,
                flare_pitch_ang_max_deg: self.flare.prediction.pitch_max_deg,
            }));
        }

        let (z_accel, fwd_accel) = vehicle.accel_up_fwd_mss();
        vehicle.write_record(TelemetryRecord::Trajectory(Trajectory {
            time_s: self.time_s,
            speed_fwd_ms,
            z_accel_measured_mss: z_accel,
            fwd_accel_measured_mss: fwd_accel,
        }));
    }
}

/// Estimate drag from measured acceleration and pitch.
///
/// The vertical acceleration tilted by pitch gives the rotor's forward thrust
/// component; what remains of the measured forward acceleration is drag.
pub(crate) fn estimate_drag_mss<A: Ahrs + ?Sized>(ahrs: &A) -> f64 {
    let (z_accel, fwd_accel) = ahrs.accel_up_fwd_mss();
    z_accel * ahrs.pitch_rad().tan() + fwd_accel
}

/// Scale a drag estimate taken at `vel_ref_ms` to `vel_ms`, assuming drag
/// grows with the square of speed.
pub(crate) fn scale_drag(drag_mss: f64, vel_ms: f64, vel_ref_ms: f64) -> f64 {
    if vel_ref_ms.abs() < DRAG_MIN_FWD_SPEED_MS {
        return 0.0;
    }

    drag_mss * (vel_ms * vel_ms) / (vel_ref_ms * vel_ref_ms)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::fake::FakeVehicle;

    #[test]
    fn test_init_sanitises_limits() {
        let mut params = Params::default();
        params.hs_set_point_rpm = 100.0;
        params.flare_time_period_s = 0.1;
        params.fwd_accel_max_mss = 3.0;

        let mut ctrl = ArotCtrl::new(params);
        let mut vehicle = FakeVehicle::default();
        vehicle.lean_angle_max_deg = 10.0;
        ctrl.init(&vehicle);

        assert_eq!(ctrl.hs_set_point_rpm(), HS_SET_POINT_MIN_RPM);
        assert_eq!(ctrl.flare_time_period_s(), FLARE_TIME_PERIOD_MIN_S);
        assert_eq!(ctrl.accel_max_mss, FWD_ACCEL_MAX_LIMIT_MSS);
        assert_eq!(ctrl.angle_max_deg(), ANGLE_MAX_MIN_DEG);

        vehicle.lean_angle_max_deg = 30.0;
        ctrl.init(&vehicle);
        assert_eq!(ctrl.angle_max_deg(), 30.0);
    }

    #[test]
    fn test_explicit_angle_max_overrides_attitude_limit() {
        let mut params = Params::default();
        params.angle_max_deg = 25.0;

        let mut ctrl = ArotCtrl::new(params);
        ctrl.init(&FakeVehicle::default());

        assert_eq!(ctrl.angle_max_deg(), 25.0);
    }

    #[test]
    fn test_log_bitmask() {
        let mut vehicle = FakeVehicle::default();

        let ctrl = ArotCtrl::new(Params::default());
        ctrl.write_log(&mut vehicle);
        assert_eq!(vehicle.records.len(), 1);
        assert_eq!(vehicle.records[0].name(), "trajectory");

        vehicle.records.clear();
        let mut params = Params::default();
        params.log_bitmask = LOG_BIT_GLIDE | LOG_BIT_FLARE;
        let ctrl = ArotCtrl::new(params);
        ctrl.write_log(&mut vehicle);
        let names: Vec<_> = vehicle.records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["glide_tuning", "flare_tuning", "trajectory"]);
    }

    #[test]
    fn test_drag_scaling() {
        assert_eq!(scale_drag(-1.0, 5.0, 10.0), -0.25);
        assert_eq!(scale_drag(-1.0, 5.0, 0.5), 0.0);
    }
}
