//! Flare trajectory generation and tracking
//!
//! The flare follows a half-cosine acceleration profile on each axis, so the
//! acceleration rises smoothly from zero to a peak half way through the flare
//! and falls back to zero at its end. The same profile is used by the
//! feasibility evaluator, so the tracker flies exactly the flare that was
//! predicted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use log::trace;
use serde::Serialize;

use super::{
    flare::pitch_from_accel_deg, scale_drag, ArotCtrl, Collective,
    FlareAccel, FlareAttitude, FlareTracking, TelemetryRecord, GRAVITY_MSS,
};
use crate::vehicle::{Ahrs, Motors, Telemetry};
use util::maths::constrain;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One axis of a half-cosine acceleration profile.
///
/// `a(t) = (a_peak / 2) * (1 - cos(2 pi t / T))`, with velocity and position
/// its closed form integrals.
#[derive(Debug, Clone, Copy)]
pub struct HalfCosineProfile {
    pub accel_peak: f64,
    pub vel_initial: f64,
    pub pos_initial: f64,
    pub period: f64,
}

/// Targets and terms of the latest flare tracking cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareTrackState {
    pub alt_target_m: f64,
    pub z_vel_target_ms: f64,
    pub fwd_vel_target_ms: f64,
    pub z_accel_target_mss: f64,
    pub fwd_accel_target_mss: f64,
    pub adjusted_z_accel_target_mss: f64,
    pub adjusted_fwd_accel_target_mss: f64,
    pub total_z_accel_target_mss: f64,
    pub total_fwd_accel_target_mss: f64,
    pub p_term_pitch: f64,
    pub ff_term_pitch: f64,
    pub p_term_col: f64,
    pub ff_term_col: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HalfCosineProfile {
    fn phase(&self, t: f64) -> f64 {
        2.0 * PI * t / self.period
    }

    pub fn accel(&self, t: f64) -> f64 {
        self.accel_peak / 2.0 * (1.0 - self.phase(t).cos())
    }

    pub fn vel(&self, t: f64) -> f64 {
        self.accel_peak / 2.0
            * (t - self.period / (2.0 * PI) * self.phase(t).sin())
            + self.vel_initial
    }

    pub fn pos(&self, t: f64) -> f64 {
        let t_sq = self.period * self.period;

        self.accel_peak / 4.0
            * (t * t + t_sq / (2.0 * PI * PI) * (self.phase(t).cos() - 1.0))
            + self.vel_initial * t
            + self.pos_initial
    }
}

impl ArotCtrl {
    /// Run one cycle of the flare tracker at the current flare time.
    ///
    /// Returns the pitch target.
    pub fn update_flare_controller<V>(&mut self, vehicle: &mut V) -> f64
    where
        V: Ahrs + Motors + Telemetry + ?Sized,
    {
        let t = self.flare_time_s;
        let period = self.flare_period_s;
        let init = self.flare.initial;
        let pred = self.flare.prediction;
        let mut track = FlareTrackState::default();

        let z_vel_measured = vehicle.climb_rate_ms();
        let fwd_vel_measured = vehicle.speed_forward_ms();
        let alt_measured = vehicle.altitude_m();

        let z_profile = HalfCosineProfile {
            accel_peak: pred.delta_accel_z_peak_mss,
            vel_initial: init.vel_z_ms,
            pos_initial: init.alt_m,
            period,
        };
        let fwd_profile = HalfCosineProfile {
            accel_peak: pred.delta_accel_fwd_peak_mss,
            vel_initial: init.vel_fwd_ms,
            pos_initial: 0.0,
            period,
        };

        // ---- VELOCITY TARGETS ----

        track.alt_target_m = z_profile.pos(t);
        track.z_vel_target_ms = z_profile.vel(t);
        track.fwd_vel_target_ms = fwd_profile.vel(t);

        self.flare.z_pos_correction_ms =
            (track.alt_target_m - alt_measured) / period * self.params.z_pos_p;

        track.z_vel_target_ms += self.flare.z_pos_correction_ms;

        // ---- ACCELERATION TARGETS ----

        track.z_accel_target_mss = z_profile.accel(t);
        track.fwd_accel_target_mss = fwd_profile.accel(t);

        track.adjusted_z_accel_target_mss = track.z_accel_target_mss
            + (track.z_vel_target_ms - z_vel_measured) / period
                * self.params.flare_z_vel_p;
        track.adjusted_fwd_accel_target_mss = track.fwd_accel_target_mss
            + (track.fwd_vel_target_ms - fwd_vel_measured) / period
                * self.params.flare_fwd_vel_p;

        track.total_z_accel_target_mss =
            track.adjusted_z_accel_target_mss + GRAVITY_MSS;

        let drag = scale_drag(init.drag_mss, fwd_vel_measured, init.vel_fwd_ms);
        track.total_fwd_accel_target_mss =
            track.adjusted_fwd_accel_target_mss - drag;

        // ---- ATTITUDE AND THRUST ----

        let accel_mag_target = track
            .total_z_accel_target_mss
            .hypot(track.total_fwd_accel_target_mss);
        let pitch_target_deg = pitch_from_accel_deg(
            track.total_fwd_accel_target_mss,
            accel_mag_target,
        );

        let (z_accel_measured, fwd_accel_measured) = vehicle.accel_up_fwd_mss();
        let accel_mag_measured = z_accel_measured.hypot(fwd_accel_measured);
        let pitch_measured_deg = vehicle.pitch_rad().to_degrees();

        let accel_mag_error = (accel_mag_target - accel_mag_measured) / GRAVITY_MSS;
        let pitch_error = pitch_target_deg - pitch_measured_deg;

        track.p_term_pitch = pitch_error * self.params.flare_pitch_p;
        track.p_term_col = accel_mag_error * self.params.flare_col_p;

        track.ff_term_col = self.col_trim_lpf.apply(self.collective_out, self.dt);
        track.ff_term_pitch = self
            .flare
            .pitch_trim_lpf
            .apply(self.flare.pitch_out_deg, self.dt);

        self.flare.pitch_out_deg = constrain(
            track.p_term_pitch + track.ff_term_pitch,
            -self.angle_max_deg,
            self.angle_max_deg,
        );
        self.pitch_target_deg = self.flare.pitch_out_deg;

        self.collective_out =
            constrain(track.p_term_col + track.ff_term_col, 0.0, 1.0);
        self.set_collective(vehicle);

        trace!(
            "Flare t={:.2}: alt target {:.2}, pitch {:.2}, collective {:.3}",
            t,
            track.alt_target_m,
            self.pitch_target_deg,
            self.collective_out
        );

        self.flare.tracking = track;

        // ---- TELEMETRY ----

        vehicle.write_record(TelemetryRecord::FlareAttitude(FlareAttitude {
            time_s: self.time_s,
            pitch_target_deg,
            pitch_measured_deg,
            accel_mag_target_mss: accel_mag_target,
            accel_mag_measured_mss: accel_mag_measured,
            drag_initial_mss: init.drag_mss,
            drag_mss: drag,
        }));
        vehicle.write_record(TelemetryRecord::FlareAccel(FlareAccel {
            time_s: self.time_s,
            adjusted_fwd_accel_target_mss: track.adjusted_fwd_accel_target_mss,
            total_fwd_accel_target_mss: track.total_fwd_accel_target_mss,
            adjusted_z_accel_target_mss: track.adjusted_z_accel_target_mss,
            total_z_accel_target_mss: track.total_z_accel_target_mss,
        }));
        vehicle.write_record(TelemetryRecord::FlareTracking(FlareTracking {
            time_s: self.time_s,
            alt_target_m: track.alt_target_m,
            alt_measured_m: alt_measured,
            z_pos_correction_ms: self.flare.z_pos_correction_ms,
            z_vel_target_ms: track.z_vel_target_ms,
            fwd_vel_target_ms: track.fwd_vel_target_ms,
            z_vel_measured_ms: z_vel_measured,
        }));
        vehicle.write_record(TelemetryRecord::Collective(Collective {
            time_s: self.time_s,
            collective_out: self.collective_out,
            p_term: track.p_term_col,
            ff_term: track.ff_term_col,
        }));

        self.pitch_target_deg
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
