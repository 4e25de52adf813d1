//! Telemetry records produced by ArotCtrl
//!
//! Records are handed to the vehicle's [`Telemetry`](crate::vehicle::Telemetry)
//! sink. Each record carries the controller time at which it was produced.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Log bitmask bit enabling [`GlideTuning`] records.
pub const LOG_BIT_GLIDE: u8 = 1 << 0;

/// Log bitmask bit enabling [`FlareTuning`] records.
pub const LOG_BIT_FLARE: u8 = 1 << 1;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A single telemetry record.
#[derive(Debug, Clone, Serialize)]
pub enum TelemetryRecord {
    GlideTuning(GlideTuning),
    FlareTuning(FlareTuning),
    Trajectory(Trajectory),
    FlareCheck(FlareCheck),
    FlareAttitude(FlareAttitude),
    FlareAccel(FlareAccel),
    FlareTracking(FlareTracking),
    Collective(Collective),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Head speed and forward speed controller tuning.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GlideTuning {
    pub time_s: f64,
    pub p_term_hs: f64,
    pub head_speed_error: f64,
    pub collective_out: f64,
    pub ff_term_hs: f64,
    pub current_rpm: f64,
    pub speed_fwd_ms: f64,
    pub cmd_vel_ms: f64,
    pub vel_p: f64,
    pub vel_ff: f64,
    pub accel_out_mss: f64,
    pub accel_target_mss: f64,
    pub pitch_target_deg: f64,
}

/// Flare controller tuning.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareTuning {
    pub time_s: f64,
    pub z_accel_target_mss: f64,
    pub adjusted_z_accel_target_mss: f64,
    pub z_vel_target_ms: f64,
    pub alt_target_m: f64,
    pub fwd_accel_target_mss: f64,
    pub adjusted_fwd_accel_target_mss: f64,
    pub p_term_pitch: f64,
    pub pitch_out_deg: f64,
    pub resultant_accel_peak_mss: f64,
    pub flare_pitch_ang_max_deg: f64,
}

/// Measured trajectory.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Trajectory {
    pub time_s: f64,
    pub speed_fwd_ms: f64,
    pub z_accel_measured_mss: f64,
    pub fwd_accel_measured_mss: f64,
}

/// Outcome of a flare feasibility evaluation which passed the acceleration
/// and pitch checks.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareCheck {
    pub time_s: f64,
    pub vel_z_ms: f64,
    pub td_vel_z_ms: f64,
    pub resultant_accel_peak_mss: f64,
    pub min_accel_mss: f64,
    pub max_accel_mss: f64,
    pub td_alt_predicted_m: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareAttitude {
    pub time_s: f64,
    pub pitch_target_deg: f64,
    pub pitch_measured_deg: f64,
    pub accel_mag_target_mss: f64,
    pub accel_mag_measured_mss: f64,
    pub drag_initial_mss: f64,
    pub drag_mss: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareAccel {
    pub time_s: f64,
    pub adjusted_fwd_accel_target_mss: f64,
    pub total_fwd_accel_target_mss: f64,
    pub adjusted_z_accel_target_mss: f64,
    pub total_z_accel_target_mss: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareTracking {
    pub time_s: f64,
    pub alt_target_m: f64,
    pub alt_measured_m: f64,
    pub z_pos_correction_ms: f64,
    pub z_vel_target_ms: f64,
    pub fwd_vel_target_ms: f64,
    pub z_vel_measured_ms: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Collective {
    pub time_s: f64,
    pub collective_out: f64,
    pub p_term: f64,
    pub ff_term: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TelemetryRecord {
    /// Short name of the record kind, used to name its archive.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryRecord::GlideTuning(_) => "glide_tuning",
            TelemetryRecord::FlareTuning(_) => "flare_tuning",
            TelemetryRecord::Trajectory(_) => "trajectory",
            TelemetryRecord::FlareCheck(_) => "flare_check",
            TelemetryRecord::FlareAttitude(_) => "flare_attitude",
            TelemetryRecord::FlareAccel(_) => "flare_accel",
            TelemetryRecord::FlareTracking(_) => "flare_tracking",
            TelemetryRecord::Collective(_) => "collective",
        }
    }

    pub fn time_s(&self) -> f64 {
        match self {
            TelemetryRecord::GlideTuning(r) => r.time_s,
            TelemetryRecord::FlareTuning(r) => r.time_s,
            TelemetryRecord::Trajectory(r) => r.time_s,
            TelemetryRecord::FlareCheck(r) => r.time_s,
            TelemetryRecord::FlareAttitude(r) => r.time_s,
            TelemetryRecord::FlareAccel(r) => r.time_s,
            TelemetryRecord::FlareTracking(r) => r.time_s,
            TelemetryRecord::Collective(r) => r.time_s,
        }
    }
}
