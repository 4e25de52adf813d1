//! # Rotorcraft simulation
//!
//! [`SimVehicle`] is a point mass model of a single rotor helicopter flying in the vertical plane
//! along its heading. It stands in for the host flight stack, implementing every vehicle
//! interface, so that the autorotation mode can be flown end to end on the ground.
//!
//! The model is deliberately simple:
//!
//! - Rotor thrust is `g * thrust_coeff * collective * ratio^2`, acting along the rotor axis which
//!   is tilted with the body pitch.
//! - Unpowered, the rotor is driven by the inflow from the descent and slowed by the blade drag,
//!   which grows with collective. Powered, with the interlock engaged and the motors spooled up,
//!   the governor holds nominal head speed.
//! - Pitch follows the attitude target with a first order lag.
//! - The vertical position controller is emulated with a rate loop limited to the demanded
//!   acceleration.
//! - The vehicle lands when it reaches zero altitude, after which it stays on the ground unless
//!   thrust exceeds its weight.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod interfaces;
mod params;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use serde::Serialize;
use util::{
    archive::{Archived, Archiver},
    maths::constrain,
    session::Session,
};

use crate::{
    arot_ctrl::{LowPassFilter, GRAVITY_MSS},
    tm_archive::ArchiveTelemetry,
    vehicle::SpoolState,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cut off of the motor layer's collective filter until the controller sets its own.
///
/// Units: hertz
const DEFAULT_COLLECTIVE_CUTOFF_HZ: f64 = 2.0;

/// Tolerance on event time comparisons.
///
/// Units: seconds
const TIME_TOLERANCE_S: f64 = 1e-9;

/// Smallest thrust per unit collective used when inverting the thrust model.
const MIN_THRUST_PER_COLLECTIVE: f64 = 1e-3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulated helicopter.
pub struct SimVehicle {
    params: SimParams,

    time_s: f64,

    // ---- TRUTH STATE ----
    alt_m: f64,

    /// Positive up.
    vel_z_ms: f64,
    vel_fwd_ms: f64,
    pitch_rad: f64,
    head_speed_ratio: f64,
    landed: bool,

    /// Non gravitational acceleration along the heading and upwards, as an accelerometer would
    /// measure it.
    specific_force_fwd_mss: f64,
    specific_force_up_mss: f64,

    // ---- MOTORS ----
    collective_demand: f64,
    collective_lpf: LowPassFilter,
    spool: SpoolState,

    // ---- ATTITUDE CONTROL ----
    pitch_target_rad: f64,
    roll_target_deg: f64,
    yaw_rate_target_degs: f64,

    // ---- POSITION CONTROL ----
    z_active: bool,
    z_updated: bool,
    z_rate_target_ms: f64,
    z_accel_max_mss: f64,
    z_speed_down_ms: f64,
    z_speed_up_ms: f64,

    // ---- OUTPUTS ----
    touch_down: Option<TouchDownReport>,
    telemetry: Option<ArchiveTelemetry>,
    num_tm_records: u64,
    state_arch: Archiver,
}

/// Conditions at the moment the vehicle reached the ground.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TouchDownReport {
    pub time_s: f64,
    pub vel_z_ms: f64,
    pub vel_fwd_ms: f64,
    pub pitch_deg: f64,
    pub head_speed_ratio: f64,
}

/// Summary of a simulated flight.
#[derive(Debug, Clone, Serialize)]
pub struct SimSummary {
    pub duration_s: f64,
    pub final_alt_m: f64,
    pub final_head_speed_ratio: f64,
    pub landed: bool,
    pub touch_down: Option<TouchDownReport>,
    pub num_tm_records: u64,
}

/// One archived sample of the simulation's truth state.
#[derive(Debug, Clone, Copy, Serialize)]
struct SimState {
    time_s: f64,
    alt_m: f64,
    vel_z_ms: f64,
    vel_fwd_ms: f64,
    pitch_deg: f64,
    pitch_target_deg: f64,
    roll_target_deg: f64,
    yaw_rate_target_degs: f64,
    head_speed_ratio: f64,
    collective: f64,
    interlock: bool,
    landed: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimVehicle {
    /// Create a new vehicle at the initial conditions in `params`, with the collective held at
    /// its initial value and the attitude level.
    pub fn new(params: SimParams) -> Self {
        let mut collective_lpf = LowPassFilter::new(DEFAULT_COLLECTIVE_CUTOFF_HZ);
        collective_lpf.reset(params.initial_collective);

        let landed = params.initial_alt_m <= 0.0;

        let mut sim = Self {
            time_s: 0.0,
            alt_m: params.initial_alt_m.max(0.0),
            vel_z_ms: if landed { 0.0 } else { params.initial_vel_z_ms },
            vel_fwd_ms: if landed { 0.0 } else { params.initial_vel_fwd_ms },
            pitch_rad: 0.0,
            head_speed_ratio: params.initial_head_speed_ratio,
            landed,
            specific_force_fwd_mss: 0.0,
            specific_force_up_mss: GRAVITY_MSS,
            collective_demand: params.initial_collective,
            collective_lpf,
            spool: SpoolState::GroundIdle,
            pitch_target_rad: 0.0,
            roll_target_deg: 0.0,
            yaw_rate_target_degs: 0.0,
            z_active: false,
            z_updated: false,
            z_rate_target_ms: 0.0,
            z_accel_max_mss: 0.0,
            z_speed_down_ms: -params.pilot_speed_down_ms.abs(),
            z_speed_up_ms: params.pilot_speed_up_ms,
            touch_down: None,
            telemetry: None,
            num_tm_records: 0,
            state_arch: Archiver::default(),
            params,
        };

        let (fwd, up) = sim.specific_force();
        sim.specific_force_fwd_mss = fwd;
        sim.specific_force_up_mss = if landed { GRAVITY_MSS } else { up };

        sim
    }

    /// Send telemetry records to the given sink as well as counting them.
    pub fn set_telemetry(&mut self, telemetry: ArchiveTelemetry) {
        self.telemetry = Some(telemetry);
    }

    /// Archive the truth state into the session every time [`Archived::write`] is called.
    pub fn enable_archive(&mut self, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
        self.state_arch = Archiver::from_path(session, "sim/state.csv")?;
        Ok(())
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let p = &self.params;
        self.time_s += dt;

        // Attitude response
        let pitch_gain = if p.pitch_time_const_s > 0.0 {
            (dt / p.pitch_time_const_s).min(1.0)
        } else {
            1.0
        };
        self.pitch_rad += (self.pitch_target_rad - self.pitch_rad) * pitch_gain;

        // Motor layer collective filtering
        self.collective_lpf.apply(self.collective_demand, dt);

        let (mut force_fwd, mut force_up) = self.specific_force();
        let mut accel_up = force_up - GRAVITY_MSS;

        // Rotor dynamics
        let collective = self.collective_lpf.output();
        let ratio = self.head_speed_ratio;
        let powered = self.interlock_engaged() && self.spool == SpoolState::ThrottleUnlimited;
        let ratio_dot = if powered {
            p.governor_gain * (1.0 - ratio)
        } else {
            p.inflow_gain * (-self.vel_z_ms) * ratio - p.rotor_drag_gain * collective * ratio * ratio
        };
        self.head_speed_ratio = (ratio + ratio_dot * dt).max(0.0);

        // Ground reaction
        if self.landed {
            if accel_up > 0.0 {
                info!("Sim: lift off at {:.2} s", self.time_s);
                self.landed = false;
            } else {
                accel_up = 0.0;
                force_up = GRAVITY_MSS;
                force_fwd = 0.0;
                self.vel_fwd_ms = 0.0;
            }
        }

        self.vel_z_ms += accel_up * dt;
        self.alt_m += self.vel_z_ms * dt;
        self.vel_fwd_ms += force_fwd * dt;

        if !self.landed && self.alt_m <= 0.0 {
            let report = TouchDownReport {
                time_s: self.time_s,
                vel_z_ms: self.vel_z_ms,
                vel_fwd_ms: self.vel_fwd_ms,
                pitch_deg: self.pitch_rad.to_degrees(),
                head_speed_ratio: self.head_speed_ratio,
            };
            info!(
                "Sim: touch down at {:.2} s, {:.2} m/s vertical, {:.2} m/s forward",
                report.time_s, report.vel_z_ms, report.vel_fwd_ms
            );

            self.touch_down = Some(report);
            self.landed = true;
            self.alt_m = 0.0;
            self.vel_z_ms = 0.0;
            self.vel_fwd_ms = 0.0;
            force_fwd = 0.0;
            force_up = GRAVITY_MSS;
        }

        self.specific_force_fwd_mss = force_fwd;
        self.specific_force_up_mss = force_up;

        // The vertical controller is only active while it's being run
        self.z_active = self.z_updated;
        self.z_updated = false;
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn head_speed_ratio(&self) -> f64 {
        self.head_speed_ratio
    }

    /// Conditions at touch down, if the vehicle has landed.
    pub fn touch_down(&self) -> Option<&TouchDownReport> {
        self.touch_down.as_ref()
    }

    pub fn summary(&self) -> SimSummary {
        SimSummary {
            duration_s: self.time_s,
            final_alt_m: self.alt_m,
            final_head_speed_ratio: self.head_speed_ratio,
            landed: self.landed,
            touch_down: self.touch_down,
            num_tm_records: self.num_tm_records,
        }
    }

    /// True once the pilot has re-engaged the interlock.
    fn interlock_engaged(&self) -> bool {
        match self.params.interlock_at_s {
            Some(t) => self.time_s >= t - TIME_TOLERANCE_S,
            None => false,
        }
    }

    /// True while the RPM sensor is reporting an unreliable reading.
    fn rpm_faulty(&self) -> bool {
        match self.params.rpm_fault_window_s {
            Some([start, end]) => {
                self.time_s >= start - TIME_TOLERANCE_S && self.time_s < end - TIME_TOLERANCE_S
            }
            None => false,
        }
    }

    /// Rotor thrust per unit collective at the current head speed.
    fn thrust_per_collective(&self) -> f64 {
        GRAVITY_MSS * self.params.thrust_coeff * self.head_speed_ratio * self.head_speed_ratio
    }

    /// Specific force from the rotor and fuselage drag, `(forward, up)`.
    fn specific_force(&self) -> (f64, f64) {
        let thrust = self.thrust_per_collective() * self.collective_lpf.output();
        let drag = self.params.fwd_drag_coeff * self.vel_fwd_ms * self.vel_fwd_ms.abs();

        (
            -thrust * self.pitch_rad.sin() - drag,
            thrust * self.pitch_rad.cos(),
        )
    }

    /// Collective which produces the given upwards acceleration at the current head speed and
    /// attitude.
    fn collective_for_accel(&self, accel_up_mss: f64) -> f64 {
        let per_collective =
            (self.thrust_per_collective() * self.pitch_rad.cos()).max(MIN_THRUST_PER_COLLECTIVE);

        constrain((GRAVITY_MSS + accel_up_mss) / per_collective, 0.0, 1.0)
    }
}

impl Archived for SimVehicle {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let state = SimState {
            time_s: self.time_s,
            alt_m: self.alt_m,
            vel_z_ms: self.vel_z_ms,
            vel_fwd_ms: self.vel_fwd_ms,
            pitch_deg: self.pitch_rad.to_degrees(),
            pitch_target_deg: self.pitch_target_rad.to_degrees(),
            roll_target_deg: self.roll_target_deg,
            yaw_rate_target_degs: self.yaw_rate_target_degs,
            head_speed_ratio: self.head_speed_ratio,
            collective: self.collective_lpf.output(),
            interlock: self.interlock_engaged(),
            landed: self.landed,
        };

        self.state_arch.serialise(state)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
