//! # Autorotation mode
//!
//! This module implements the [`ArotMode`] state machine, which sequences the regulators in
//! [`ArotCtrl`] through an autorotation. The mode is broken down into phases:
//!
//! - `Entry` - Head speed is brought from its value at power loss down to the nominal speed while
//!   the forward speed regulator establishes the glide.
//! - `SteadyGlide` - Head speed and glide speed are held at their nominal values.
//! - `Flare` - The flare trajectory is flown with collective and pitch.
//! - `TouchDown` - The altitude controller holds a gentle descent rate with the vehicle level.
//! - `BailOut` - Power has been restored mid-air, climb rate and pitch are ramped back to the
//!   pilot's demands before the mode hands back control.
//!
//! Phase changes are decided at the start of each cycle by a priority ordered list of transition
//! rules. The first rule which fires decides the transition:
//!
//! 1. Interlock engaged while airborne: bail out.
//! 2. Interlock engaged while landed: exit the mode.
//! 3. At or below the touch down altitude: touch down.
//! 4. Flare period elapsed: touch down.
//! 5. Flare feasible: flare.
//! 6. Entry period elapsed: steady glide.
//!
//! A transition to the current phase does nothing.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod bail_out;
mod entry;
mod flare;
mod glide;
mod touch_down;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::bail_out::BailOut;
    pub use super::entry::Entry;
    pub use super::flare::Flare;
    pub use super::glide::SteadyGlide;
    pub use super::touch_down::TouchDown;
}

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use log::{info, warn};
use serde::Serialize;
use states::*;
use util::{module::State, session::Session};

use crate::{
    arot_ctrl::{self, ArotCtrl, RpmHealth},
    vehicle::{FrameType, Vehicle},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Duration of the entry phase.
///
/// Units: seconds
pub const ENTRY_TIME_S: f64 = 2.0;

/// Time the motors take to spool up during a bail out, during which demands are held.
///
/// Units: seconds
pub const BAIL_OUT_MOTOR_RAMP_TIME_S: f64 = 1.0;

/// Shortest bail out time beyond the motor ramp time.
///
/// Units: seconds
pub const BAIL_OUT_MIN_MARGIN_S: f64 = 0.1;

/// Nominal normalised head speed.
pub const HEAD_SPEED_TARGET_RATIO: f64 = 1.0;

/// Tolerance on timer comparisons, so that fixed steps sum onto phase boundaries.
///
/// Units: seconds
pub const TIMER_TOLERANCE_S: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Autorotation mode.
pub struct ArotMode<V: Vehicle> {
    /// Data valid over all phases.
    pub persistant: ArotModePersistantData<V>,

    /// The current phase, or `None` if the mode isn't active.
    phase: Option<ArotPhase>,
}

/// Data shared by all phases of the mode.
pub struct ArotModePersistantData<V: Vehicle> {
    pub ctrl: ArotCtrl,

    pub vehicle: V,

    /// Time since the mode was activated.
    pub clock_s: f64,

    /// Length of the current cycle.
    pub dt: f64,

    /// Normalised head speed measured at activation.
    pub initial_ratio: f64,

    /// Pitch target passed to the attitude controller at the end of the cycle.
    pub pitch_target_deg: f64,

    /// Set by the head speed regulator when the RPM sensor is bad.
    pub bad_rpm: bool,

    advisories_sent: AdvisoriesSent,
}

/// Output of one cycle of the mode.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArotOutput {
    pub time_s: f64,
    pub phase: PhaseKind,
    pub collective: f64,
    pub pitch_target_deg: f64,
    pub bad_rpm: bool,
    pub outcome: ModeOutcome,
}

/// Status report of one cycle of the mode.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub rpm_health: RpmHealth,
    pub head_speed_ratio: f64,
    pub target_head_speed: f64,
    pub flare_started: bool,
}

/// Input to one cycle of the mode when driven through [`State`].
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub dt: f64,
}

/// Which one shot advisories have already been issued during this activation.
#[derive(Debug, Default, Clone, Copy)]
struct AdvisoriesSent {
    poor_rpm_sensor: bool,
    touch_down_altitude: bool,
    touch_down_timer: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the autorotation mode.
#[derive(Debug, thiserror::Error)]
pub enum ArotModeError {
    #[error("Failed to load autorotation parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Autorotation is only supported on traditional helicopters, not {0:?}")]
    WrongFrame(FrameType),

    #[error("Autorotation mode not enabled")]
    NotEnabled,

    #[error("Autorotation mode change failed: interlock engaged")]
    InterlockEngaged,

    #[error("Autorotation mode is not active")]
    NotActive,
}

#[derive(Debug)]
pub enum ArotPhase {
    Entry(Entry),
    SteadyGlide(SteadyGlide),
    Flare(Flare),
    TouchDown(TouchDown),
    BailOut(BailOut),
}

/// Phase identifiers, without phase data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseKind {
    Entry,
    SteadyGlide,
    Flare,
    TouchDown,
    BailOut,
}

/// What the outer mode manager should do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModeOutcome {
    /// Keep running the autorotation mode.
    Continue,

    /// Leave the autorotation mode.
    Exit(ExitReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    /// The bail out ramp finished, the previous flight mode should resume.
    BailOutComplete,

    /// The interlock was engaged on the ground.
    LandedWithInterlock,
}

/// Result of a transition rule which fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Goto(PhaseKind),
    Exit(ExitReason),
}

/// One shot messages to the operator.
#[derive(Debug, Clone, Copy)]
pub enum Advisory {
    PoorRpmSensor,
    TouchDownAltitude,
    TouchDownTimer,
}

/// A transition rule, returning the transition to make if the rule fires.
type TransitionRule<V> = fn(&ArotPhase, &mut ArotModePersistantData<V>) -> Option<Transition>;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<V: Vehicle> ArotMode<V> {
    /// Create a new inactive mode with the stock parameters.
    pub fn new(vehicle: V) -> Self {
        Self::with_params(arot_ctrl::Params::default(), vehicle)
    }

    /// Create a new inactive mode.
    pub fn with_params(params: arot_ctrl::Params, vehicle: V) -> Self {
        Self {
            persistant: ArotModePersistantData {
                ctrl: ArotCtrl::new(params),
                vehicle,
                clock_s: 0.0,
                dt: 0.0,
                initial_ratio: HEAD_SPEED_TARGET_RATIO,
                pitch_target_deg: 0.0,
                bad_rpm: false,
                advisories_sent: AdvisoriesSent::default(),
            },
            phase: None,
        }
    }

    /// Activate the mode, starting in the entry phase.
    ///
    /// Fails if the mode is disabled, the vehicle is not a traditional helicopter, or the
    /// interlock is engaged. On failure the mode remains inactive.
    pub fn activate(&mut self) -> Result<(), ArotModeError> {
        let p = &mut self.persistant;

        let frame = p.vehicle.frame_type();
        if frame != FrameType::TradHeli {
            return Err(ArotModeError::WrongFrame(frame));
        }

        if !p.ctrl.is_enabled() {
            info!("Autorotation mode not enabled");
            return Err(ArotModeError::NotEnabled);
        }

        if p.vehicle.interlock() {
            info!("Autorotation mode change failed: interlock engaged");
            return Err(ArotModeError::InterlockEngaged);
        }

        p.ctrl.init(&p.vehicle);
        p.ctrl.init_hs_controller();
        p.ctrl.init_fwd_spd_controller(&p.vehicle);

        // An unusable reading at activation would send the entry ramp somewhere meaningless, so
        // the ramp starts from the nominal speed instead
        let ratio = p.ctrl.sample_rpm(&p.vehicle);
        p.initial_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            HEAD_SPEED_TARGET_RATIO
        };

        p.clock_s = 0.0;
        p.dt = 0.0;
        p.pitch_target_deg = p.ctrl.pitch_target_deg();
        p.bad_rpm = false;
        p.advisories_sent = AdvisoriesSent::default();

        info!("Autorotation initiated");

        self.phase = Some(ArotPhase::enter(PhaseKind::Entry, p));

        Ok(())
    }

    /// Run one cycle of the mode.
    pub fn run(&mut self, dt: f64) -> Result<ArotOutput, ArotModeError> {
        let p = &mut self.persistant;
        let phase = self.phase.as_mut().ok_or(ArotModeError::NotActive)?;

        p.dt = dt;
        p.clock_s += dt;
        p.ctrl.set_dt(dt);
        p.ctrl.set_time(p.clock_s);

        // Evaluate the transition rules, the first which fires wins
        let transition = rules::<V>().iter().find_map(|rule| rule(phase, p));

        match transition {
            Some(Transition::Goto(kind)) if kind != phase.kind() => {
                info!("ArotMode phase change to: {}", kind);
                *phase = ArotPhase::enter(kind, p);
            }
            Some(Transition::Exit(reason)) => {
                info!("ArotMode exiting: {:?}", reason);
                let output = self.output(ModeOutcome::Exit(reason));
                self.phase = None;
                return Ok(output);
            }
            _ => (),
        }

        let outcome = phase.step(p);

        // Stabilised navigation, roll and yaw come from the pilot
        let angle_max_deg = p.vehicle.lean_angle_max_deg();
        let (pilot_roll_deg, _) = p.vehicle.desired_lean_angles_deg(angle_max_deg);
        let pilot_yaw_rate_degs = p.vehicle.desired_yaw_rate_degs();
        p.vehicle
            .set_target_lean_angles(pilot_roll_deg, p.pitch_target_deg, pilot_yaw_rate_degs);

        if p.bad_rpm {
            p.advise(Advisory::PoorRpmSensor);
        }

        p.ctrl.write_log(&mut p.vehicle);

        let output = self.output(outcome);
        if let ModeOutcome::Exit(reason) = outcome {
            info!("ArotMode exiting: {:?}", reason);
            self.phase = None;
        }

        Ok(output)
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_some()
    }

    /// The current phase, or `None` if the mode is not active.
    pub fn phase(&self) -> Option<PhaseKind> {
        self.phase.as_ref().map(|p| p.kind())
    }

    pub fn ctrl(&self) -> &ArotCtrl {
        &self.persistant.ctrl
    }

    pub fn vehicle(&self) -> &V {
        &self.persistant.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut V {
        &mut self.persistant.vehicle
    }

    pub fn status_report(&self) -> StatusReport {
        let ctrl = &self.persistant.ctrl;

        StatusReport {
            rpm_health: *ctrl.rpm_health(),
            head_speed_ratio: ctrl.rpm_ratio(),
            target_head_speed: ctrl.target_head_speed(),
            flare_started: ctrl.flare_initial_conditions().is_some(),
        }
    }

    fn output(&self, outcome: ModeOutcome) -> ArotOutput {
        let p = &self.persistant;

        ArotOutput {
            time_s: p.clock_s,
            phase: self.phase().unwrap_or(PhaseKind::Entry),
            collective: p.ctrl.last_collective(),
            pitch_target_deg: p.pitch_target_deg,
            bad_rpm: p.bad_rpm,
            outcome,
        }
    }
}

impl<V: Vehicle> State for ArotMode<V> {
    type InitData = &'static str;
    type InitError = ArotModeError;

    type InputData = InputData;
    type OutputData = ArotOutput;
    type StatusReport = StatusReport;
    type ProcError = ArotModeError;

    /// Load the parameters and activate the mode.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let params: arot_ctrl::Params =
            util::params::load(init_data).map_err(ArotModeError::ParamLoadError)?;

        self.persistant.ctrl = ArotCtrl::new(params);

        self.activate()
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let output = self.run(input_data.dt)?;
        Ok((output, self.status_report()))
    }
}

impl<V: Vehicle> ArotModePersistantData<V> {
    /// Issue an advisory, at most once per activation.
    pub fn advise(&mut self, advisory: Advisory) {
        let sent = match advisory {
            Advisory::PoorRpmSensor => &mut self.advisories_sent.poor_rpm_sensor,
            Advisory::TouchDownAltitude => &mut self.advisories_sent.touch_down_altitude,
            Advisory::TouchDownTimer => &mut self.advisories_sent.touch_down_timer,
        };

        if *sent {
            return;
        }
        *sent = true;

        match advisory {
            Advisory::PoorRpmSensor => {
                warn!("Poor RPM sensor health, minimum collective applied")
            }
            Advisory::TouchDownAltitude => info!("Touch down reason: altitude"),
            Advisory::TouchDownTimer => info!("Touch down reason: flare timer"),
        }
    }
}

impl ArotPhase {
    /// Enter a new phase, running its one shot initialisation.
    fn enter<V: Vehicle>(kind: PhaseKind, p: &mut ArotModePersistantData<V>) -> Self {
        match kind {
            PhaseKind::Entry => ArotPhase::Entry(Entry::enter(p)),
            PhaseKind::SteadyGlide => ArotPhase::SteadyGlide(SteadyGlide::enter(p)),
            PhaseKind::Flare => ArotPhase::Flare(Flare::enter(p)),
            PhaseKind::TouchDown => ArotPhase::TouchDown(TouchDown::enter(p)),
            PhaseKind::BailOut => ArotPhase::BailOut(BailOut::enter(p)),
        }
    }

    fn step<V: Vehicle>(&mut self, p: &mut ArotModePersistantData<V>) -> ModeOutcome {
        match self {
            ArotPhase::Entry(s) => s.step(p),
            ArotPhase::SteadyGlide(s) => s.step(p),
            ArotPhase::Flare(s) => s.step(p),
            ArotPhase::TouchDown(s) => s.step(p),
            ArotPhase::BailOut(s) => s.step(p),
        }
    }

    pub fn kind(&self) -> PhaseKind {
        match self {
            ArotPhase::Entry(_) => PhaseKind::Entry,
            ArotPhase::SteadyGlide(_) => PhaseKind::SteadyGlide,
            ArotPhase::Flare(_) => PhaseKind::Flare,
            ArotPhase::TouchDown(_) => PhaseKind::TouchDown,
            ArotPhase::BailOut(_) => PhaseKind::BailOut,
        }
    }

    /// Controller time at which the phase was entered.
    fn start_s(&self) -> f64 {
        match self {
            ArotPhase::Entry(s) => s.start_s,
            ArotPhase::SteadyGlide(s) => s.start_s,
            ArotPhase::Flare(s) => s.start_s,
            ArotPhase::TouchDown(s) => s.start_s,
            ArotPhase::BailOut(s) => s.start_s,
        }
    }

    fn elapsed_s(&self, clock_s: f64) -> f64 {
        clock_s - self.start_s()
    }
}

impl Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Entry => write!(f, "Entry"),
            PhaseKind::SteadyGlide => write!(f, "SteadyGlide"),
            PhaseKind::Flare => write!(f, "Flare"),
            PhaseKind::TouchDown => write!(f, "TouchDown"),
            PhaseKind::BailOut => write!(f, "BailOut"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TRANSITION RULES
// ------------------------------------------------------------------------------------------------

/// The transition rules in priority order.
fn rules<V: Vehicle>() -> [TransitionRule<V>; 6] {
    [
        interlock_airborne::<V>,
        interlock_landed::<V>,
        touch_down_altitude::<V>,
        flare_timer::<V>,
        flare_feasible::<V>,
        entry_timer::<V>,
    ]
}

/// Power restored in the air.
fn interlock_airborne<V: Vehicle>(
    _phase: &ArotPhase,
    p: &mut ArotModePersistantData<V>,
) -> Option<Transition> {
    if p.vehicle.interlock() && !p.vehicle.land_complete() {
        Some(Transition::Goto(PhaseKind::BailOut))
    } else {
        None
    }
}

/// Power restored on the ground.
fn interlock_landed<V: Vehicle>(
    _phase: &ArotPhase,
    p: &mut ArotModePersistantData<V>,
) -> Option<Transition> {
    if p.vehicle.interlock() && p.vehicle.land_complete() {
        Some(Transition::Exit(ExitReason::LandedWithInterlock))
    } else {
        None
    }
}

fn touch_down_altitude<V: Vehicle>(
    phase: &ArotPhase,
    p: &mut ArotModePersistantData<V>,
) -> Option<Transition> {
    match phase.kind() {
        PhaseKind::TouchDown | PhaseKind::BailOut => None,
        _ if p.vehicle.altitude_m() <= p.ctrl.td_alt_targ_m() => {
            p.advise(Advisory::TouchDownAltitude);
            Some(Transition::Goto(PhaseKind::TouchDown))
        }
        _ => None,
    }
}

fn flare_timer<V: Vehicle>(
    phase: &ArotPhase,
    p: &mut ArotModePersistantData<V>,
) -> Option<Transition> {
    if phase.kind() == PhaseKind::Flare
        && phase.elapsed_s(p.clock_s) >= p.ctrl.flare_time_period_s() - TIMER_TOLERANCE_S
    {
        p.advise(Advisory::TouchDownTimer);
        Some(Transition::Goto(PhaseKind::TouchDown))
    } else {
        None
    }
}

fn flare_feasible<V: Vehicle>(
    phase: &ArotPhase,
    p: &mut ArotModePersistantData<V>,
) -> Option<Transition> {
    match phase.kind() {
        PhaseKind::Flare | PhaseKind::TouchDown | PhaseKind::BailOut => None,
        _ if p.ctrl.should_flare(&mut p.vehicle) => Some(Transition::Goto(PhaseKind::Flare)),
        _ => None,
    }
}

fn entry_timer<V: Vehicle>(
    phase: &ArotPhase,
    p: &mut ArotModePersistantData<V>,
) -> Option<Transition> {
    if phase.kind() == PhaseKind::Entry
        && phase.elapsed_s(p.clock_s) >= ENTRY_TIME_S - TIMER_TOLERANCE_S
    {
        Some(Transition::Goto(PhaseKind::SteadyGlide))
    } else {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::fake::FakeVehicle;

    const DT: f64 = 0.01;

    pub(super) fn enabled_mode(vehicle: FakeVehicle) -> ArotMode<FakeVehicle> {
        let mut params = arot_ctrl::Params::default();
        params.enable = true;
        ArotMode::with_params(params, vehicle)
    }

    /// Fly a constant descent, returning the phase after each cycle.
    fn scripted_descent(
        mode: &mut ArotMode<FakeVehicle>,
        ticks: usize,
        interlock_at: Option<usize>,
    ) -> Vec<PhaseKind> {
        let mut phases = Vec::new();
        let alt_0 = mode.vehicle().altitude_m;

        for i in 0..ticks {
            let t = (i + 1) as f64 * DT;
            let v = mode.vehicle_mut();
            v.altitude_m = (alt_0 + v.climb_rate_ms * t).max(0.0);
            if Some(i) == interlock_at {
                v.interlock = true;
            }

            match mode.run(DT) {
                Ok(out) => phases.push(out.phase),
                Err(_) => break,
            }
        }

        phases
    }

    fn dedup(mut phases: Vec<PhaseKind>) -> Vec<PhaseKind> {
        phases.dedup();
        phases
    }

    #[test]
    fn test_activation_preconditions() {
        let mut vehicle = FakeVehicle::default();
        vehicle.frame = FrameType::MultiCopter;
        assert!(matches!(
            enabled_mode(vehicle).activate(),
            Err(ArotModeError::WrongFrame(FrameType::MultiCopter))
        ));

        let mut mode = ArotMode::new(FakeVehicle::default());
        assert!(matches!(mode.activate(), Err(ArotModeError::NotEnabled)));
        assert!(!mode.is_active());
        assert!(matches!(mode.run(DT), Err(ArotModeError::NotActive)));

        let mut vehicle = FakeVehicle::default();
        vehicle.interlock = true;
        assert!(matches!(
            enabled_mode(vehicle).activate(),
            Err(ArotModeError::InterlockEngaged)
        ));

        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();
        assert_eq!(mode.phase(), Some(PhaseKind::Entry));
    }

    #[test]
    fn test_nominal_phase_sequence() {
        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();

        let phases = scripted_descent(&mut mode, 2500, None);

        assert_eq!(
            dedup(phases),
            vec![
                PhaseKind::Entry,
                PhaseKind::SteadyGlide,
                PhaseKind::Flare,
                PhaseKind::TouchDown
            ]
        );
    }

    #[test]
    fn test_entry_lasts_two_seconds() {
        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();

        let phases = scripted_descent(&mut mode, 200, None);

        assert!(phases[..199].iter().all(|p| *p == PhaseKind::Entry));
        assert_eq!(phases[199], PhaseKind::SteadyGlide);
    }

    #[test]
    fn test_interlock_forces_bail_out_from_any_phase() {
        // Ticks at which the scripted descent is in each phase
        let cases = [
            (50, PhaseKind::Entry),
            (1000, PhaseKind::SteadyGlide),
            (1800, PhaseKind::Flare),
        ];

        for (tick, expected) in cases.iter() {
            let mut mode = enabled_mode(FakeVehicle::default());
            mode.activate().unwrap();

            let phases = scripted_descent(&mut mode, tick + 1, Some(*tick));
            assert_eq!(phases[tick - 1], *expected);
            assert_eq!(phases[*tick], PhaseKind::BailOut);
            assert_eq!(mode.vehicle().spool, Some(crate::vehicle::SpoolState::ThrottleUnlimited));
        }
    }

    #[test]
    fn test_interlock_in_touch_down_bails_out_unless_landed() {
        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();
        let phases = scripted_descent(&mut mode, 2500, None);
        assert_eq!(phases.last(), Some(&PhaseKind::TouchDown));

        let mut airborne = enabled_mode(FakeVehicle::default());
        airborne.activate().unwrap();
        scripted_descent(&mut airborne, 2500, None);
        airborne.vehicle_mut().interlock = true;
        assert_eq!(airborne.run(DT).unwrap().phase, PhaseKind::BailOut);

        mode.vehicle_mut().landed = true;
        mode.vehicle_mut().interlock = true;
        let out = mode.run(DT).unwrap();
        assert_eq!(out.outcome, ModeOutcome::Exit(ExitReason::LandedWithInterlock));
        assert!(!mode.is_active());
    }

    #[test]
    fn test_touch_down_by_altitude_skips_flare() {
        let mut vehicle = FakeVehicle::default();
        vehicle.altitude_m = 0.4;
        let mut mode = enabled_mode(vehicle);
        mode.activate().unwrap();

        let out = mode.run(DT).unwrap();
        assert_eq!(out.phase, PhaseKind::TouchDown);
        assert_eq!(out.pitch_target_deg, 0.0);
        assert!(mode.vehicle().rate_target_ms.unwrap() < 0.0);
    }

    #[test]
    fn test_attitude_targets_set_every_cycle() {
        let mut mode = enabled_mode(FakeVehicle::default());
        mode.activate().unwrap();

        let out = mode.run(DT).unwrap();
        let (roll, pitch, yaw_rate) = mode.vehicle().lean_targets.unwrap();
        assert_eq!(roll, 0.0);
        assert_eq!(yaw_rate, 0.0);
        assert_eq!(pitch, out.pitch_target_deg);
    }

    #[test]
    fn test_state_proc_requires_init() {
        let mut mode = enabled_mode(FakeVehicle::default());
        assert!(mode.proc(&InputData { dt: DT }).is_err());

        mode.activate().unwrap();
        let (out, report) = mode.proc(&InputData { dt: DT }).unwrap();
        assert_eq!(out.outcome, ModeOutcome::Continue);
        assert!(!report.flare_started);
    }
}
