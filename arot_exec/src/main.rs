//! Autorotation executable entry point.
//!
//! # Architecture
//!
//! The executable flies the autorotation mode against the rotorcraft simulation:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the simulation and the mode, which activates at power loss
//!     - Main loop:
//!         - Autorotation mode processing
//!         - Simulation step
//!         - Archiving
//!         - Stop on mode exit, after landing, or at the maximum duration
//!     - Save a summary of the run into the session directory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use arot_lib::{
    arot_mode::{ArotMode, ExitReason, InputData, ModeOutcome, PhaseKind, StatusReport},
    params::ExecParams,
    sim::{SimParams, SimSummary, SimVehicle},
    tm_archive::ArchiveTelemetry,
    vehicle::LandDetector,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Controller parameter file, relative to the params directory.
const CTRL_PARAMS_PATH: &str = "arot_ctrl.toml";

const SIM_PARAMS_PATH: &str = "sim.toml";

const EXEC_PARAMS_PATH: &str = "exec.toml";

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "arot_exec",
    about = "Flies the autorotation mode against a simulated helicopter"
)]
struct Opt {
    /// Log debug and trace records as well.
    #[structopt(short, long)]
    verbose: bool,

    /// Re-engage the interlock at this simulation time (seconds), triggering a bail out.
    #[structopt(long)]
    interlock_at: Option<f64>,

    /// Override the maximum simulated duration (seconds).
    #[structopt(long)]
    max_duration: Option<f64>,

    /// Don't write any archives.
    #[structopt(long)]
    no_archive: bool,
}

/// A phase change seen by the executable.
#[derive(Debug, Serialize)]
struct PhaseChange {
    time_s: f64,
    phase: PhaseKind,
}

/// What the main loop saw before it stopped.
#[derive(Debug)]
struct LoopSummary {
    num_cycles: u64,
    exit_reason: Option<ExitReason>,
    phase_changes: Vec<PhaseChange>,
}

/// Summary of the run, saved as `summary.json` in the session directory.
#[derive(Debug, Serialize)]
struct RunSummary {
    num_cycles: u64,
    exit_reason: Option<ExitReason>,
    phase_changes: Vec<PhaseChange>,
    final_status: StatusReport,
    sim: SimSummary,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let opt = Opt::from_args();

    // Initialise session
    let session = Session::new("arot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = if opt.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Autorotation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load(EXEC_PARAMS_PATH).wrap_err("Could not load exec params")?;

    let mut sim_params: SimParams =
        util::params::load(SIM_PARAMS_PATH).wrap_err("Could not load sim params")?;

    if let Some(t) = opt.interlock_at {
        sim_params.interlock_at_s = Some(t);
    }

    let max_duration_s = opt.max_duration.unwrap_or(exec_params.max_duration_s);
    let archive = exec_params.archive_telemetry && !opt.no_archive;

    let dt = exec_params.cycle_period_s;
    if !(dt > 0.0) {
        return Err(eyre!("The cycle period must be positive, found {}", dt));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE SIMULATION ----

    let mut vehicle = SimVehicle::new(sim_params);

    if archive {
        vehicle.set_telemetry(ArchiveTelemetry::new(&session));
        vehicle
            .enable_archive(&session)
            .map_err(|e| eyre!("Could not open the simulation archive: {}", e))?;
    }

    info!("Simulation initialised");

    // ---- INITIALISE MODULES ----

    let mut mode = ArotMode::new(vehicle);
    mode.init(CTRL_PARAMS_PATH, &session)
        .wrap_err("Failed to initialise ArotMode")?;
    info!("ArotMode init complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let loop_summary = run_loop(&mut mode, &exec_params, max_duration_s, archive)?;

    // ---- SHUTDOWN ----

    let summary = RunSummary {
        num_cycles: loop_summary.num_cycles,
        exit_reason: loop_summary.exit_reason,
        phase_changes: loop_summary.phase_changes,
        final_status: mode.status_report(),
        sim: mode.vehicle().summary(),
    };

    match summary.sim.touch_down {
        Some(td) => info!(
            "Touch down at {:.2} m/s vertical, {:.2} m/s forward",
            td.vel_z_ms, td.vel_fwd_ms
        ),
        None => info!("No touch down"),
    }

    session.save_json("summary.json", &summary);

    info!("End of execution");

    Ok(())
}

/// Cycle the mode and the simulation until the mode exits, the vehicle has been on the ground for
/// the post landing time, or the maximum duration is reached.
fn run_loop(
    mode: &mut ArotMode<SimVehicle>,
    exec_params: &ExecParams,
    max_duration_s: f64,
    archive: bool,
) -> Result<LoopSummary, Report> {
    let dt = exec_params.cycle_period_s;
    let input = InputData { dt };
    let mut num_cycles: u64 = 0;
    let mut exit_reason = None;
    let mut phase_changes: Vec<PhaseChange> = Vec::new();
    let mut landed_at_s: Option<f64> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (output, _) = mode.proc(&input).wrap_err("ArotMode processing failed")?;
        num_cycles += 1;

        if phase_changes.last().map(|c| c.phase) != Some(output.phase) {
            phase_changes.push(PhaseChange {
                time_s: output.time_s,
                phase: output.phase,
            });
        }

        if let ModeOutcome::Exit(reason) = output.outcome {
            info!("ArotMode handed back control: {:?}", reason);
            exit_reason = Some(reason);
            break;
        }

        // ---- SIMULATION ----

        mode.vehicle_mut().step(dt);

        // ---- WRITE ARCHIVES ----

        if archive {
            if let Err(e) = mode.vehicle_mut().write() {
                warn!("Could not write the simulation archive: {}", e);
            }
        }

        // ---- STOP CONDITIONS ----

        let sim_time_s = mode.vehicle().time_s();

        if mode.vehicle().land_complete() {
            let landed_s = *landed_at_s.get_or_insert(sim_time_s);
            if sim_time_s - landed_s >= exec_params.post_landing_s {
                info!("Vehicle landed, stopping");
                break;
            }
        }

        if sim_time_s >= max_duration_s {
            warn!("Maximum duration of {:.1} s reached before landing", max_duration_s);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        if exec_params.real_time {
            let cycle_dur = Instant::now() - cycle_start_instant;

            match Duration::from_secs_f64(dt).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - dt
                ),
            }
        }
    }

    Ok(LoopSummary {
        num_cycles,
        exit_reason,
        phase_changes,
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use arot_lib::arot_ctrl::Params;

    fn active_mode(sim_params: SimParams) -> ArotMode<SimVehicle> {
        let params = Params {
            enable: true,
            ..Params::default()
        };
        let mut mode = ArotMode::with_params(params, SimVehicle::new(sim_params));
        mode.activate().unwrap();
        mode
    }

    #[test]
    fn test_cycle_count_includes_stopping_cycle() {
        let mut mode = active_mode(SimParams::default());
        let exec_params = ExecParams {
            cycle_period_s: 0.25,
            real_time: false,
            ..ExecParams::default()
        };

        let summary = run_loop(&mut mode, &exec_params, 1.0, false).unwrap();

        assert_eq!(summary.num_cycles, 4);
        assert_eq!(mode.vehicle().time_s(), 1.0);
        assert_eq!(summary.exit_reason, None);
        assert_eq!(summary.phase_changes.len(), 1);
        assert_eq!(summary.phase_changes[0].phase, PhaseKind::Entry);
    }

    #[test]
    fn test_cycle_count_includes_exit_cycle() {
        // Sat on the ground with the rotor unloaded, power comes back on the second cycle
        let mut mode = active_mode(SimParams {
            initial_alt_m: 0.0,
            initial_collective: 0.0,
            initial_head_speed_ratio: 1.0,
            interlock_at_s: Some(0.1),
            ..SimParams::default()
        });
        let exec_params = ExecParams {
            cycle_period_s: 0.25,
            real_time: false,
            ..ExecParams::default()
        };

        let summary = run_loop(&mut mode, &exec_params, 1.0, false).unwrap();

        assert_eq!(summary.num_cycles, 2);
        assert_eq!(summary.exit_reason, Some(ExitReason::LandedWithInterlock));
        assert_eq!(summary.phase_changes.last().unwrap().phase, PhaseKind::TouchDown);
    }
}
