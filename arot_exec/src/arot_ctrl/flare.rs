//! Flare feasibility evaluation and flare entry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::Serialize;

use super::{
    estimate_drag_mss, scale_drag, ArotCtrl, FlareCheck, FlareTrackState,
    HalfCosineProfile, LowPassFilter, Params, TelemetryRecord,
    FLARE_MIN_ACCEL_PEAK_G, GRAVITY_MSS,
};
use crate::vehicle::{Ahrs, Telemetry};
use util::maths::constrain;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Forward speed the flare aims to reach at touch down.
///
/// Units: meters/second
const TD_FWD_VEL_MS: f64 = 0.0;

/// Collective the flare starts from if the head speed regulator never ran.
const FLARE_FALLBACK_COLLECTIVE: f64 = 0.5;

/// Fraction either side of the touch down altitude target which the
/// predicted touch down altitude must fall within.
const TD_ALT_TOLERANCE: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Accelerations and limits of a flare started now.
///
/// Recomputed every cycle until the flare starts, then frozen.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlarePrediction {
    /// Peak vertical acceleration of the half-cosine profile, excluding
    /// gravity.
    pub delta_accel_z_peak_mss: f64,

    /// Peak forward acceleration of the half-cosine profile, excluding drag.
    pub delta_accel_fwd_peak_mss: f64,

    /// Peak vertical acceleration the rotor must provide.
    pub accel_z_peak_mss: f64,

    /// Peak forward acceleration the rotor must provide.
    pub accel_fwd_peak_mss: f64,

    pub resultant_accel_peak_mss: f64,

    /// Pitch angle at peak acceleration.
    pub pitch_max_deg: f64,

    pub td_alt_predicted_m: f64,
}

/// Vehicle state captured at the first cycle of the flare.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlareInitialConditions {
    pub vel_z_ms: f64,
    pub vel_fwd_ms: f64,
    pub alt_m: f64,
    pub drag_mss: f64,
}

/// Working state of the flare evaluator and tracker.
#[derive(Debug, Clone, Copy)]
pub struct FlareState {
    /// Set once the initial conditions have been captured. The prediction is
    /// frozen from then on.
    pub started: bool,

    pub prediction: FlarePrediction,
    pub initial: FlareInitialConditions,

    pub pitch_out_deg: f64,
    pub pitch_trim_lpf: LowPassFilter,

    /// Proportional correction to the vertical velocity target from the
    /// altitude error.
    pub z_pos_correction_ms: f64,

    pub tracking: FlareTrackState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FlareState {
    pub fn new(params: &Params) -> Self {
        Self {
            started: false,
            prediction: FlarePrediction::default(),
            initial: FlareInitialConditions::default(),
            pitch_out_deg: 0.0,
            pitch_trim_lpf: LowPassFilter::new(params.flare_pitch_cutoff_hz),
            z_pos_correction_ms: 0.0,
            tracking: FlareTrackState::default(),
        }
    }
}

impl ArotCtrl {
    /// Decide whether a flare started now would meet the touch down
    /// constraints.
    ///
    /// Updates the flare prediction. Once the flare has started the
    /// prediction is frozen and this always returns false.
    pub fn should_flare<V>(&mut self, vehicle: &mut V) -> bool
    where
        V: Ahrs + Telemetry + ?Sized,
    {
        if self.flare.started {
            return false;
        }

        let vel_z = vehicle.climb_rate_ms();
        let vel_fwd = vehicle.speed_forward_ms();
        let period = self.flare_period_s;

        let mut pred = FlarePrediction::default();

        // Peaks of the half-cosine profiles reaching the touch down speeds at
        // the end of the period
        pred.delta_accel_z_peak_mss =
            2.0 * (-self.params.td_vel_z_ms - vel_z) / period;
        pred.delta_accel_fwd_peak_mss = 2.0 * (TD_FWD_VEL_MS - vel_fwd) / period;

        pred.accel_z_peak_mss = pred.delta_accel_z_peak_mss + GRAVITY_MSS;

        // Drag at the speed expected at peak acceleration, a quarter of the
        // way through the flare
        let drag = estimate_drag_mss(vehicle);
        let vel_fwd_prediction =
            pred.delta_accel_fwd_peak_mss * period / 4.0 + vel_fwd;
        pred.accel_fwd_peak_mss = pred.delta_accel_fwd_peak_mss
            - scale_drag(drag, vel_fwd_prediction, vel_fwd);

        pred.resultant_accel_peak_mss =
            pred.accel_z_peak_mss.hypot(pred.accel_fwd_peak_mss);

        let min_accel = FLARE_MIN_ACCEL_PEAK_G * GRAVITY_MSS;
        let max_accel = self.params.flare_accel_max_g * GRAVITY_MSS;

        if pred.resultant_accel_peak_mss < min_accel
            || pred.resultant_accel_peak_mss > max_accel
        {
            trace!(
                "Flare rejected: peak accel {:.2} outside [{:.2}, {:.2}]",
                pred.resultant_accel_peak_mss,
                min_accel,
                max_accel
            );
            self.flare.prediction = pred;
            return false;
        }

        pred.pitch_max_deg = pitch_from_accel_deg(
            pred.accel_fwd_peak_mss,
            pred.resultant_accel_peak_mss,
        );

        if pred.pitch_max_deg.abs() > self.angle_max_deg.abs() {
            trace!("Flare rejected: pitch {:.2} deg", pred.pitch_max_deg);
            self.flare.prediction = pred;
            return false;
        }

        pred.td_alt_predicted_m = HalfCosineProfile {
            accel_peak: pred.delta_accel_z_peak_mss,
            vel_initial: vel_z,
            pos_initial: vehicle.altitude_m(),
            period,
        }
        .pos(period);

        self.flare.prediction = pred;

        vehicle.write_record(TelemetryRecord::FlareCheck(FlareCheck {
            time_s: self.time_s,
            vel_z_ms: vel_z,
            td_vel_z_ms: self.params.td_vel_z_ms,
            resultant_accel_peak_mss: pred.resultant_accel_peak_mss,
            min_accel_mss: min_accel,
            max_accel_mss: max_accel,
            td_alt_predicted_m: pred.td_alt_predicted_m,
        }));

        let td_alt = self.params.td_alt_targ_m;
        if pred.td_alt_predicted_m < td_alt * (1.0 - TD_ALT_TOLERANCE)
            || pred.td_alt_predicted_m > td_alt * (1.0 + TD_ALT_TOLERANCE)
        {
            trace!(
                "Flare rejected: predicted touch down at {:.2} m",
                pred.td_alt_predicted_m
            );
            return false;
        }

        true
    }

    /// Capture the vehicle state the flare trajectory starts from.
    pub fn set_flare_initial_cond<A: Ahrs + ?Sized>(&mut self, ahrs: &A) {
        self.flare.started = true;

        self.flare.initial = FlareInitialConditions {
            vel_z_ms: ahrs.climb_rate_ms(),
            vel_fwd_ms: ahrs.speed_forward_ms(),
            alt_m: ahrs.altitude_m(),
            drag_mss: estimate_drag_mss(ahrs),
        };

        debug!("Flare initial conditions: {:?}", self.flare.initial);
    }

    /// Seed the flare trims from the current outputs so that entering the
    /// flare causes no step in demand.
    pub fn init_flare_controller<A: Ahrs + ?Sized>(&mut self, ahrs: &A) {
        if !self.hs.running {
            self.collective_out = FLARE_FALLBACK_COLLECTIVE;
            self.pitch_target_deg = ahrs.pitch_rad().to_degrees();
        }
        self.flare.pitch_out_deg = self.pitch_target_deg;

        self.col_trim_lpf.set_cutoff(self.hs.col_cutoff_hz);
        self.flare
            .pitch_trim_lpf
            .set_cutoff(self.params.flare_pitch_cutoff_hz);

        self.col_trim_lpf.reset(self.collective_out);
        self.flare.pitch_trim_lpf.reset(self.flare.pitch_out_deg);
        self.flare.z_pos_correction_ms = 0.0;
    }

    pub fn flare_prediction(&self) -> &FlarePrediction {
        &self.flare.prediction
    }

    pub fn flare_initial_conditions(&self) -> Option<&FlareInitialConditions> {
        if self.flare.started {
            Some(&self.flare.initial)
        } else {
            None
        }
    }
}

/// Pitch angle which points the rotor's thrust along an acceleration with the
/// given forward component and magnitude.
///
/// Nose up is positive, so decelerating gives a positive pitch.
pub(crate) fn pitch_from_accel_deg(fwd_accel: f64, magnitude: f64) -> f64 {
    constrain(fwd_accel / magnitude, -1.0, 1.0).acos().to_degrees() - 90.0
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::fake::FakeVehicle;
    use nalgebra::Vector3;

    fn flare_ready_vehicle() -> FakeVehicle {
        let mut vehicle = FakeVehicle::default();
        vehicle.altitude_m = 12.875;
        vehicle.climb_rate_ms = -5.0;
        vehicle
    }

    fn ctrl(period: f64, vehicle: &FakeVehicle) -> ArotCtrl {
        let mut params = Params::default();
        params.flare_time_period_s = period;
        let mut ctrl = ArotCtrl::new(params);
        ctrl.init(vehicle);
        ctrl
    }

    #[test]
    fn test_flare_accepted_at_predicted_altitude() {
        let mut vehicle = flare_ready_vehicle();
        let mut ctrl = ctrl(4.5, &vehicle);

        assert!(ctrl.should_flare(&mut vehicle));

        let pred = ctrl.flare_prediction();
        assert!((pred.delta_accel_z_peak_mss - 2.0).abs() < 1e-9);
        assert!((pred.delta_accel_fwd_peak_mss + 22.0 / 4.5).abs() < 1e-9);
        assert!((pred.td_alt_predicted_m - 0.5).abs() < 1e-9);
        assert!(pred.pitch_max_deg > 0.0 && pred.pitch_max_deg < 30.0);
    }

    #[test]
    fn test_flare_rejected_when_too_high() {
        let mut vehicle = flare_ready_vehicle();
        vehicle.altitude_m = 30.0;
        let mut ctrl = ctrl(4.5, &vehicle);

        assert!(!ctrl.should_flare(&mut vehicle));
        assert!(ctrl.flare_prediction().td_alt_predicted_m > 0.75);
    }

    #[test]
    fn test_flare_rejected_when_pitch_too_large() {
        let mut vehicle = flare_ready_vehicle();
        vehicle.groundspeed.x = 30.0;
        let mut ctrl = ctrl(4.5, &vehicle);

        assert!(!ctrl.should_flare(&mut vehicle));
        assert!(ctrl.flare_prediction().pitch_max_deg > 30.0);
    }

    #[test]
    fn test_flare_rejected_when_accel_too_small() {
        // Already slow and at touch down descent rate, the flare would ask for
        // less than the minimum peak
        let mut vehicle = flare_ready_vehicle();
        vehicle.climb_rate_ms = -0.5;
        vehicle.groundspeed.x = 1.0;
        let mut ctrl = ctrl(4.5, &vehicle);

        assert!(!ctrl.should_flare(&mut vehicle));
        assert!(
            ctrl.flare_prediction().resultant_accel_peak_mss
                < FLARE_MIN_ACCEL_PEAK_G * GRAVITY_MSS
        );
    }

    #[test]
    fn test_peak_accel_falls_with_period() {
        let mut vehicle = flare_ready_vehicle();

        let mut last = std::f64::INFINITY;
        for period in &[1.0, 2.0, 3.0, 4.5, 6.0, 8.0] {
            let mut ctrl = ctrl(*period, &vehicle);
            ctrl.should_flare(&mut vehicle);

            let peak = ctrl.flare_prediction().resultant_accel_peak_mss;
            assert!(peak < last, "period {} gave {} >= {}", period, peak, last);
            last = peak;
        }
    }

    #[test]
    fn test_hover_has_no_drag_term() {
        // Vertical descent with no forward speed must not divide by zero
        let mut vehicle = flare_ready_vehicle();
        vehicle.groundspeed.x = 0.0;
        vehicle.accel_ef = Vector3::new(0.3, 0.0, -GRAVITY_MSS);
        let mut ctrl = ctrl(4.5, &vehicle);

        ctrl.should_flare(&mut vehicle);
        let pred = ctrl.flare_prediction();
        assert!(pred.resultant_accel_peak_mss.is_finite());
        assert_eq!(pred.accel_fwd_peak_mss, pred.delta_accel_fwd_peak_mss);
    }

    #[test]
    fn test_prediction_frozen_once_flare_started() {
        let mut vehicle = flare_ready_vehicle();
        let mut ctrl = ctrl(4.5, &vehicle);

        assert!(ctrl.should_flare(&mut vehicle));
        ctrl.set_flare_initial_cond(&vehicle);
        let frozen = *ctrl.flare_prediction();

        vehicle.climb_rate_ms = -2.0;
        assert!(!ctrl.should_flare(&mut vehicle));
        assert_eq!(
            ctrl.flare_prediction().delta_accel_z_peak_mss,
            frozen.delta_accel_z_peak_mss
        );
    }

    #[test]
    fn test_flare_init_without_head_speed_control() {
        let mut vehicle = flare_ready_vehicle();
        vehicle.pitch_rad = 0.1;
        let mut ctrl = ctrl(4.5, &vehicle);

        ctrl.init_flare_controller(&vehicle);
        assert_eq!(ctrl.last_collective(), FLARE_FALLBACK_COLLECTIVE);
        assert!((ctrl.pitch_target_deg() - 0.1f64.to_degrees()).abs() < 1e-9);
        assert_eq!(ctrl.flare.pitch_out_deg, ctrl.pitch_target_deg());
    }
}
