//! Head speed regulator
//!
//! Holds main rotor speed at a normalised target by adjusting collective. The
//! output is a proportional term on the head speed error plus a following
//! trim, which is the previous cycle's collective passed through a low pass
//! filter.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use super::{ArotCtrl, RpmHealth, BAD_RPM_COLLECTIVE, COLLECTIVE_CUTOFF_HZ};
use crate::vehicle::{Motors, RpmSource};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Collective the regulator starts from.
const HS_INITIAL_COLLECTIVE: f64 = 0.4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Working state of the head speed regulator.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HeadSpeedState {
    /// True once the regulator has been initialised.
    pub running: bool,

    /// RPM sensor instance in use.
    pub rpm_instance: i32,

    /// Latest raw RPM reading.
    pub current_rpm: f64,

    /// Normalised head speed target.
    pub target: f64,

    /// Collective trim filter cut off selected by the current phase.
    pub col_cutoff_hz: f64,

    pub error: f64,
    pub p_term: f64,
    pub ff_term: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadSpeedState {
    pub fn new(rpm_instance: i32) -> Self {
        Self {
            rpm_instance,
            target: 1.0,
            ..Default::default()
        }
    }
}

impl ArotCtrl {
    /// Initialise the head speed regulator.
    pub fn init_hs_controller(&mut self) {
        self.hs.running = true;
        self.collective_out = HS_INITIAL_COLLECTIVE;
        self.col_trim_lpf.reset(self.collective_out);
    }

    /// Set the collective trim filter cut off.
    pub fn set_col_cutoff_freq(&mut self, cutoff_hz: f64) {
        self.hs.col_cutoff_hz = cutoff_hz;
    }

    /// Set the normalised head speed target.
    pub fn set_target_head_speed(&mut self, target: f64) {
        self.hs.target = target;
    }

    pub fn target_head_speed(&self) -> f64 {
        self.hs.target
    }

    /// Sample the RPM sensor and return the head speed normalised by the set
    /// point.
    ///
    /// Every call counts towards the sensor health hysteresis.
    pub fn sample_rpm<R: RpmSource + ?Sized>(&mut self, source: &R) -> f64 {
        self.hs.current_rpm =
            self.rpm_health.sample(source, &mut self.hs.rpm_instance);
        self.rpm_ratio()
    }

    /// Read the RPM sensor and return the head speed normalised by the set
    /// point, without counting towards the sensor health hysteresis.
    pub fn read_rpm_ratio<R: RpmSource + ?Sized>(&mut self, source: &R) -> f64 {
        let (rpm, _) = RpmHealth::read(source, &mut self.hs.rpm_instance);
        rpm / self.hs_set_point_rpm
    }

    /// Head speed from the latest sample, normalised by the set point.
    pub fn rpm_ratio(&self) -> f64 {
        self.hs.current_rpm / self.hs_set_point_rpm
    }

    /// Run one cycle of the head speed regulator.
    ///
    /// Returns true if the RPM sensor is bad, in which case the minimum
    /// collective was demanded instead.
    pub fn update_hs_glide_controller<V>(&mut self, vehicle: &mut V) -> bool
    where
        V: RpmSource + Motors + ?Sized,
    {
        let head_speed_norm = self.sample_rpm(vehicle);
        let bad_rpm = self.rpm_health.bad_flag;

        if !bad_rpm {
            self.col_trim_lpf.set_cutoff(self.hs.col_cutoff_hz);

            self.hs.error = head_speed_norm - self.hs.target;
            self.hs.p_term = self.params.hs_p * self.hs.error;

            // The trim follows last cycle's output, so it has to be updated
            // before the new output is formed
            self.hs.ff_term = self.col_trim_lpf.apply(self.collective_out, self.dt);

            self.collective_out = self.hs.p_term + self.hs.ff_term;
        } else {
            self.collective_out = BAD_RPM_COLLECTIVE;
        }

        trace!(
            "Head speed: norm {:.4}, target {:.4}, collective {:.4}",
            head_speed_norm,
            self.hs.target,
            self.collective_out
        );

        self.set_collective(vehicle);

        bad_rpm
    }

    /// Send the collective demand to the motors.
    pub(crate) fn set_collective<M: Motors + ?Sized>(&self, motors: &mut M) {
        motors.set_collective_filter_cutoff(COLLECTIVE_CUTOFF_HZ);
        motors.set_collective(self.collective_out);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::arot_ctrl::Params;
    use crate::vehicle::fake::FakeVehicle;

    fn ctrl() -> (ArotCtrl, FakeVehicle) {
        let vehicle = FakeVehicle::default();
        let mut ctrl = ArotCtrl::new(Params::default());
        ctrl.init(&vehicle);
        ctrl.set_dt(0.01);
        ctrl.init_hs_controller();
        ctrl.set_col_cutoff_freq(ctrl.params().col_glide_cutoff_hz);
        (ctrl, vehicle)
    }

    #[test]
    fn test_on_set_point_converges() {
        let (mut ctrl, mut vehicle) = ctrl();

        let mut last = ctrl.last_collective();
        for _ in 0..50 {
            assert!(!ctrl.update_hs_glide_controller(&mut vehicle));
            assert!(ctrl.hs.error.abs() <= 0.01);

            let out = ctrl.last_collective();
            assert!((out - last).abs() <= 0.02 * last.abs());
            last = out;
        }

        assert_eq!(vehicle.collective, Some(last));
        assert_eq!(vehicle.collective_cutoff_hz, Some(COLLECTIVE_CUTOFF_HZ));
    }

    #[test]
    fn test_over_speed_raises_collective() {
        let (mut ctrl, mut vehicle) = ctrl();
        vehicle.rpm[0] = Some(1650.0);

        ctrl.update_hs_glide_controller(&mut vehicle);

        // The trim was reset to the initial collective, so the output is that
        // plus the proportional term
        let expected = 0.4 + 0.7 * 0.1;
        assert!((ctrl.last_collective() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bad_rpm_forces_minimum_collective() {
        let (mut ctrl, mut vehicle) = ctrl();
        vehicle.rpm[0] = Some(-1.0);

        for _ in 0..30 {
            assert!(!ctrl.update_hs_glide_controller(&mut vehicle));
        }
        assert!(ctrl.update_hs_glide_controller(&mut vehicle));
        assert_eq!(vehicle.collective, Some(BAD_RPM_COLLECTIVE));

        // Recovers once the sensor clears
        vehicle.rpm[0] = Some(1500.0);
        for _ in 0..9 {
            assert!(ctrl.update_hs_glide_controller(&mut vehicle));
        }
        assert!(!ctrl.update_hs_glide_controller(&mut vehicle));
    }
}
