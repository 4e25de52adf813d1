//! RPM sensor health monitor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use crate::vehicle::RpmSource;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of unhealthy samples which must be exceeded before the sensor is
/// declared bad.
pub const RPM_FAULT_THRESHOLD: u32 = 30;

/// Number of consecutive healthy samples which clear the unhealthy count.
pub const RPM_CLEAR_THRESHOLD: u32 = 10;

/// Readings at or below this value are the sensor flagging itself unreliable.
const RPM_UNRELIABLE_SENTINEL: f64 = -1.0;

/// Highest valid sensor instance.
const RPM_MAX_INSTANCE: i32 = 1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Hysteresis counters on the health of the RPM sensor.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RpmHealth {
    pub unhealthy_count: u32,
    pub healthy_count: u32,
    pub bad_flag: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RpmHealth {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record whether the latest sample was healthy and re-evaluate the fault
    /// flag.
    pub fn update(&mut self, healthy: bool) -> bool {
        if !healthy {
            self.unhealthy_count = self.unhealthy_count.saturating_add(1);
            self.healthy_count = 0;
        } else if self.unhealthy_count > 0 {
            self.healthy_count += 1;

            if self.healthy_count >= RPM_CLEAR_THRESHOLD {
                self.unhealthy_count = 0;
                self.healthy_count = 0;
            }
        }

        self.bad_flag = self.unhealthy_count > RPM_FAULT_THRESHOLD;
        self.bad_flag
    }

    /// Read the sensor without touching the counters.
    ///
    /// Returns the raw RPM and whether the reading is healthy. An invalid
    /// `instance` is reset to 0. A missing sensor reads 0 RPM and is
    /// unhealthy.
    pub fn read<R: RpmSource + ?Sized>(source: &R, instance: &mut i32) -> (f64, bool) {
        if *instance < 0 || *instance > RPM_MAX_INSTANCE {
            *instance = 0;
        }

        match source.rpm(*instance as usize) {
            Some(r) => (r, r > RPM_UNRELIABLE_SENTINEL),
            None => (0.0, false),
        }
    }

    /// Read the sensor, update the counters, and return the raw RPM.
    pub fn sample<R: RpmSource + ?Sized>(
        &mut self,
        source: &R,
        instance: &mut i32,
    ) -> f64 {
        let (rpm, healthy) = Self::read(source, instance);

        self.update(healthy);

        trace!(
            "RPM sample {:.1} (healthy: {}, unhealthy count: {})",
            rpm,
            healthy,
            self.unhealthy_count
        );

        rpm
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::fake::FakeVehicle;

    #[test]
    fn test_fault_after_31_unhealthy_samples() {
        let mut health = RpmHealth::default();

        for _ in 0..30 {
            assert!(!health.update(false));
        }
        assert!(health.update(false));
    }

    #[test]
    fn test_clear_boundary() {
        let mut health = RpmHealth::default();
        for _ in 0..31 {
            health.update(false);
        }

        // Nine good samples are not enough
        for _ in 0..9 {
            assert!(health.update(true));
        }

        // The tenth clears the fault
        assert!(!health.update(true));
        assert_eq!(health.unhealthy_count, 0);
        assert_eq!(health.healthy_count, 0);
    }

    #[test]
    fn test_unhealthy_sample_restarts_clear_run() {
        let mut health = RpmHealth::default();
        for _ in 0..31 {
            health.update(false);
        }
        for _ in 0..9 {
            health.update(true);
        }
        health.update(false);

        for _ in 0..9 {
            assert!(health.update(true));
        }
        assert!(!health.update(true));
    }

    #[test]
    fn test_sample_sources() {
        let mut health = RpmHealth::default();
        let mut vehicle = FakeVehicle::default();
        let mut instance = 0;

        assert_eq!(health.sample(&vehicle, &mut instance), 1500.0);
        assert_eq!(health.unhealthy_count, 0);

        // Sentinel
        vehicle.rpm[0] = Some(-1.0);
        health.sample(&vehicle, &mut instance);
        assert_eq!(health.unhealthy_count, 1);

        // Missing instance
        instance = 1;
        assert_eq!(health.sample(&vehicle, &mut instance), 0.0);
        assert_eq!(health.unhealthy_count, 2);

        // Invalid instance falls back to 0
        instance = 4;
        vehicle.rpm[0] = Some(1400.0);
        assert_eq!(health.sample(&vehicle, &mut instance), 1400.0);
        assert_eq!(instance, 0);
    }

    #[test]
    fn test_read_leaves_counters() {
        let mut vehicle = FakeVehicle::default();
        vehicle.rpm[0] = Some(-1.0);
        let mut instance = 0;

        assert_eq!(RpmHealth::read(&vehicle, &mut instance), (-1.0, false));
        assert_eq!(RpmHealth::read(&vehicle, &mut instance), (-1.0, false));

        instance = 1;
        assert_eq!(RpmHealth::read(&vehicle, &mut instance), (0.0, false));

        instance = -3;
        vehicle.rpm[0] = Some(1400.0);
        assert_eq!(RpmHealth::read(&vehicle, &mut instance), (1400.0, true));
        assert_eq!(instance, 0);
    }
}
