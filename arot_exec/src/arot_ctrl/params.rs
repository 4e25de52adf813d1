//! Parameters structure for ArotCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for autorotation control.
///
/// Missing fields take the stock value, so a parameter file only has to
/// carry the tunings which differ from it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Allow the autorotation mode to be entered.
    pub enable: bool,

    /// The RPM sensor instance to use for head speed, either 0 or 1.
    pub rpm_instance: i32,

    /// Bitmask of the optional tuning records to log.
    ///
    /// Bit 0: glide tuning, bit 1: flare tuning.
    pub log_bitmask: u8,

    // ---- HEAD SPEED ----
    /// Proportional gain on normalised head speed error.
    pub hs_p: f64,

    /// The nominal main rotor head speed.
    ///
    /// Units: RPM
    pub hs_set_point_rpm: f64,

    /// Collective trim filter cut off during the entry phase.
    ///
    /// Units: Hz
    pub col_entry_cutoff_hz: f64,

    /// Collective trim filter cut off during the steady glide phase.
    ///
    /// Units: Hz
    pub col_glide_cutoff_hz: f64,

    // ---- FORWARD SPEED ----
    /// Ground speed targeted during the glide.
    ///
    /// Units: meters/second
    pub target_gnd_speed_ms: f64,

    /// Limit on forward acceleration and on its change per cycle.
    ///
    /// Units: meters/second^2
    pub fwd_accel_max_mss: f64,

    /// Proportional gain of the forward velocity controller.
    pub fwd_vel_p: f64,

    /// Velocity feed-forward gain of the forward velocity controller.
    pub fwd_vel_ff: f64,

    // ---- FLARE ----
    /// Duration of the flare.
    ///
    /// Units: seconds
    pub flare_time_period_s: f64,

    /// Highest peak acceleration the flare may ask of the rotor, as a
    /// multiple of gravity.
    pub flare_accel_max_g: f64,

    /// Collective trim filter cut off during the flare.
    ///
    /// Units: Hz
    pub col_flare_cutoff_hz: f64,

    /// Proportional gain on vertical velocity tracking error.
    pub flare_z_vel_p: f64,

    /// Proportional gain on forward velocity tracking error.
    pub flare_fwd_vel_p: f64,

    /// Proportional gain on acceleration magnitude error.
    pub flare_col_p: f64,

    /// Proportional gain on pitch angle error.
    pub flare_pitch_p: f64,

    /// Pitch trim filter cut off during the flare.
    ///
    /// Units: Hz
    pub flare_pitch_cutoff_hz: f64,

    /// Proportional gain on altitude tracking error.
    pub z_pos_p: f64,

    /// Cut off reserved for a following trim on the flare altitude
    /// correction. The correction is proportional only, so this is read but
    /// not applied.
    ///
    /// Units: Hz
    pub pos_cutoff_hz: f64,

    /// Largest pitch angle the controller may command. Zero uses the attitude
    /// controller's lean angle limit.
    ///
    /// Units: degrees
    pub angle_max_deg: f64,

    // ---- TOUCH DOWN ----
    /// Descent rate targeted at touch down.
    ///
    /// Units: meters/second
    pub td_vel_z_ms: f64,

    /// Altitude at which the flare ends and the touch down phase begins.
    ///
    /// Units: meters
    pub td_alt_targ_m: f64,

    // ---- BAIL OUT ----
    /// Time over which the bail out recovers to the pilot's climb rate.
    ///
    /// Units: seconds
    pub bail_time_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            enable: false,
            rpm_instance: 0,
            log_bitmask: 0,
            hs_p: 0.7,
            hs_set_point_rpm: 1500.0,
            col_entry_cutoff_hz: 0.7,
            col_glide_cutoff_hz: 0.1,
            target_gnd_speed_ms: 11.0,
            fwd_accel_max_mss: 0.6,
            fwd_vel_p: 1.0,
            fwd_vel_ff: 0.15,
            flare_time_period_s: 4.5,
            flare_accel_max_g: 2.0,
            col_flare_cutoff_hz: 0.5,
            flare_z_vel_p: 0.2,
            flare_fwd_vel_p: 0.2,
            flare_col_p: 0.2,
            flare_pitch_p: 3.0,
            flare_pitch_cutoff_hz: 500.0,
            z_pos_p: 0.5,
            pos_cutoff_hz: 0.001,
            angle_max_deg: 0.0,
            td_vel_z_ms: 0.5,
            td_alt_targ_m: 0.5,
            bail_time_s: 2.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let params: Params = util::params::from_str(
            "enable = true\nhs_set_point_rpm = 1800.0\n",
        )
        .unwrap();

        assert!(params.enable);
        assert_eq!(params.hs_set_point_rpm, 1800.0);
        assert_eq!(params.flare_time_period_s, 4.5);
        assert_eq!(params.rpm_instance, 0);
    }

    #[test]
    fn test_stock_file() {
        let params: Params =
            util::params::from_str(include_str!("../../../params/arot_ctrl.toml")).unwrap();

        assert!(params.enable);
        assert_eq!(params.log_bitmask, 3);
        assert_eq!(params.bail_time_s, Params::default().bail_time_s);
    }
}
