//! # Autorotation library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access the items
//! defined inside the autorotation executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autorotation control engine - head speed, forward speed and flare regulators
pub mod arot_ctrl;

/// Autorotation mode - sequences the regulators through the phases of an autorotation
pub mod arot_mode;

/// Executable parameters
pub mod params;

/// Point mass rotorcraft simulation implementing every vehicle interface
pub mod sim;

/// Telemetry sink writing records to the session's CSV archives
pub mod tm_archive;

/// Vehicle interfaces - everything the controller reads from or demands of the host flight stack
pub mod vehicle;
