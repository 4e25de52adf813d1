//! # Telemetry archive
//!
//! [`ArchiveTelemetry`] writes each kind of [`TelemetryRecord`] to its own CSV file in the
//! session's archive directory, named after the record (e.g. `arot_ctrl/flare_check.csv`). Files
//! are created when the first record of their kind arrives.
//!
//! Telemetry is best effort. A file which cannot be created or written is reported as a warning
//! and its records are dropped, control is never affected.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use log::warn;
use util::{archive::Archiver, session::Session};

use crate::{arot_ctrl::TelemetryRecord, vehicle::Telemetry};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Directory within the session's archive root the records are written to.
const ARCHIVE_DIR: &str = "arot_ctrl";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry sink writing records to CSV archives.
pub struct ArchiveTelemetry {
    session: Session,
    archivers: HashMap<&'static str, Archiver>,
    num_write_errors: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArchiveTelemetry {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            archivers: HashMap::new(),
            num_write_errors: 0,
        }
    }

    /// Number of records which could not be written.
    pub fn num_write_errors(&self) -> u64 {
        self.num_write_errors
    }

    /// Get the archiver for the given record kind, opening it if this is the first record.
    fn archiver(&mut self, name: &'static str) -> &mut Archiver {
        let session = &self.session;

        self.archivers.entry(name).or_insert_with(|| {
            let path = format!("{}/{}.csv", ARCHIVE_DIR, name);
            match Archiver::from_path(session, &path) {
                Ok(a) => a,
                Err(e) => {
                    warn!("Could not open the {} archive, records will be dropped: {}", path, e);
                    Archiver::default()
                }
            }
        })
    }
}

impl Telemetry for ArchiveTelemetry {
    fn write_record(&mut self, record: TelemetryRecord) {
        let name = record.name();
        let arch = self.archiver(name);

        let result = match record {
            TelemetryRecord::GlideTuning(r) => arch.serialise(r),
            TelemetryRecord::FlareTuning(r) => arch.serialise(r),
            TelemetryRecord::Trajectory(r) => arch.serialise(r),
            TelemetryRecord::FlareCheck(r) => arch.serialise(r),
            TelemetryRecord::FlareAttitude(r) => arch.serialise(r),
            TelemetryRecord::FlareAccel(r) => arch.serialise(r),
            TelemetryRecord::FlareTracking(r) => arch.serialise(r),
            TelemetryRecord::Collective(r) => arch.serialise(r),
        };

        if let Err(e) = result {
            // Only the first failure is reported to avoid flooding the log at the cycle rate
            if self.num_write_errors == 0 {
                warn!("Could not write {} record: {}", name, e);
            }
            self.num_write_errors += 1;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
