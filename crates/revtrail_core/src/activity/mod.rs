//! Activity stream synthesis.
//!
//! # Responsibility
//! - Resolve the acting user of a revision.
//! - Probe domain objects for optional activity capabilities.
//! - Fold one change set into activities and ordered activity details.
//!
//! # Invariants
//! - Missing context and missing capabilities are silent no-ops.
//! - Any other entity failure propagates and aborts the unit of work.

pub mod identity;
pub mod probe;
pub mod synthesizer;
