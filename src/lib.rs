//! Story Ingest — turns raw chat transcripts and story scripts into
//! classified, scored chat stories.
//!
//! Text goes through a fixed pipeline: line parsing, per-message signal
//! detection, optional sender anonymization, story assembly, and viral
//! scoring. All heuristics are driven by ordered lookup tables that can be
//! overridden from RON.

pub mod core;
pub mod schema;
