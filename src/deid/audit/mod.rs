//! Audit trail for de-identification
//!
//! Records what was masked in each transcript and by which layer, without
//! ever writing the masked values themselves.

pub mod logger;

pub use logger::AuditLogger;
