//! Edit telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (Editor, Scheduler, selection).
//! It exists solely for observability and verification.
//!
//! # PRIVACY INVARIANT
//! Events carry operation kinds, counts and logical ticks only, never segment
//! coordinates or server messages.

pub mod event;
pub mod metrics;
pub mod recorder;
