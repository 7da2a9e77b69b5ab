//! Core module - moving averages, cache, touch detection, universe, scheduler, audit
//!
//! This module uses explicit re-exports instead of glob exports to provide
//! better API visibility and prevent accidental public API changes.

pub mod audit;
pub mod cache;
pub mod ma;
pub mod scheduler;
pub mod touch;
pub mod universe;

// Explicit re-exports for the moving-average pipeline
pub use cache::{MaCache, MaKey};
pub use ma::moving_average;
pub use touch::{evaluate, TouchEvent};

// Explicit re-exports for the watch list
pub use universe::UniverseResolver;

// Explicit re-exports for the polling loop
pub use scheduler::{polling_task, run_cycle, CycleBackoff, CycleStats};

// Explicit re-exports for the audit trail
pub use audit::AuditLog;
