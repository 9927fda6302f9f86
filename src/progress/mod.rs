//! Per-user progress through a module.
//!
//! A learner starts a module once, moves through its sections, and
//! eventually completes it:
//!
//! ```text
//! start ──► in_progress (section 0) ──advance(n)──► … ──complete──► completed
//!   │
//!   └─ second start for the same (user, module) → AlreadyStarted
//! ```

pub mod tracker;

pub use tracker::{ProgressError, ProgressTracker};
