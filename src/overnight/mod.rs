/*!
 * Unattended bulk translation runs.
 *
 * Overnight mode drains the translation backlog for a set of target
 * languages without supervision:
 * - `checkpoint`: Resumable progress persisted between runs
 * - `stats`: Aggregated run counters and the final report
 * - `runner`: The batch loop with interrupt handling and pacing
 */

pub mod checkpoint;
pub mod runner;
pub mod stats;

pub use checkpoint::ProgressCheckpoint;
pub use runner::{OvernightOptions, OvernightRunner};
pub use stats::RunStats;
