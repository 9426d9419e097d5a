//! Concurrency-control analysis of transaction schedules.
//!
//! A schedule is a sequence of operations such as `R1(X) W2(X) C1 A2`
//! (read, write, commit, abort, tagged with a transaction number).
//! `schedcheck_core` answers four questions about it:
//!
//! 1. **Conflict serializability** -- [`conflict::detect_conflicts`] finds
//!    every conflicting pair, [`conflict::build_precedence_graph`] merges
//!    them per transaction pair and reports the first cycle found.
//! 2. **Two-phase locking** -- [`locking::analyze_two_phase_locking`]
//!    replays each transaction against the whole schedule and judges basic,
//!    strict, rigorous and (approximately) conservative 2PL.
//! 3. **Recoverability** -- [`recoverability::check_recoverability`] finds
//!    dirty reads and decides recoverable / cascadeless.
//! 4. **Lock-based execution** -- [`simulation::LockManager`] steps the
//!    schedule through a strict-2PL lock manager with a waiting queue and
//!    flags two-transaction deadlocks.
//!
//! # Entry point
//!
//! [`analyze()`] runs 1-3 on parsed operations. Text is parsed by the
//! separate `schedcheck_parser` crate.
//!
//! ```rust,ignore
//! use schedcheck_core::analyze;
//!
//! let analysis = analyze(operations);
//! if !analysis.is_serializable() {
//!     println!("{}", schedcheck_core::conflict::describe_cycle(&analysis.precedence_graph));
//! }
//! ```
//!
//! # Crate features
//!
//! - **`serde`** -- `Serialize`/`Deserialize` on all model and report types.
//! - **`schemars`** -- `JsonSchema` on the same types.
//!
//! This crate is `no_std` compatible (requires `alloc`).

#![cfg_attr(not(any(test, feature = "schemars")), no_std)]
extern crate alloc;

pub mod advisor;
pub mod analysis;
pub mod conflict;
pub mod graph;
pub mod locking;
pub mod recoverability;
pub mod schedule;
pub mod simulation;

pub use analysis::{analyze, ScheduleAnalysis};
pub use schedule::{Action, Operation, OperationKind, TransactionId};
pub use simulation::LockManager;
