//! Actor driving the periodic collection loop
//!
//! A single [`scheduler::SchedulerActor`] runs as its own task and triggers one
//! collection round per tick. It is controlled through a cloneable
//! [`scheduler::SchedulerHandle`] over an mpsc command channel:
//!
//! ```text
//!   SchedulerHandle ── MonitorCommand ──→ SchedulerActor ── tick ──→ RoundRunner::run_round
//!         ↑                                     │
//!         └──────── oneshot (RoundSummary) ─────┘
//! ```
//!
//! Commands are handled between rounds, so `Shutdown` lets an in-flight round
//! finish before the actor exits.

pub mod messages;
pub mod scheduler;
