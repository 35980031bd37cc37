//! Experiment orchestration harness for an external RL train/test script.
//!
//! Every (experiment kind, adversary, seed) triple is a *unit*: a short,
//! strictly ordered chain of script invocations writing into a private
//! working directory. The crate is split the same way as the work:
//!
//! - **[`core`]**: Pure planning logic (validation, paths, command lines).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, process execution,
//!   filesystem). Isolated behind the [`io::launcher::Launcher`] trait.
//!
//! Orchestration modules ([`unit`], [`fanout`], [`driver`]) run units on a
//! bounded [`pool::WorkerPool`] and collect a [`report::RunReport`].

pub mod core;
pub mod driver;
pub mod exit_codes;
pub mod fanout;
pub mod io;
pub mod logging;
pub mod pool;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod unit;
