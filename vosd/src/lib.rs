//! # vOS Demo Daemon
//!
//! Boots a simulated kernel on the host, registers a small stock workload and
//! narrates what the scheduler does with it.
//!
//! ## Responsibilities
//!
//! - Parses the command line into a [`DemoConfig`]
//! - Registers the stock tasks and shows duplicate-name rejection
//! - Boots the kernel and reports timer status at a fixed interval
//! - Adjusts a task's period mid-run to show live reconfiguration
//! - Prints final statistics, optionally as JSON
//!
//! ## Non-Responsibilities
//!
//! The daemon does NOT read from stdin, load drivers or expose a shell.

pub mod cli;
pub mod runtime;
pub mod workload;

pub use cli::{parse_args, usage, CliCommand};
pub use runtime::{DemoConfig, DemoError, DemoRuntime};
