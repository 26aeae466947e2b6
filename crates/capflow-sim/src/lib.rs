//! capflow Sim - randomized simulator and scripted demos
//!
//! Backs the `capflow` binary:
//! - [`simulator`]: seeded random operations against many workflows, with
//!   invariant checks after every step
//! - [`demo`]: one scripted workflow per artifact kind, start to hand-off

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod demo;
pub mod simulator;

pub use demo::{run_demo, DemoReport};
pub use simulator::{run_simulator, SimulatorConfig, SimulatorReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
