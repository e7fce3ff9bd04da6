//! Kernel tests against the simulated host platform.

mod helpers;
mod scenario;
