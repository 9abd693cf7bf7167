//! Reset a Kubernetes Namespace stuck in Terminating back to Active by editing
//! its record in etcd directly.

pub mod command;
pub mod config;
pub mod recover;
pub mod report;
pub mod store;
pub mod telemetry;
