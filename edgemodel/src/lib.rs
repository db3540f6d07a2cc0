//! EdgeModel - lifecycle management for ML model artifacts on edge devices
//!
//! This library retrieves model artifacts over the network, validates their
//! integrity and format, reasons about semantic versions and update
//! policies, and keeps a catalog of installed artifacts.
//!
//! # Modules
//!
//! - [`transfer`]: retrying, cancellable downloads with progress
//! - [`inspect`]: format detection, integrity checks, security scan
//! - [`version`]: semantic version comparison and update policy
//! - [`store`]: persistence of artifact records
//! - [`lifecycle`]: install, uninstall and update orchestration
//! - [`config`]: INI-backed user configuration
//! - [`logging`]: tracing subscriber setup for binaries

pub mod config;
pub mod inspect;
pub mod lifecycle;
pub mod logging;
pub mod store;
pub mod transfer;
pub mod version;
