//! Event orchestration core for a trading signal pipeline.
//!
//! Producers emit named events with JSON payloads. Each emission is checked
//! against a typed [`domain::EventRegistry`], admitted by a per-type
//! fixed-window rate limiter, and placed in a bounded priority queue that
//! evicts low-priority work under overload. A single engine task dispatches
//! the queue to subscribers, runs periodic health checks and keeps metrics.
//!
//! # Modules
//!
//! - [`domain`] - event definitions, payload schemas, validation, ids
//! - [`runtime`] - queue, rate limiter, timed operations, metrics, health probes
//! - [`app`] - the [`app::Orchestrator`] handle and its engine task
//! - [`config`] - TOML configuration and logging setup
//! - [`error`] - error types
//! - [`cli`] - command-line entry points

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod runtime;
