//! Tool Gateway - orchestration and resilience core for atomic scientific tools
//!
//! This crate registers tools behind a uniform adapter interface and invokes
//! them through a single gateway that applies per-tool circuit breakers,
//! global and per-tool capacity ceilings, timeouts and cancellation, and
//! emits a correlated audit trail for every call. It also ranks tools for a
//! scientific context from their capabilities, schemas and live health.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
