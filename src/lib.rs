//! # graph-intake
//!
//! Intake service for graph creation requests. A request is validated,
//! registered once under its normalized name with a conditional insert,
//! and handed to an external worker through a work queue.
//!
//! Postgres (graph table + pgmq) backs production; an in-memory backend
//! serves local development and tests.

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod intake;
pub mod model;
pub mod telemetry;
