//! Footprint - self-hosted visitor analytics for a personal portfolio
//!
//! This library provides the tracking recorder, the ingestion and
//! aggregation HTTP API, and the admin dashboard.
//!
//! # Architecture
//! - `client`: Visitor identity, fingerprinting, recorder and dashboard
//! - `storage`: SeaORM storage backend and domain models
//! - `analytics`: Aggregation functions shared by server and dashboard
//! - `services`: Ingestion and analytics services
//! - `api`: HTTP services and middleware
//! - `interfaces`: CLI commands
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod analytics;
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
