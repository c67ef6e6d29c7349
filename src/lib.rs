#![allow(clippy::doc_markdown)] // Allow technical terms like RabbitMQ, fetchAndLock in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Camunda Bridge
//!
//! Stateless bridge between Camunda external tasks and RabbitMQ.
//!
//! ## Overview
//!
//! One poller per configured topic fetches and locks external tasks, turns each
//! into a routed JSON message and publishes it to the topic's queue. A published
//! task keeps its engine lock: the downstream system that consumes the queue is
//! responsible for completing or failing it. If publishing fails, the task is
//! handed back to the engine with a reduced retry budget.
//!
//! The bridge holds no durable state. Lock ownership and retry counters live in
//! the engine; undelivered work lives in the broker.
//!
//! ## Module Organization
//!
//! - [`worker`] - Pollers, dispatcher, failure handler, monitor and supervisor
//! - [`camunda`] - Engine client trait and REST implementation
//! - [`messaging`] - Queue publisher trait, RabbitMQ and in-memory publishers
//! - [`routing`] - Topic to downstream-system table
//! - [`models`] - Engine and broker wire types
//! - [`config`] - TOML configuration with environment substitution
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Top-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use camunda_bridge::camunda::CamundaClient;
//! use camunda_bridge::config::ConfigLoader;
//! use camunda_bridge::messaging::RabbitMqQueuePublisher;
//! use camunda_bridge::worker::WorkerSupervisor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! let engine = Arc::new(CamundaClient::new(config.camunda.clone())?);
//! let publisher = Arc::new(RabbitMqQueuePublisher::new(config.rabbitmq.clone()));
//!
//! let supervisor = WorkerSupervisor::new(config, engine, publisher);
//! supervisor.initialize().await?;
//! supervisor.start().await?;
//! supervisor.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod camunda;
pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod routing;
pub mod worker;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use routing::RoutingTable;
pub use worker::{ShutdownReport, WorkerStatus, WorkerSupervisor};
