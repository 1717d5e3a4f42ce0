//! Bizpulse - periodic business-health monitor for an admin/seller dashboard.
//!
//! # Overview
//!
//! Two stateless batch jobs scan the dashboard's operational data and fan
//! out notifications to the right audience:
//!
//! - **Stock check**: active products that are out of stock or low on stock
//!   are reported to every active admin.
//! - **Visit check**: clients whose last completed visit is a multiple of 30
//!   days ago are reported to their seller; multiples of 90 days are also
//!   escalated to every active admin.
//!
//! Each job is triggered by an external scheduler, once per day. The engine
//! keeps no state between runs, so re-running a job may repeat notifications.
//!
//! # Modules
//!
//! - [`model`]: Entities, notification requests and job responses
//! - [`data_sources`]: Reader/sink traits and the REST backend
//! - [`storage`]: SQLite backend
//! - [`monitor`]: Stock and visit monitors, dispatch, run controller
//! - [`api`]: HTTP API handlers
//! - [`config`]: Startup configuration
//! - [`error`]: Error types

pub mod api;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod model;
pub mod monitor;
pub mod storage;
