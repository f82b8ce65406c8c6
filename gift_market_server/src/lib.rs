//! # Gift market daemon
//!
//! Runs the background side of the gift market:
//! * the scheduled verification jobs, which confirm that listed items are in their sellers' inventories and that sold
//!   items reached their buyers;
//! * the event hooks, which verify a single order as soon as the market asks for it.
//!
//! ## Configuration
//! The daemon is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod integrations;
