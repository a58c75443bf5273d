//! equipviz, a terminal dashboard client for the Chemical Equipment
//! Visualizer analytics API.
//!
//! The library holds everything except argument parsing: the typed API
//! client, the dashboard state machine, rendering, configuration and the
//! activity log. The `equipviz` binary is a thin clap front end over it.

pub mod activity;
pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod render;
