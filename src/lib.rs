//! KUDE Server Library
//!
//! HTTP front for an external report tool that turns electronic invoice XML
//! into a PDF (the KUDE). The binary in main.rs wires configuration, logging
//! and the router together.
//!
//! # Modules
//!
//! - `report`: the generation pipeline around the external tool
//! - `routes`: HTTP surface
//! - `config`, `error`, `logging`, `state`: server plumbing

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod routes;
pub mod state;
