//! Ruuvi Gateway simulator
//!
//! Produces RuuviTag data format 5 advertisements from simulated readings and
//! publishes them as Ruuvi Gateway MQTT messages.

pub mod config;
pub mod gateway;
pub mod models;
pub mod mqtt;
pub mod sensor;
pub mod simulator;
pub mod utils;
