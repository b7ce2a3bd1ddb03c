pub mod config;
pub mod error;
pub mod lcapi;
pub mod lcbot;
pub mod lcdb;
pub mod models;
pub mod stats;
