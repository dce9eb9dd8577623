//! UBet — sports betting backend.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod db;
pub mod odds;
pub mod referrals;
pub mod settlement;
pub mod types;
