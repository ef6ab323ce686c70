//! services/notification/src/lib.rs
//!
//! The device-registration side of the GuardianCare notification service.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
