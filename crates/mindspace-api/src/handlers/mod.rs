//! HTTP handlers for mindspace-api.

pub mod auth;
pub mod health;
pub mod notes;
pub mod tags;
