//! Shared records and wire types for the secret friend service.
//!
//! `models` holds the domain records passed between the store, the draw
//! engine and the HTTP layer. `api` holds request/response bodies, which keep
//! the Spanish field names the web client already speaks.

pub mod api;
pub mod models;
