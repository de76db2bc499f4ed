//! Shared types for the lucky draw server.
//!
//! `objects` holds the JSON request/response and notification payloads;
//! `signature` holds the HMAC body-signing scheme used between the server
//! and the chat gateway. With the `client` feature, `client` provides typed
//! HTTP clients for both APIs.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
