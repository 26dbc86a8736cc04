//! Session state store for Waypost.

pub mod store;

pub use store::{SessionStore, StoreStats};
