//! Model backends for Waypost.
//!
//! All backends implement the `waypost_core::Provider` trait.
//! The router selects the correct backend based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
