//! Provider clients.
//!
//! One [`ProviderClient`] per configured backend; the orchestrator sees them
//! through the [`ChatProvider`] trait. Implementation details are split into
//! submodules under `src/client/`.

pub mod builder;
pub mod core;
pub(crate) mod error_classification;
mod execution;
pub mod policy;

pub use builder::ProviderClientBuilder;
pub use core::{ChatProvider, ProviderClient, SendOptions};
pub use policy::{Decision, RetryPolicy};
