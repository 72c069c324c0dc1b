//! AI Provider Layer
//!
//! Adapters that talk to model providers, the throttle retry policy, and
//! the helpers that normalize provider output into result payloads.

pub mod normalize;
pub mod provider;

pub use provider::{
    AdapterRegistry, ChatAdapter, ProviderAdapter, ProviderOutput, ReplicateAdapter,
    SharedAdapter, ThrottlePolicy,
};
