//! These models represent the objects passed around by the bridge
//!
//! There are three different formats we need to interact with:
//! - invocation requests, sent from the client to the gateway
//! - agent engine messages, emitted by the engine as loosely typed JSON
//! - content block events, streamed from the gateway back to the client
//!
//! Inbound and outbound shapes are modelled directly with serde. Engine messages are
//! classified once, at the boundary, into [`agent::AgentMessage`] so nothing past that
//! point has to inspect raw JSON.
pub mod agent;
pub mod event;
pub mod request;
pub mod role;
