//! These models represent the objects the bridge moves between its two sides
//!
//! There are three formats we need to interact with:
//! - GraphQL copilot requests and responses, exchanged with the chat client
//! - agent run requests, sent from the bridge to the agent backend
//! - agent stream events, streamed back from the agent backend
//!
//! Inbound client payloads are loosely typed and full of optional fields, so they are
//! parsed leniently: entries that do not fit are skipped rather than failing the request.
pub mod agent;
pub mod event;
pub mod graphql;
