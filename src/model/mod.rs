//! Wire-level data models for the signaling relay.

pub mod message;
