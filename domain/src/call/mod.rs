//! Tool call subdomain: the inbound request the rest of the system reacts to.
//!
//! A [`ToolCall`](entities::ToolCall) is created once by the connection layer
//! and never mutated afterwards; every later stage borrows it.

pub mod entities;
pub mod value_objects;
