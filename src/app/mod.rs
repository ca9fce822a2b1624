//! Application layer: collaborator ports, controller events and the
//! receiver loop.
//!
//! Everything here is host-agnostic. Concrete implementations of the
//! ports live in [`crate::adapters`].

pub mod events;
pub mod ports;
pub mod responder;
