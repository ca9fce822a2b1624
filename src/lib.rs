//! FanLink library.
//!
//! Both ends of a newline-framed POLL/response protocol over plain serial
//! lines: the receiver that answers with local temperatures and the
//! controller that polls up to four receivers and drives a PWM fan from
//! the worst readings.
//!
//! Pure logic lives behind port traits; OS bindings are in [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod link;
pub mod poller;
pub mod protocol;

pub use error::{Error, Result};
