//! Fan control law.
//!
//! Pure functions of the worst readings; no state beyond the immutable
//! curve configuration. Change detection and the actual PWM write live in
//! [`crate::drivers::fan`].

pub mod curve;

pub use curve::ActuatorCurve;
