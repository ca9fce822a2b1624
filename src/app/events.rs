//! Outbound controller events.
//!
//! The [`EndpointPoller`](crate::poller::EndpointPoller) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them.

use crate::config::MAX_ENDPOINTS;
use crate::error::CodecError;
use crate::poller::endpoints::{Endpoint, StatusList};
use crate::protocol::Readings;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// An endpoint answered with valid readings.
    EndpointUpdated { index: usize, readings: Readings },

    /// An endpoint crossed the missed-poll threshold. Its last readings
    /// stay in use.
    EndpointDisconnected {
        index: usize,
        missed: u32,
        last: Option<Readings>,
    },

    /// An endpoint answered with something that is not a reading payload.
    MalformedReply { index: usize, error: CodecError },

    /// The applied fan duty changed.
    FanChanged(FanReport),

    /// Every endpoint was polled once.
    CycleComplete(CycleSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FanReport {
    pub duty: u8,
    pub percent: u8,
    /// Worst (CPU, NVMe) readings the duty was derived from.
    pub worst: Option<(f32, f32)>,
    pub statuses: StatusList,
    /// Last tachometer sample.
    pub rpm: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub endpoints: heapless::Vec<Endpoint, MAX_ENDPOINTS>,
    pub rpm: Option<u32>,
}
