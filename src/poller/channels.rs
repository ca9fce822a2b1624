//! Channel bank port.
//!
//! The controller has one channel per endpoint but only one of them may
//! be listening at any moment. Selecting a channel implicitly silences
//! every other one; reads and writes always go to the active channel.

/// A set of endpoint channels with a single active listener.
pub trait ChannelBank {
    type Error: core::fmt::Display;

    /// Number of channels (one per endpoint slot).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop listening on every channel, then start listening on `index`.
    fn listen(&mut self, index: usize) -> Result<(), Self::Error>;

    /// Next received byte on the active channel, `None` if none is ready.
    /// Never blocks.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Write to the active channel.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until everything written has left the active channel.
    fn flush(&mut self) -> Result<(), Self::Error>;
}
