//! Channel bank built from one [`LinkOpener`] per endpoint slot.
//!
//! A slot whose device is missing at startup, or whose link fails later,
//! goes offline and is reopened the next time it is selected. An absent
//! or unplugged endpoint therefore only ever costs missed polls; the
//! other slots keep working.

use core::fmt;
use core::time::Duration;

use log::{debug, info, warn};

use crate::link::{Link, LinkOpener};

use super::channels::ChannelBank;

/// Why a [`LinkBank`] operation failed.
#[derive(Debug)]
pub enum BankError<O, L> {
    NoSuchChannel(usize),
    /// No channel selected yet.
    NotListening,
    /// The selected slot lost its link since it was selected.
    Offline,
    Open(O),
    Io(L),
}

impl<O: fmt::Display, L: fmt::Display> fmt::Display for BankError<O, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchChannel(i) => write!(f, "no channel {i}"),
            Self::NotListening => f.write_str("no channel selected"),
            Self::Offline => f.write_str("channel offline"),
            Self::Open(e) => write!(f, "open failed: {e}"),
            Self::Io(e) => write!(f, "transfer failed: {e}"),
        }
    }
}

type ErrorOf<O> = BankError<<O as LinkOpener>::Error, <<O as LinkOpener>::Link as Link>::Error>;

struct Slot<O: LinkOpener> {
    opener: O,
    link: Option<O::Link>,
    /// Consecutive failed opens. Only the first is logged at `warn`.
    open_failures: u32,
}

impl<O: LinkOpener> Slot<O> {
    fn ensure_open(&mut self) -> Result<(), O::Error> {
        if self.link.is_some() {
            return Ok(());
        }
        match self.opener.open() {
            Ok(link) => {
                if self.open_failures > 0 {
                    info!("POLL: {} is back", self.opener.describe());
                }
                self.open_failures = 0;
                self.link = Some(link);
                Ok(())
            }
            Err(e) => {
                if self.open_failures == 0 {
                    warn!("POLL: cannot open {}: {}", self.opener.describe(), e);
                } else {
                    debug!("POLL: {} still absent: {}", self.opener.describe(), e);
                }
                self.open_failures = self.open_failures.saturating_add(1);
                Err(e)
            }
        }
    }

    fn close(&mut self, what: &str, error: &impl fmt::Display) {
        warn!(
            "POLL: {} on {} failed: {}, closing",
            what,
            self.opener.describe(),
            error
        );
        self.link = None;
    }
}

/// [`ChannelBank`] over per-slot links that reopen on demand.
pub struct LinkBank<O: LinkOpener> {
    slots: Vec<Slot<O>>,
    active: Option<usize>,
}

impl<O: LinkOpener> LinkBank<O> {
    /// Try to open every slot once. Slots that fail stay offline until
    /// they are selected.
    pub fn new(openers: impl IntoIterator<Item = O>) -> Self {
        let mut slots: Vec<Slot<O>> = openers
            .into_iter()
            .map(|opener| Slot {
                opener,
                link: None,
                open_failures: 0,
            })
            .collect();
        for slot in &mut slots {
            slot.ensure_open().ok();
        }
        Self {
            slots,
            active: None,
        }
    }

    /// Slots that currently hold an open link.
    pub fn online(&self) -> usize {
        self.slots.iter().filter(|s| s.link.is_some()).count()
    }

    pub fn is_online(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.link.is_some())
    }

    pub fn opener(&self, index: usize) -> Option<&O> {
        self.slots.get(index).map(|s| &s.opener)
    }

    fn active_slot(&mut self) -> Result<&mut Slot<O>, ErrorOf<O>> {
        let index = self.active.ok_or(BankError::NotListening)?;
        self.slots
            .get_mut(index)
            .ok_or(BankError::NoSuchChannel(index))
    }
}

impl<O: LinkOpener> ChannelBank for LinkBank<O> {
    type Error = ErrorOf<O>;

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn listen(&mut self, index: usize) -> Result<(), Self::Error> {
        if index >= self.slots.len() {
            return Err(BankError::NoSuchChannel(index));
        }
        self.active = None;
        for slot in &mut self.slots {
            let failed = match slot.link.as_mut() {
                Some(link) => link.discard_buffers().err(),
                None => None,
            };
            if let Some(e) = failed {
                slot.close("discard", &e);
            }
        }
        self.slots[index].ensure_open().map_err(BankError::Open)?;
        self.active = Some(index);
        Ok(())
    }

    /// A slot that failed since it was selected reads as empty.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let slot = self.active_slot()?;
        let Some(link) = slot.link.as_mut() else {
            return Ok(None);
        };
        let mut byte = [0u8; 1];
        let result = link.read(&mut byte, Duration::ZERO);
        match result {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) => {
                slot.close("read", &e);
                Err(BankError::Io(e))
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let slot = self.active_slot()?;
        let link = slot.link.as_mut().ok_or(BankError::Offline)?;
        let result = link.write_all(data);
        result.map_err(|e| {
            slot.close("write", &e);
            BankError::Io(e)
        })
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let slot = self.active_slot()?;
        let link = slot.link.as_mut().ok_or(BankError::Offline)?;
        let result = link.flush();
        result.map_err(|e| {
            slot.close("flush", &e);
            BankError::Io(e)
        })
    }
}
