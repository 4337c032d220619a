//! Content mode selector: live audio or diagnostic snapshots.

use core::cell::Cell;

use defmt::Format;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// What the producer fills into the next buffer. Read once per fill attempt,
/// never mid-fill.
#[derive(Format, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// PCM data from the ADC plus the head-switch channel.
    Normal,
    /// Diagnostic snapshot payloads.
    Debug,
}

/// Lock-guarded mode cell. `get` and `set` acquire, act and release; the
/// lock is never held across anything that can block.
pub struct ModeHandle<M: RawMutex> {
    inner: Mutex<M, Cell<StreamMode>>,
}

impl<M: RawMutex> ModeHandle<M> {
    pub const fn new() -> Self {
        ModeHandle {
            inner: Mutex::new(Cell::new(StreamMode::Normal)),
        }
    }

    pub fn get(&self) -> StreamMode {
        self.inner.lock(|mode| mode.get())
    }

    pub fn set(&self, new_mode: StreamMode) {
        self.inner.lock(|mode| mode.set(new_mode));
    }
}

impl<M: RawMutex> Default for ModeHandle<M> {
    fn default() -> Self {
        Self::new()
    }
}
