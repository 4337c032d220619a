//! Shared diagnostic state: hardware health counters and activity flags,
//! written by the producer and read by the snapshot generator and external
//! telemetry.

use core::cell::RefCell;

use bytemuck::{Pod, Zeroable};
use defmt::Format;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Prefixed on every diagnostic snapshot payload, little endian.
pub const SNAPSHOT_MAGIC: u32 = 0x1122_3344;
/// Bytes the magic marker occupies at the start of a snapshot.
pub const SNAPSHOT_HEADER_SIZE: usize = 4;

/// The diagnostic structure as it goes over the wire. `repr(C)` with an
/// explicit reserved byte so the layout has no padding and decodes the same
/// on the host side. Booleans are a `u8` of known size for the same reason.
#[repr(C)]
#[derive(Format, Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct StatusFields {
    /// Activity seen on the ADC lines, updated occasionally.
    pub activity_wordclk: u8,
    pub activity_bitclk: u8,
    pub activity_data: u8,
    pub reserved: u8,
    /// Samples dropped because the right channel arrived first.
    pub out_of_sync_drops: u32,
    /// Right-channel words that never arrived within the spin budget.
    pub right_timeout_count: u32,
    /// Spin count observed when the last right-channel timeout hit.
    pub right_timeout_spins: u32,
    /// Whole-slot receive timeouts in the fill loop.
    pub rx_sample_timeouts: u32,
}

impl StatusFields {
    pub const ZEROED: StatusFields = StatusFields {
        activity_wordclk: 0,
        activity_bitclk: 0,
        activity_data: 0,
        reserved: 0,
        out_of_sync_drops: 0,
        right_timeout_count: 0,
        right_timeout_spins: 0,
        rx_sample_timeouts: 0,
    };
}

pub fn bool_u8(value: bool) -> u8 {
    if value { 1 } else { 0 }
}

/// Lock-guarded access to [`StatusFields`]. The guard never escapes the
/// closure, and callers keep the closure bounded (no waiting inside).
pub struct StatusHandle<M: RawMutex> {
    inner: Mutex<M, RefCell<StatusFields>>,
}

impl<M: RawMutex> StatusHandle<M> {
    pub const fn new() -> Self {
        StatusHandle {
            inner: Mutex::new(RefCell::new(StatusFields::ZEROED)),
        }
    }

    pub fn lock<R>(&self, f: impl FnOnce(&mut StatusFields) -> R) -> R {
        self.inner.lock(|fields| f(&mut fields.borrow_mut()))
    }

    /// Copy of the current fields, for telemetry embedding.
    pub fn snapshot(&self) -> StatusFields {
        self.lock(|fields| *fields)
    }
}

impl<M: RawMutex> Default for StatusHandle<M> {
    fn default() -> Self {
        Self::new()
    }
}
