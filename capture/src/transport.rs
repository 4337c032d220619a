//! The consumer side: a state machine serving isochronous transfers from
//! filled buffers. It runs on the host's polling schedule and must never
//! wait; when no filled buffer is available it reports zero bytes and the
//! host hears silence instead of a stall.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::format::PAYLOAD_SIZE;
use crate::mode::{ModeHandle, StreamMode};
use crate::pool::{BufferHandle, BufferPool};

enum State<'b> {
    /// Not currently holding a filled buffer.
    NoBuffer,
    /// Serving bytes from a held buffer, `offset` bytes already consumed.
    Draining { buffer: BufferHandle<'b>, offset: usize },
}

pub struct StreamTransport<'p, 'b, M: RawMutex> {
    pool: &'p BufferPool<'b, M>,
    mode: &'p ModeHandle<M>,
    state: State<'b>,
}

impl<'p, 'b, M: RawMutex> StreamTransport<'p, 'b, M> {
    pub fn new(pool: &'p BufferPool<'b, M>, mode: &'p ModeHandle<M>) -> Self {
        StreamTransport {
            pool,
            mode,
            state: State::NoBuffer,
        }
    }

    /// Called before each outgoing transfer. Returns the bytes available to
    /// send right now; an empty slice when the pool is starved.
    pub fn pre_transfer(&mut self) -> &[u8] {
        if matches!(self.state, State::NoBuffer) {
            if let Some(buffer) = self.pool.try_take_filled() {
                self.state = State::Draining { buffer, offset: 0 };
            }
        }

        match &self.state {
            State::NoBuffer => &[],
            State::Draining { buffer, offset } => &buffer.data[*offset..],
        }
    }

    /// Called after each transfer with the number of bytes the host actually
    /// consumed. A fully drained buffer goes back to the empty queue and the
    /// next filled one is picked up immediately, so the following
    /// `pre_transfer` sees no extra gap.
    pub fn post_transfer(&mut self, consumed: usize) {
        match core::mem::replace(&mut self.state, State::NoBuffer) {
            State::NoBuffer => {}
            State::Draining { buffer, offset } => {
                let offset = offset + consumed;
                if offset < PAYLOAD_SIZE {
                    self.state = State::Draining { buffer, offset };
                    return;
                }

                // cannot fail, the empty queue has room for every handle
                let _ = self.pool.try_put_empty(buffer);

                if let Some(buffer) = self.pool.try_take_filled() {
                    self.state = State::Draining { buffer, offset: 0 };
                }
            }
        }
    }

    /// Mode-change request from the control protocol. Forwards to the mode
    /// controller, transport state is untouched.
    pub fn set_mode(&self, mode: StreamMode) {
        self.mode.set(mode);
    }
}
