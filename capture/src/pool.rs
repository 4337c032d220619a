//! The buffer pool: two bounded FIFO queues moving frame buffers between the
//! sampling producer and the USB consumer.
//!
//! The pool is the only synchronization surface between the two cores. Every
//! buffer handle is at any instant in exactly one place: the empty queue, the
//! filled queue, held by the producer, or held by the consumer. Both queues
//! hold the full buffer count, so a `put` into either queue can never find it
//! full while that invariant holds.

use core::ops::{Deref, DerefMut};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::format::FrameBuffer;

/// Number of frame buffers in the pool.
pub const FIFO_SPACE: usize = 8;

/// Move-only handle to one frame buffer. Only the pool creates these, so a
/// buffer can never be referenced by two owners at once.
pub struct BufferHandle<'b> {
    buffer: &'b mut FrameBuffer,
}

impl<'b> Deref for BufferHandle<'b> {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        self.buffer
    }
}

impl<'b> DerefMut for BufferHandle<'b> {
    fn deref_mut(&mut self) -> &mut FrameBuffer {
        self.buffer
    }
}

pub struct BufferPool<'b, M: RawMutex> {
    empty: Channel<M, BufferHandle<'b>, FIFO_SPACE>,
    filled: Channel<M, BufferHandle<'b>, FIFO_SPACE>,
}

impl<'b, M: RawMutex> BufferPool<'b, M> {
    /// Creates the pool over a fixed arena and seeds the empty queue with
    /// every buffer.
    pub fn new(buffers: &'b mut [FrameBuffer; FIFO_SPACE]) -> Self {
        let pool = BufferPool {
            empty: Channel::new(),
            filled: Channel::new(),
        };

        for buffer in buffers.iter_mut() {
            // cannot fail, the queue has room for the whole arena
            let _ = pool.empty.try_send(BufferHandle { buffer });
        }

        pool
    }

    /// Waits for an empty buffer, FIFO order. The producer's only blocking
    /// point.
    pub async fn take_empty(&self) -> BufferHandle<'b> {
        self.empty.receive().await
    }

    /// Waits for a filled buffer, FIFO order.
    pub async fn take_filled(&self) -> BufferHandle<'b> {
        self.filled.receive().await
    }

    pub fn try_take_empty(&self) -> Option<BufferHandle<'b>> {
        self.empty.try_receive().ok()
    }

    pub fn try_take_filled(&self) -> Option<BufferHandle<'b>> {
        self.filled.try_receive().ok()
    }

    pub async fn put_empty(&self, handle: BufferHandle<'b>) {
        self.empty.send(handle).await
    }

    pub async fn put_filled(&self, handle: BufferHandle<'b>) {
        self.filled.send(handle).await
    }

    /// Non-blocking insert; fails only if the queue is full, which the pool
    /// invariant rules out.
    pub fn try_put_empty(&self, handle: BufferHandle<'b>) -> Result<(), BufferHandle<'b>> {
        self.empty.try_send(handle).map_err(|TrySendError::Full(h)| h)
    }

    pub fn try_put_filled(&self, handle: BufferHandle<'b>) -> Result<(), BufferHandle<'b>> {
        self.filled.try_send(handle).map_err(|TrySendError::Full(h)| h)
    }

    /// Handles currently queued (not held by either side).
    pub fn queued(&self) -> usize {
        self.empty.len() + self.filled.len()
    }
}
