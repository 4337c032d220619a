#![cfg_attr(not(test), no_std)]

//! Core of the capture firmware: the bounded buffer exchange between the
//! sampling producer and the USB-driven consumer, the stereo sampling
//! protocol with desync/timeout recovery, the mode-switched buffer fill and
//! the non-blocking transport state machine.
//!
//! Everything hardware-specific sits behind [`sampler::AdcSource`] and
//! [`sampler::SwitchInput`], so this crate tests natively against scripted
//! sources.

pub mod acquire;
pub mod format;
pub mod mode;
pub mod pool;
pub mod sampler;
pub mod status;
pub mod transport;

pub use acquire::SampleAcquirer;
pub use format::FrameBuffer;
pub use mode::{ModeHandle, StreamMode};
pub use pool::{BufferHandle, BufferPool, FIFO_SPACE};
pub use sampler::{AdcLine, AdcSource, StereoReceiver, SwitchInput};
pub use status::{StatusFields, StatusHandle};
pub use transport::StreamTransport;
