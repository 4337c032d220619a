//! Frame layout of the isochronous audio payload.
//!
//! One buffer is slightly more than 1 ms of audio (64 samples at 46-48 kHz)
//! but less than 2 ms. The host polls at 1 ms, so it always drains buffers a
//! little faster than the producer fills them and the pool never overflows.

/// Sample slots per frame buffer.
pub const SAMPLES_PER_BUFFER: usize = 64;
/// Bytes per channel sample (24-bit PCM).
pub const BYTES_PER_SAMPLE: usize = 3;
/// Channels per slot: left, right, head switch.
pub const CHANNEL_COUNT: usize = 3;
/// Bytes of one interleaved sample slot.
pub const SLOT_SIZE: usize = CHANNEL_COUNT * BYTES_PER_SAMPLE;
/// Total payload bytes of one frame buffer.
pub const PAYLOAD_SIZE: usize = SAMPLES_PER_BUFFER * SLOT_SIZE;

/// Positive full scale of a 24-bit two's-complement PCM value.
pub const PCM24_MAX: u32 = 0x007f_ffff;
/// Negative full scale of a 24-bit two's-complement PCM value.
pub const PCM24_MIN: u32 = 0x0080_0000;

/// One fixed-capacity frame buffer, exclusively owned at any instant and
/// handed whole between producer and consumer.
pub struct FrameBuffer {
    pub data: [u8; PAYLOAD_SIZE],
}

impl FrameBuffer {
    pub const ZEROED: FrameBuffer = FrameBuffer {
        data: [0; PAYLOAD_SIZE],
    };
}

/// Encodes the low 24 bits of `value` into `dst[0..3]`, USB byte order
/// (little endian, LSB first).
pub fn pcm24_to_le(dst: &mut [u8], value: u32) {
    dst[0] = value as u8;
    dst[1] = (value >> 8) as u8;
    dst[2] = (value >> 16) as u8;
}

/// Maps the binary head-switch level onto the synthetic third channel:
/// logical high is positive full scale, logical low is negative full scale.
pub fn switch_level_to_pcm24(level: bool) -> u32 {
    if level { PCM24_MAX } else { PCM24_MIN }
}
