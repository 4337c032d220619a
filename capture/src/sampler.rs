//! Bit-level stereo sampling protocol.
//!
//! The ADC front-end delivers 25-bit words: bit 24 tags the channel (0 =
//! left, 1 = right), bits 23..0 are the sample. Left must arrive first; a
//! right-tagged word at the start of a slot means the receiver lost channel
//! sync and the whole buffer attempt is restarted by the caller.

use defmt::Format;

use crate::format::pcm24_to_le;

/// Set on a raw word when it carries the right channel.
pub const RIGHT_CHANNEL_TAG: u32 = 0x0100_0000;

/// Default spin budget. The exact value does not matter, it just has to be
/// several multiples of the slowest expected inter-sample interval (measured
/// spins until the next word are around 150 at 46 kHz).
pub const DEFAULT_SPIN_BUDGET: u32 = 0x1_0000;

/// ADC lines monitored by the activity probes.
#[derive(Format, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcLine {
    WordClock,
    BitClock,
    Data,
}

/// Hardware source of channel-tagged raw words.
pub trait AdcSource {
    /// Non-blocking pull of the next word from the receive fifo.
    fn try_pull_word(&mut self) -> Option<u32>;

    /// Waits, within a bounded spin budget, for a falling-then-rising edge
    /// on `line`. May take a couple of ms; never call this under a lock.
    fn probe_activity(&mut self, line: AdcLine) -> bool;
}

/// Binary digital input sampled once per audio slot into the synthetic
/// third channel.
pub trait SwitchInput {
    fn level(&mut self) -> bool;
}

/// Why one stereo receive attempt did not produce a sample.
#[derive(Format, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// No word in the fifo yet. Not a fault, the caller's outer budget
    /// decides when this becomes a timeout.
    Empty,
    /// Right-tagged word arrived where left was expected; the word was
    /// dropped and counted.
    Desync,
    /// The right-channel word never arrived within the spin budget.
    RightTimeout,
}

/// Protocol counters, copied into the shared status after each completed
/// buffer.
#[derive(Format, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiverCounters {
    pub out_of_sync_drops: u32,
    pub right_timeout_count: u32,
    pub right_timeout_spins: u32,
}

/// Decodes one interleaved stereo sample per call from an [`AdcSource`].
pub struct StereoReceiver<S: AdcSource> {
    source: S,
    right_spin_budget: u32,
    counters: ReceiverCounters,
}

impl<S: AdcSource> StereoReceiver<S> {
    pub fn new(source: S, right_spin_budget: u32) -> Self {
        StereoReceiver {
            source,
            right_spin_budget,
            counters: ReceiverCounters::default(),
        }
    }

    /// Attempts to receive one left/right pair, encoding each into three
    /// little-endian PCM bytes.
    ///
    /// On [`RxError::Desync`] nothing is written. On
    /// [`RxError::RightTimeout`] the left bytes have already been encoded,
    /// but the caller restarts the whole buffer anyway.
    pub fn try_rx(&mut self, left: &mut [u8], right: &mut [u8]) -> Result<(), RxError> {
        let Some(first) = self.source.try_pull_word() else {
            return Err(RxError::Empty);
        };

        if first & RIGHT_CHANNEL_TAG != 0 {
            self.counters.out_of_sync_drops += 1;
            return Err(RxError::Desync);
        }

        // encode left while the hardware is still clocking in right
        pcm24_to_le(left, first);

        let mut spins: u32 = 0;
        let second = loop {
            if let Some(word) = self.source.try_pull_word() {
                break word;
            }
            spins += 1;
            if spins > self.right_spin_budget {
                self.counters.right_timeout_count += 1;
                self.counters.right_timeout_spins = spins;
                return Err(RxError::RightTimeout);
            }
        };

        pcm24_to_le(right, second);
        Ok(())
    }

    pub fn counters(&self) -> ReceiverCounters {
        self.counters
    }

    pub fn probe_activity(&mut self, line: AdcLine) -> bool {
        self.source.probe_activity(line)
    }
}
