//! The sampling producer: perpetually fills buffers according to the current
//! mode and hands them to the consumer side.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::format::{
    BYTES_PER_SAMPLE, FrameBuffer, PAYLOAD_SIZE, SAMPLES_PER_BUFFER, SLOT_SIZE, pcm24_to_le,
    switch_level_to_pcm24,
};
use crate::mode::{ModeHandle, StreamMode};
use crate::pool::BufferPool;
use crate::sampler::{AdcLine, AdcSource, RxError, StereoReceiver, SwitchInput};
use crate::status::{SNAPSHOT_HEADER_SIZE, SNAPSHOT_MAGIC, StatusHandle, bool_u8};

pub struct SampleAcquirer<'p, 'b, M: RawMutex, S: AdcSource, W: SwitchInput> {
    pool: &'p BufferPool<'b, M>,
    mode: &'p ModeHandle<M>,
    status: &'p StatusHandle<M>,
    receiver: StereoReceiver<S>,
    switch: W,
    rx_spin_budget: u32,
}

impl<'p, 'b, M: RawMutex, S: AdcSource, W: SwitchInput> SampleAcquirer<'p, 'b, M, S, W> {
    pub fn new(
        pool: &'p BufferPool<'b, M>,
        mode: &'p ModeHandle<M>,
        status: &'p StatusHandle<M>,
        receiver: StereoReceiver<S>,
        switch: W,
        rx_spin_budget: u32,
    ) -> Self {
        SampleAcquirer {
            pool,
            mode,
            status,
            receiver,
            switch,
            rx_spin_budget,
        }
    }

    /// The producer loop. `take_empty` is its only blocking point; a buffer,
    /// once taken, is retried until some fill attempt succeeds.
    pub async fn run(&mut self) {
        loop {
            let mut buffer = self.pool.take_empty().await;
            while !self.fill_once(&mut buffer) {}
            self.pool.put_filled(buffer).await;
        }
    }

    /// One fill attempt under the mode current at its start. A failed
    /// attempt leaves partial content behind; the next attempt overwrites
    /// the buffer from sample 0.
    pub fn fill_once(&mut self, buffer: &mut FrameBuffer) -> bool {
        match self.mode.get() {
            StreamMode::Normal => self.fill_normal(buffer),
            StreamMode::Debug => self.fill_debug(buffer),
        }
    }

    fn fill_normal(&mut self, buffer: &mut FrameBuffer) -> bool {
        for slot in 0..SAMPLES_PER_BUFFER {
            let frame = &mut buffer.data[slot * SLOT_SIZE..(slot + 1) * SLOT_SIZE];
            let (left, rest) = frame.split_at_mut(BYTES_PER_SAMPLE);
            let (right, switch) = rest.split_at_mut(BYTES_PER_SAMPLE);

            let mut spins: u32 = 0;
            loop {
                match self.receiver.try_rx(left, right) {
                    Ok(()) => break,
                    Err(RxError::Empty) => {
                        spins += 1;
                        if spins > self.rx_spin_budget {
                            self.status.lock(|fields| fields.rx_sample_timeouts += 1);
                            return false;
                        }
                    }
                    Err(RxError::Desync | RxError::RightTimeout) => return false,
                }
            }

            pcm24_to_le(switch, switch_level_to_pcm24(self.switch.level()));
        }

        let counters = self.receiver.counters();
        self.status.lock(|fields| {
            // an entire buffer came through, so every ADC line was live
            fields.activity_wordclk = bool_u8(true);
            fields.activity_bitclk = bool_u8(true);
            fields.activity_data = bool_u8(true);
            fields.out_of_sync_drops = counters.out_of_sync_drops;
            fields.right_timeout_count = counters.right_timeout_count;
            fields.right_timeout_spins = counters.right_timeout_spins;
        });

        true
    }

    fn fill_debug(&mut self, buffer: &mut FrameBuffer) -> bool {
        buffer.data.fill(0);
        buffer.data[..SNAPSHOT_HEADER_SIZE].copy_from_slice(&SNAPSHOT_MAGIC.to_le_bytes());

        // the probes spin on the pins for a bounded but nonzero time, so
        // they run before the lock is taken
        let wordclk = self.receiver.probe_activity(AdcLine::WordClock);
        let bitclk = self.receiver.probe_activity(AdcLine::BitClock);
        let data = self.receiver.probe_activity(AdcLine::Data);

        self.status.lock(|fields| {
            fields.activity_wordclk = bool_u8(wordclk);
            fields.activity_bitclk = bool_u8(bitclk);
            fields.activity_data = bool_u8(data);

            let bytes = bytemuck::bytes_of(fields);
            let len = bytes.len().min(PAYLOAD_SIZE - SNAPSHOT_HEADER_SIZE);
            buffer.data[SNAPSHOT_HEADER_SIZE..SNAPSHOT_HEADER_SIZE + len]
                .copy_from_slice(&bytes[..len]);
        });

        true
    }
}

#[cfg(test)]
mod test;
