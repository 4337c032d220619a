//! The consumer side on core 0: serves the isochronous IN endpoint from the
//! transport state machine. Starvation turns into empty packets, never into
//! waiting on the producer.

use capture::{BufferPool, ModeHandle, StatusHandle, StreamTransport};
use defmt::info;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_usb::class::uac1::microphone;
use embassy_usb::driver::EndpointError;

/// Status snapshot logged roughly every 8 s at 1 ms frames.
const HEARTBEAT_PACKETS: u32 = 8192;

struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => defmt::panic!("buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}

async fn stream_handler(
    stream: &mut microphone::Stream<'static, Driver<'static, USB>>,
    transport: &mut StreamTransport<'static, 'static, CriticalSectionRawMutex>,
    status: &'static StatusHandle<CriticalSectionRawMutex>,
) -> Result<(), Disconnected> {
    let mut packet_count = 0u32;

    loop {
        let sent = {
            let chunk = transport.pre_transfer();
            stream.write_packet(chunk).await?;
            chunk.len()
        };
        transport.post_transfer(sent);

        packet_count = packet_count.wrapping_add(1);
        if packet_count % HEARTBEAT_PACKETS == 0 {
            let snapshot = status.snapshot();
            info!(
                "streamed {} packets, drops={} rch_tmo={} rx_tmo={}",
                packet_count,
                snapshot.out_of_sync_drops,
                snapshot.right_timeout_count,
                snapshot.rx_sample_timeouts
            );
        }
    }
}

#[embassy_executor::task]
pub async fn stream_task(
    mut stream: microphone::Stream<'static, Driver<'static, USB>>,
    pool: &'static BufferPool<'static, CriticalSectionRawMutex>,
    mode: &'static ModeHandle<CriticalSectionRawMutex>,
    status: &'static StatusHandle<CriticalSectionRawMutex>,
) {
    let mut transport = StreamTransport::new(pool, mode);

    loop {
        stream.wait_connection().await;
        info!("usb audio: connected");

        _ = stream_handler(&mut stream, &mut transport, status).await;

        info!("usb audio: disconnected");
    }
}
