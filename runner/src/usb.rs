use capture::format::PAYLOAD_SIZE;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::InterruptHandler;
use embassy_usb::class::uac1;
use static_cell::StaticCell;

bind_interrupts!(pub struct UsbIrqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

/// Crystal-derived ADC rate of the capture board (24 MHz / 512).
pub const SAMPLE_RATE_HZ: u32 = 46_875;

/// 24-bit PCM samples.
pub const SAMPLE_WIDTH: uac1::SampleWidth = uac1::SampleWidth::Width3Byte;

/// Left, right, head switch.
pub const AUDIO_CHANNELS: [uac1::Channel; 3] = [
    uac1::Channel::LeftFront,
    uac1::Channel::RightFront,
    uac1::Channel::CenterFront,
];

// One whole frame buffer per isochronous packet. The buffer holds slightly
// more than 1 ms of audio while the host polls every 1 ms, so the host
// always drains faster than the producer fills and the pool cannot overflow.
pub const USB_MAX_PACKET_SIZE: usize = PAYLOAD_SIZE;

pub static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
pub static BOS_DESCRIPTOR: StaticCell<[u8; 32]> = StaticCell::new();
pub static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
pub static UAC_STATE: StaticCell<uac1::microphone::State> = StaticCell::new();

pub fn usb_config() -> embassy_usb::Config<'static> {
    let mut config = embassy_usb::Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("tapecap");
    config.product = Some("Tape capture ADC");
    config.serial_number = Some("00000001");
    config.max_power = 100;
    config
}
