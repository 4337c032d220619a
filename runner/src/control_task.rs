//! Control-request handling: the host's MUTE switch doubles as the
//! diagnostic mode toggle, exactly one narrow entry point into the core.

use capture::{ModeHandle, StreamMode};
use defmt::info;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_usb::class::uac1::microphone::{ControlMonitor, Volume};

use crate::usb::AUDIO_CHANNELS;

#[embassy_executor::task]
pub async fn control_task(
    control_monitor: ControlMonitor<'static>,
    mode: &'static ModeHandle<CriticalSectionRawMutex>,
) {
    loop {
        control_monitor.changed().await;

        let muted = AUDIO_CHANNELS
            .iter()
            .any(|channel| matches!(control_monitor.gain(*channel), Some(Volume::Muted)));

        let new_mode = if muted {
            StreamMode::Debug
        } else {
            StreamMode::Normal
        };
        info!("mode change: {}", new_mode);
        mode.set(new_mode);

        // rate selection is the clock service's concern, only surfaced here
        info!(
            "host requested sample rate: {} Hz",
            control_monitor.sample_rate_hz()
        );
    }
}
