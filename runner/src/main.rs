#![no_std]
#![no_main]

//! Core 0 owns USB (device task, streaming, control) plus the heartbeat LED;
//! core 1 runs the sampling producer. The buffer pool is the only channel
//! between the two.

mod control_task;
mod head_switch;
mod pcm1802;
mod stream_task;
mod usb;

use capture::sampler::DEFAULT_SPIN_BUDGET;
use capture::{
    BufferPool, FIFO_SPACE, FrameBuffer, ModeHandle, SampleAcquirer, StatusHandle, StereoReceiver,
};
use defmt::info;
use embassy_executor::Executor;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::multicore::{Stack, spawn_core1};
use embassy_rp::peripherals;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use embassy_usb::class::uac1::microphone::{Microphone, State};
use static_cell::StaticCell;

use defmt_rtt as _;
use panic_probe as _;

use crate::head_switch::HeadSwitch;
use crate::pcm1802::Pcm1802;

static BUFFERS: StaticCell<[FrameBuffer; FIFO_SPACE]> = StaticCell::new();
static POOL: StaticCell<BufferPool<'static, CriticalSectionRawMutex>> = StaticCell::new();
static MODE: ModeHandle<CriticalSectionRawMutex> = ModeHandle::new();
static STATUS: StatusHandle<CriticalSectionRawMutex> = StatusHandle::new();

static mut CORE1_STACK: Stack<8192> = Stack::new();
static EXECUTOR0: StaticCell<Executor> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

#[embassy_executor::task]
async fn usb_task(
    mut device: embassy_usb::UsbDevice<
        'static,
        embassy_rp::usb::Driver<'static, peripherals::USB>,
    >,
) {
    device.run().await
}

#[embassy_executor::task]
async fn acquire_task(
    mut acquirer: SampleAcquirer<
        'static,
        'static,
        CriticalSectionRawMutex,
        Pcm1802<'static>,
        HeadSwitch<'static>,
    >,
) {
    info!("acquire task starting on core 1");
    acquirer.run().await
}

#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after_millis(900).await;
        led.set_low();
        Timer::after_millis(100).await;
    }
}

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());
    info!("capture firmware starting");

    let buffers = BUFFERS.init([FrameBuffer::ZEROED; FIFO_SPACE]);
    let pool: &'static _ = POOL.init(BufferPool::new(buffers));
    info!("pool ready with {} buffers in empty", FIFO_SPACE);

    let mut adc = Pcm1802::new(p.PIO0, p.PIN_18, p.PIN_19, p.PIN_20, p.PIN_17);
    adc.power_up();
    let switch = HeadSwitch::new(p.PIN_16);

    let receiver = StereoReceiver::new(adc, DEFAULT_SPIN_BUDGET);
    let acquirer = SampleAcquirer::new(
        pool,
        &MODE,
        &STATUS,
        receiver,
        switch,
        DEFAULT_SPIN_BUDGET,
    );

    spawn_core1(
        p.CORE1,
        unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) },
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| spawner.must_spawn(acquire_task(acquirer)));
        },
    );

    // USB side, core 0
    let driver = embassy_rp::usb::Driver::new(p.USB, usb::UsbIrqs);
    let mut builder = embassy_usb::Builder::new(
        driver,
        usb::usb_config(),
        usb::CONFIG_DESCRIPTOR.init([0; 256]),
        usb::BOS_DESCRIPTOR.init([0; 32]),
        &mut [], // no msos descriptors
        usb::CONTROL_BUF.init([0; 64]),
    );

    let (stream, control_monitor) = Microphone::new(
        &mut builder,
        usb::UAC_STATE.init(State::new()),
        usb::USB_MAX_PACKET_SIZE as u16,
        usb::SAMPLE_WIDTH,
        &[usb::SAMPLE_RATE_HZ],
        &usb::AUDIO_CHANNELS,
    );

    let device = builder.build();

    let led = Output::new(p.PIN_25, Level::High);

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| {
        spawner.must_spawn(usb_task(device));
        spawner.must_spawn(stream_task::stream_task(stream, pool, &MODE, &STATUS));
        spawner.must_spawn(control_task::control_task(control_monitor, &MODE));
        spawner.must_spawn(heartbeat_task(led));
    });
}
