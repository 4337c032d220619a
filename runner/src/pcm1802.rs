//! PCM1802 ADC front-end.
//!
//! A PIO state machine clocks the serial PCM interface (FMT=00,
//! left-justified) into 25-bit words: bit 24 tags the channel, bits 23..0
//! carry the sample, MSB first. The word clock selects the half-period, so
//! the state machine emits one left-tagged and one right-tagged word per
//! sample and the protocol layer can detect lost channel sync.

use capture::sampler::{AdcLine, AdcSource};
use defmt::info;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{PIN_17, PIN_18, PIN_19, PIN_20, PIO0};
use embassy_rp::pio::{
    Config, Direction, FifoJoin, InterruptHandler, Pio, ShiftConfig, ShiftDirection, StateMachine,
};
use embassy_rp::{Peri, bind_interrupts, pac};

bind_interrupts!(pub struct PioIrqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});

// GPIOs must be consecutive and in the order DATA, BCK, LRCK for the PIO.
const DATA_PIN: usize = 18;
const BITCLK_PIN: usize = 19;
const WORDCLK_PIN: usize = 20;

// Edge-probe spin budget: long enough to span one period of the slowest
// line, the ~46 kHz word clock.
const PROBE_SPIN_BUDGET: u32 = 0xfff;

pub struct Pcm1802<'d> {
    sm: StateMachine<'d, PIO0, 0>,
    power_down: Output<'d>,
}

impl<'d> Pcm1802<'d> {
    pub fn new(
        pio: Peri<'d, PIO0>,
        data: Peri<'d, PIN_18>,
        bitclk: Peri<'d, PIN_19>,
        wordclk: Peri<'d, PIN_20>,
        power_down: Peri<'d, PIN_17>,
    ) -> Self {
        // hold the ADC in power-down until power_up is called
        let power_down = Output::new(power_down, Level::Low);

        let Pio {
            mut common,
            mut sm0,
            ..
        } = Pio::new(pio, PioIrqs);

        let program = pio::pio_asm!(
            r#"
            ; in pins: 0 = DATA, 1 = BCK, 2 = LRCK
            ; one 25-bit word per channel: tag bit first (0 = left,
            ; 1 = right), then 24 data bits on BCK rising edges
            .wrap_target
            left:
                wait 1 pin 2
                set y, 0
                in y, 1
                set x, 23
            lbit:
                wait 1 pin 1
                in pins, 1
                wait 0 pin 1
                jmp x-- lbit
                push
            right:
                wait 0 pin 2
                set y, 1
                in y, 1
                set x, 23
            rbit:
                wait 1 pin 1
                in pins, 1
                wait 0 pin 1
                jmp x-- rbit
                push
            .wrap
            "#
        );

        let data = common.make_pio_pin(data);
        let bitclk = common.make_pio_pin(bitclk);
        let wordclk = common.make_pio_pin(wordclk);
        sm0.set_pin_dirs(Direction::In, &[&data, &bitclk, &wordclk]);

        let mut cfg = Config::default();
        cfg.use_program(&common.load_program(&program.program), &[]);
        cfg.set_in_pins(&[&data, &bitclk, &wordclk]);
        // MSB first on the PCM interface, so shift left
        cfg.shift_in = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Left,
        };
        // receive only; joining gives the RX fifo the full depth
        cfg.fifo_join = FifoJoin::RxOnly;
        sm0.set_config(&cfg);
        sm0.set_enable(true);

        Pcm1802 {
            sm: sm0,
            power_down,
        }
    }

    pub fn power_up(&mut self) {
        info!("pcm1802 power up");
        self.power_down.set_high();
    }

    #[allow(dead_code)]
    pub fn power_down(&mut self) {
        self.power_down.set_low();
        info!("pcm1802 power down");
    }
}

/// The PIO owns the pads, so the probes read the raw input level through
/// IO_BANK0 (INFROMPAD reports it regardless of the pin function).
fn pad_level(pin: usize) -> bool {
    pac::IO_BANK0.gpio(pin).status().read().infrompad()
}

/// Waits for a falling then a rising edge within one shared spin budget.
fn wait_for_pos_edge(pin: usize) -> bool {
    let mut budget = PROBE_SPIN_BUDGET;

    while pad_level(pin) {
        budget -= 1;
        if budget == 0 {
            return false;
        }
    }

    while !pad_level(pin) {
        budget -= 1;
        if budget == 0 {
            return false;
        }
    }

    true
}

impl AdcSource for Pcm1802<'_> {
    fn try_pull_word(&mut self) -> Option<u32> {
        self.sm.rx().try_pull()
    }

    fn probe_activity(&mut self, line: AdcLine) -> bool {
        match line {
            AdcLine::WordClock => wait_for_pos_edge(WORDCLK_PIN),
            AdcLine::BitClock => wait_for_pos_edge(BITCLK_PIN),
            AdcLine::Data => wait_for_pos_edge(DATA_PIN),
        }
    }
}
