//! The head-switch line, sampled once per audio slot into the synthetic
//! third channel.

use capture::sampler::SwitchInput;
use embassy_rp::Peri;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::PIN_16;

pub struct HeadSwitch<'d> {
    pin: Input<'d>,
}

impl<'d> HeadSwitch<'d> {
    pub fn new(pin: Peri<'d, PIN_16>) -> Self {
        HeadSwitch {
            pin: Input::new(pin, Pull::Down),
        }
    }
}

impl SwitchInput for HeadSwitch<'_> {
    fn level(&mut self) -> bool {
        self.pin.is_high()
    }
}
