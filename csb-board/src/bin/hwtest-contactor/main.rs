#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use csb_board::drivers::contactor::Contactor;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    info!("contactor hwtest startup!");

    let coil_pin = Output::new(p.PB0, Level::Low, Speed::Low);
    let aux_pin = Input::new(p.PB1, Pull::Down);
    let mut contactor = Contactor::new(coil_pin, aux_pin);

    let mut red_led = Output::new(p.PC8, Level::Low, Speed::Low);

    loop {
        info!("commanding close");
        contactor.set_closed(true);
        Timer::after(Duration::from_millis(1000)).await;
        info!("aux feedback closed: {}", contactor.is_closed());

        info!("commanding open");
        contactor.set_closed(false);
        Timer::after(Duration::from_millis(1000)).await;
        info!("aux feedback closed: {}", contactor.is_closed());

        // red LED flags feedback stuck closed after an open command
        if contactor.is_closed() {
            red_led.set_high();
        } else {
            red_led.set_low();
        }
    }
}
