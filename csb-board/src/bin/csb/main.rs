#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use csb_board::state::{SharedCsbInputs, SharedCsbStatus};
use csb_board::{create_charge_task, create_coms_task};

static CSB_INPUTS: SharedCsbInputs = SharedCsbInputs::new();
static CSB_STATUS: SharedCsbStatus = SharedCsbStatus::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    info!("charge safety board startup!");

    create_charge_task!(spawner, p, CSB_INPUTS, CSB_STATUS);
    create_coms_task!(spawner, p, CSB_INPUTS, CSB_STATUS);

    // heartbeat
    let mut green_led = Output::new(p.PC9, Level::Low, Speed::Low);
    loop {
        green_led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
