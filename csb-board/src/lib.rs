#![no_std]

use embassy_stm32::{bind_interrupts, peripherals, usart};

pub mod config;
pub mod drivers;
pub mod pins;
pub mod state;
pub mod tasks;

bind_interrupts!(pub struct SystemIrqs {
    USART1 => usart::InterruptHandler<peripherals::USART1>;
});

const ADC_VREF_MV: u32 = 3300;

pub const fn adc_raw_to_mv(sample: u16) -> u32 {
    sample as u32 * ADC_VREF_MV / 4096
}

/// Pack voltage tap comes through the 201:1 isolation divider on the HV
/// sense board.
pub const fn adc_mv_to_pack_voltage_mv(adc_mv: u32) -> u32 {
    adc_mv * 201
}

// Hall sensor on the charge path: 1650 mV at zero current, 16 mA per mV
// toward the charge side. The sequencer only meters charge current, so
// discharge-side readings clamp to zero.
const CURRENT_SENSE_ZERO_MV: u32 = 1650;
const CURRENT_SENSE_MA_PER_MV: u32 = 16;

pub const fn adc_mv_to_pack_current_ma(adc_mv: u32) -> u32 {
    if adc_mv <= CURRENT_SENSE_ZERO_MV {
        0
    } else {
        (adc_mv - CURRENT_SENSE_ZERO_MV) * CURRENT_SENSE_MA_PER_MV
    }
}
