use embassy_executor::Spawner;
use embassy_stm32::adc::{Adc, AdcChannel, SampleTime};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_time::{Duration, Instant, Ticker};

use csb_charge_core::charge::{ChargeController, ChargeInput};

use crate::{
    adc_mv_to_pack_current_ma, adc_mv_to_pack_voltage_mv, adc_raw_to_mv,
    config::PACK_CONFIG,
    drivers::contactor::Contactor,
    pins::*,
    state::{CsbStatus, SharedCsbInputs, SharedCsbStatus},
};

const CHARGE_TICK_INTERVAL: Duration = Duration::from_millis(10);

#[macro_export]
macro_rules! create_charge_task {
    ($spawner:ident, $p:ident, $inputs:ident, $status:ident) => {
        csb_board::tasks::charge_task::start_charge_task(
            &$spawner, &$inputs, &$status,
            $p.ADC1, $p.DMA1_CH1, $p.PA0, $p.PA1,
            $p.PB0, $p.PB1, $p.PB2,
        )
        .await;
    };
}

#[embassy_executor::task]
async fn charge_task_entry(
    inputs: &'static SharedCsbInputs,
    status: &'static SharedCsbStatus,
    adc: PackAdc,
    mut adc_dma: PackAdcDma,
    pack_voltage_adc_pin: PackVoltageReadPin,
    pack_current_adc_pin: PackCurrentReadPin,
    contactor_coil_pin: ContactorCoilPin,
    contactor_aux_pin: ContactorAuxPin,
    charger_enable_pin: ChargerEnablePin,
) {
    /////////////////
    //  ADC Setup  //
    /////////////////

    let mut adc = Adc::new(adc);
    let mut pack_voltage_adc_pin = pack_voltage_adc_pin.degrade_adc();
    let mut pack_current_adc_pin = pack_current_adc_pin.degrade_adc();
    let mut adc_raw_samples: [u16; 2] = [0; 2];

    ////////////////////////////////
    //  Contactor / Charger pins  //
    ////////////////////////////////

    let coil_pin = Output::new(contactor_coil_pin, Level::Low, Speed::Low);
    let aux_pin = Input::new(contactor_aux_pin, Pull::Down);
    let mut contactor = Contactor::new(coil_pin, aux_pin);
    let mut charger_enable = Output::new(charger_enable_pin, Level::Low, Speed::Low);

    let mut controller = ChargeController::new(PACK_CONFIG);
    defmt::info!("charge task up, setpoints {}", controller.setpoints());

    let mut last_phase = controller.phase();
    let mut loop_ticker = Ticker::every(CHARGE_TICK_INTERVAL);

    loop {
        let read_seq = [
            (&mut pack_voltage_adc_pin, SampleTime::CYCLES160_5),
            (&mut pack_current_adc_pin, SampleTime::CYCLES160_5),
        ]
        .into_iter();
        adc.read(&mut adc_dma, read_seq, &mut adc_raw_samples).await;

        let pack_voltage_mv = adc_mv_to_pack_voltage_mv(adc_raw_to_mv(adc_raw_samples[0]));
        let pack_current_ma = adc_mv_to_pack_current_ma(adc_raw_to_mv(adc_raw_samples[1]));

        let snapshot = inputs.snapshot();
        let input = ChargeInput {
            mode_request: snapshot.mode_request,
            pack_cell_max_mv: snapshot.pack_cell_max_mv,
            pack_current_ma,
            cell_voltages_mv: &snapshot.cell_voltages_mv,
            contactors_closed: contactor.is_closed(),
            charger_on: snapshot.charger_on,
            balance_req: snapshot.balance_req,
            balance_mv: snapshot.balance_mv,
            now_ms: Instant::now().as_millis() as u32,
        };
        let output = controller.step(&input);

        // de-energize the charger before touching the contactors, and only
        // enable it once the close command is latched
        if !output.charger_on {
            charger_enable.set_low();
        }
        contactor.set_closed(output.close_contactors);
        if output.charger_on {
            charger_enable.set_high();
        }

        if controller.phase() != last_phase {
            defmt::info!(
                "charge phase {} -> {}, output {}",
                last_phase,
                controller.phase(),
                output
            );
            last_phase = controller.phase();
        }

        status.update(CsbStatus {
            phase: controller.phase(),
            output,
            pack_voltage_mv,
            pack_current_ma,
        });

        loop_ticker.next().await;
    }
}

pub async fn start_charge_task(
    spawner: &Spawner,
    inputs: &'static SharedCsbInputs,
    status: &'static SharedCsbStatus,
    adc: PackAdc,
    adc_dma: PackAdcDma,
    pack_voltage_adc_pin: PackVoltageReadPin,
    pack_current_adc_pin: PackCurrentReadPin,
    contactor_coil_pin: ContactorCoilPin,
    contactor_aux_pin: ContactorAuxPin,
    charger_enable_pin: ChargerEnablePin,
) {
    defmt::unwrap!(spawner.spawn(charge_task_entry(
        inputs,
        status,
        adc,
        adc_dma,
        pack_voltage_adc_pin,
        pack_current_adc_pin,
        contactor_coil_pin,
        contactor_aux_pin,
        charger_enable_pin,
    )));
}
