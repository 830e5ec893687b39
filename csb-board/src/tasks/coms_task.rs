use core::mem::{size_of, MaybeUninit};

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::usart::{self, Uart};
use embassy_time::{Duration, Ticker};
use heapless::Vec;

use csb_charge_core::charge::{ChargePhase, ModeRequest};

use crate::{
    config::PACK_TOTAL_CELLS,
    pins::*,
    state::{CsbInputs, SharedCsbInputs, SharedCsbStatus},
    SystemIrqs,
};

const COMS_BAUD_RATE: u32 = 115_200;
const STATUS_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Command frame from the BMS/supervisor. Fixed-size little-endian packed
/// struct, delimited by line idle; the bus protocol proper lives on the BMS
/// side.
#[repr(C, packed)]
struct CsbCommandPacket {
    mode_request: u8,
    balance_req: u8,
    charger_on: u8,
    _reserved: u8,
    balance_mv: u16,
    pack_cell_max_mv: u16,
    cell_voltages_mv: [u16; PACK_TOTAL_CELLS],
}

#[repr(C, packed)]
struct CsbStatusPacket {
    charge_phase: u8,
    close_contactors: u8,
    charger_on: u8,
    _reserved: u8,
    voltage_req_mv: u32,
    current_req_ma: u32,
    pack_voltage_mv: u32,
    pack_current_ma: u32,
}

// Unknown mode codes wind the charger down, same as any non-charge mode.
fn mode_request_from_wire(raw: u8) -> ModeRequest {
    match raw {
        1 => ModeRequest::Idle,
        2 => ModeRequest::Standby,
        3 => ModeRequest::Charge,
        4 => ModeRequest::Balance,
        5 => ModeRequest::Discharge,
        6 => ModeRequest::Error,
        _ => ModeRequest::Init,
    }
}

fn phase_to_wire(phase: ChargePhase) -> u8 {
    match phase {
        ChargePhase::Off => 0,
        ChargePhase::Init => 1,
        ChargePhase::Cc => 2,
        ChargePhase::Cv => 3,
        ChargePhase::Balance => 4,
        ChargePhase::Done => 5,
    }
}

fn command_to_inputs(packet: &CsbCommandPacket) -> CsbInputs {
    // copy the packed fields out before touching them, references into a
    // packed struct are unaligned
    let cells = packet.cell_voltages_mv;
    let mut cell_voltages_mv: Vec<u32, PACK_TOTAL_CELLS> = Vec::new();
    cell_voltages_mv.extend(cells.iter().map(|&cell_mv| cell_mv as u32));

    let balance_mv = packet.balance_mv;
    let pack_cell_max_mv = packet.pack_cell_max_mv;

    CsbInputs {
        mode_request: mode_request_from_wire(packet.mode_request),
        pack_cell_max_mv: pack_cell_max_mv as u32,
        cell_voltages_mv,
        balance_req: packet.balance_req != 0,
        balance_mv: balance_mv as u32,
        charger_on: packet.charger_on != 0,
    }
}

#[macro_export]
macro_rules! create_coms_task {
    ($spawner:ident, $p:ident, $inputs:ident, $status:ident) => {
        csb_board::tasks::coms_task::start_coms_task(
            &$spawner, &$inputs, &$status,
            $p.USART1, $p.PA10, $p.PA9, $p.DMA1_CH2, $p.DMA1_CH3,
        )
        .await;
    };
}

#[embassy_executor::task]
async fn coms_task_entry(
    inputs: &'static SharedCsbInputs,
    status: &'static SharedCsbStatus,
    uart: ComsUartModule,
    rx_pin: ComsUartRxPin,
    tx_pin: ComsUartTxPin,
    tx_dma: ComsUartTxDma,
    rx_dma: ComsUartRxDma,
) {
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = COMS_BAUD_RATE;
    let mut uart = defmt::unwrap!(Uart::new(
        uart,
        rx_pin,
        tx_pin,
        SystemIrqs,
        tx_dma,
        rx_dma,
        uart_config
    ));

    let mut rx_buf = [0u8; size_of::<CsbCommandPacket>()];
    let mut status_ticker = Ticker::every(STATUS_REPORT_INTERVAL);

    loop {
        match select(uart.read_until_idle(&mut rx_buf), status_ticker.next()).await {
            Either::First(Ok(len)) => {
                if len != size_of::<CsbCommandPacket>() {
                    defmt::warn!(
                        "got invalid command frame of len {:?} (expected {:?})",
                        len,
                        size_of::<CsbCommandPacket>()
                    );
                    continue;
                }

                // reinterpreting packed wire structs is unavoidably unsafe
                let packet = unsafe {
                    let mut packet: CsbCommandPacket = MaybeUninit::zeroed().assume_init();
                    let dst = &mut packet as *mut _ as *mut u8;
                    for (i, &byte) in rx_buf.iter().enumerate() {
                        *dst.add(i) = byte;
                    }
                    packet
                };
                inputs.replace(command_to_inputs(&packet));
            }
            Either::First(Err(err)) => {
                defmt::warn!("coms uart error: {}", err);
            }
            Either::Second(()) => {
                let current = status.get();
                let packet = CsbStatusPacket {
                    charge_phase: phase_to_wire(current.phase),
                    close_contactors: current.output.close_contactors as u8,
                    charger_on: current.output.charger_on as u8,
                    _reserved: 0,
                    voltage_req_mv: current.output.voltage_req_mv,
                    current_req_ma: current.output.current_req_ma,
                    pack_voltage_mv: current.pack_voltage_mv,
                    pack_current_ma: current.pack_current_ma,
                };
                let bytes = unsafe {
                    core::slice::from_raw_parts(
                        &packet as *const CsbStatusPacket as *const u8,
                        size_of::<CsbStatusPacket>(),
                    )
                };
                if let Err(err) = uart.write(bytes).await {
                    defmt::warn!("status frame write failed: {}", err);
                }
            }
        }
    }
}

pub async fn start_coms_task(
    spawner: &Spawner,
    inputs: &'static SharedCsbInputs,
    status: &'static SharedCsbStatus,
    uart: ComsUartModule,
    rx_pin: ComsUartRxPin,
    tx_pin: ComsUartTxPin,
    tx_dma: ComsUartTxDma,
    rx_dma: ComsUartRxDma,
) {
    defmt::unwrap!(spawner.spawn(coms_task_entry(
        inputs, status, uart, rx_pin, tx_pin, tx_dma, rx_dma
    )));
}
