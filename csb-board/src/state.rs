use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::Vec;

use csb_charge_core::charge::{ChargeOutput, ChargePhase, ModeRequest};

use crate::config::PACK_TOTAL_CELLS;

/// Pack-side inputs delivered by the BMS over the coms link. The charge task
/// snapshots this once per control tick so one tick always sees a coherent
/// frame.
#[derive(Debug, Clone)]
pub struct CsbInputs {
    pub mode_request: ModeRequest,
    pub pack_cell_max_mv: u32,
    pub cell_voltages_mv: Vec<u32, PACK_TOTAL_CELLS>,
    pub balance_req: bool,
    pub balance_mv: u32,
    pub charger_on: bool,
}

impl CsbInputs {
    const fn new() -> Self {
        CsbInputs {
            mode_request: ModeRequest::Standby,
            pack_cell_max_mv: 0,
            cell_voltages_mv: Vec::new(),
            balance_req: false,
            balance_mv: 0,
            charger_on: false,
        }
    }
}

pub struct SharedCsbInputs {
    inner: Mutex<CriticalSectionRawMutex, RefCell<CsbInputs>>,
}

impl SharedCsbInputs {
    pub const fn new() -> Self {
        SharedCsbInputs {
            inner: Mutex::new(RefCell::new(CsbInputs::new())),
        }
    }

    pub fn snapshot(&self) -> CsbInputs {
        self.inner.lock(|inputs| inputs.borrow().clone())
    }

    pub fn replace(&self, new_inputs: CsbInputs) {
        self.inner.lock(|inputs| inputs.replace(new_inputs));
    }
}

/// Controller status published by the charge task, reported upstream by the
/// coms task.
#[derive(Debug, Clone, Copy)]
pub struct CsbStatus {
    pub phase: ChargePhase,
    pub output: ChargeOutput,
    pub pack_voltage_mv: u32,
    pub pack_current_ma: u32,
}

impl CsbStatus {
    const fn new() -> Self {
        CsbStatus {
            phase: ChargePhase::Off,
            output: ChargeOutput::ALL_OFF,
            pack_voltage_mv: 0,
            pack_current_ma: 0,
        }
    }
}

pub struct SharedCsbStatus {
    inner: Mutex<CriticalSectionRawMutex, RefCell<CsbStatus>>,
}

impl SharedCsbStatus {
    pub const fn new() -> Self {
        SharedCsbStatus {
            inner: Mutex::new(RefCell::new(CsbStatus::new())),
        }
    }

    pub fn get(&self) -> CsbStatus {
        self.inner.lock(|status| *status.borrow())
    }

    pub fn update(&self, new_status: CsbStatus) {
        self.inner.lock(|status| status.replace(new_status));
    }
}
