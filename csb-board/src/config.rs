// Pack profile for the 72s4p NMC pack. Values mirror the BMS-side profile;
// the two boards must agree on these or the charger and the shunts fight
// each other.

use csb_charge_core::config::PackConfig;

pub const PACK_NUM_MODULES: u32 = 6;
pub const PACK_MODULE_CELL_COUNT: u32 = 12;
pub const PACK_TOTAL_CELLS: usize = (PACK_NUM_MODULES * PACK_MODULE_CELL_COUNT) as usize;
pub const PACK_CELLS_PARALLEL: u32 = 4;

// 2.5 Ah cells, rated for 1C charge; centi-units per the profile convention
pub const CELL_CAPACITY_CAH: u32 = 250;
pub const CELL_CHARGE_C_RATING_CC: u32 = 100;

// hold the bulk phase just under the ceiling so the charger stays in
// current limit until the hottest cell actually gets there
pub const CELL_CC_VOLTAGE_MV: u32 = 4150;
pub const CELL_MAX_MV: u32 = 4200;
// consumed by the BMS-side discharge interlock, reported for reference
pub const CELL_MIN_MV: u32 = 2500;

// charge terminates after the taper holds below 250 mA per parallel group
// for a full minute
pub const CV_MIN_CURRENT_MA: u32 = 250;
pub const CV_MIN_CURRENT_MS: u32 = 60_000;

// balance shunt engage/release margins around the balance target; the
// release margin lives on the BMS side
pub const BAL_ON_THRESH_MV: u32 = 20;
pub const BAL_OFF_THRESH_MV: u32 = 10;

pub const PACK_CONFIG: PackConfig = PackConfig {
    num_modules: PACK_NUM_MODULES,
    module_cell_count: PACK_MODULE_CELL_COUNT,
    pack_cells_p: PACK_CELLS_PARALLEL,
    cell_capacity_cah: CELL_CAPACITY_CAH,
    cell_charge_c_rating_cc: CELL_CHARGE_C_RATING_CC,
    cc_cell_voltage_mv: CELL_CC_VOLTAGE_MV,
    cell_max_mv: CELL_MAX_MV,
    cv_min_current_ma: CV_MIN_CURRENT_MA,
    cv_min_current_ms: CV_MIN_CURRENT_MS,
    bal_on_thresh_mv: BAL_ON_THRESH_MV,
};
