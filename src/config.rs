/// Physical parameters of the controlled pack.
///
/// Established once by the board's pack profile. The sequencer never mutates
/// it; changing packs means handing the controller a new config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PackConfig {
    pub num_modules: u32,
    pub module_cell_count: u32,
    /// Parallel cell count per series group.
    pub pack_cells_p: u32,
    /// Per-cell capacity, centi-amp-hours.
    pub cell_capacity_cah: u32,
    /// Per-cell charge C rating, centi-C.
    pub cell_charge_c_rating_cc: u32,
    /// Per-cell constant-current phase target voltage, mV.
    pub cc_cell_voltage_mv: u32,
    /// Per-cell maximum (constant-voltage target) voltage, mV.
    pub cell_max_mv: u32,
    /// Per-parallel-cell cutoff current for the constant-voltage phase, mA.
    pub cv_min_current_ma: u32,
    /// Time the pack current must hold below the cutoff before the charge
    /// is complete, ms.
    pub cv_min_current_ms: u32,
    /// Margin above the balance target at which a cell warrants another
    /// balancing pass, mV.
    pub bal_on_thresh_mv: u32,
}

impl PackConfig {
    pub const fn total_num_cells(&self) -> u32 {
        self.num_modules * self.module_cell_count
    }
}
