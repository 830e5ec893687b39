/*
 * This file is responsible for sequencing the pack through constant-current
 * charge, constant-voltage charge, cell balancing, and shutdown.
 * Foundational assumptions and requirements are listed below.
 *
 * ASSUMPTIONS:
 * 1. The caller gathers one coherent input snapshot per control tick and
 *   applies the returned output to the drivers before the next tick.
 * 2. Timestamps are monotonic milliseconds; they may wrap the u32 range.
 * 3. Contactor feedback reflects the physical aux contacts, not the
 *   commanded coil state.
 * 4. Enabling the charger while the contactors are open is unsafe behavior.
 * 5. One step call per tick, from one control loop, per controller instance.
 */

use crate::config::PackConfig;

/// Supervisory mode request. The sequencer only distinguishes `Charge` and
/// `Balance`; every other mode is a request to wind down to all-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeRequest {
    Init,
    Idle,
    Standby,
    Charge,
    Balance,
    Discharge,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargePhase {
    Off,
    Init,
    Cc,
    Cv,
    Balance,
    Done,
}

/// Charger targets derived once from the pack config.
///
/// All arithmetic is integer and truncating; centi-unit capacity and C rating
/// combine to milliamps through the /10 scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeSetpoints {
    pub cc_voltage_mv: u32,
    pub cc_current_ma: u32,
    pub cv_voltage_mv: u32,
    pub cv_current_ma: u32,
}

impl ChargeSetpoints {
    pub const fn derive(config: &PackConfig) -> Self {
        let total_num_cells = config.total_num_cells();
        let cc_current_ma =
            config.cell_capacity_cah * config.cell_charge_c_rating_cc * config.pack_cells_p / 10;

        ChargeSetpoints {
            cc_voltage_mv: config.cc_cell_voltage_mv * total_num_cells,
            cc_current_ma,
            cv_voltage_mv: config.cell_max_mv * total_num_cells,
            cv_current_ma: cc_current_ma,
        }
    }
}

/// One tick's worth of boundary data. Cell voltages are ordered and must
/// cover the whole pack.
#[derive(Debug, Clone, Copy)]
pub struct ChargeInput<'a> {
    pub mode_request: ModeRequest,
    pub pack_cell_max_mv: u32,
    pub pack_current_ma: u32,
    pub cell_voltages_mv: &'a [u32],
    /// Aux-contact feedback, true when physically closed.
    pub contactors_closed: bool,
    /// Charger-side feedback, true while the charger reports output on.
    pub charger_on: bool,
    pub balance_req: bool,
    pub balance_mv: u32,
    pub now_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeOutput {
    pub close_contactors: bool,
    pub charger_on: bool,
    pub voltage_req_mv: u32,
    pub current_req_ma: u32,
}

impl ChargeOutput {
    pub const ALL_OFF: ChargeOutput = ChargeOutput::new(false, false, 0, 0);

    pub const fn new(
        close_contactors: bool,
        charger_on: bool,
        voltage_req_mv: u32,
        current_req_ma: u32,
    ) -> Self {
        ChargeOutput {
            close_contactors,
            charger_on,
            voltage_req_mv,
            current_req_ma,
        }
    }
}

/// Tick-driven charge sequencer for one pack.
///
/// `step` is total: every reachable (phase, input) pair produces an output
/// and a next phase. Faults never surface here; upstream reflects them as a
/// mode request away from `Charge`/`Balance` and the sequencer winds down
/// through `Done` to `Off`.
pub struct ChargeController {
    config: PackConfig,
    setpoints: ChargeSetpoints,
    phase: ChargePhase,
    last_time_above_cv_min_curr: u32,
}

impl ChargeController {
    pub const fn new(config: PackConfig) -> Self {
        ChargeController {
            config,
            setpoints: ChargeSetpoints::derive(&config),
            phase: ChargePhase::Off,
            last_time_above_cv_min_curr: 0,
        }
    }

    /// Swap in a new pack profile. Setpoints are only ever recomputed here;
    /// the machine restarts from `Off`.
    pub fn reconfigure(&mut self, config: PackConfig) {
        self.config = config;
        self.setpoints = ChargeSetpoints::derive(&config);
        self.phase = ChargePhase::Off;
        self.last_time_above_cv_min_curr = 0;
    }

    pub fn phase(&self) -> ChargePhase {
        self.phase
    }

    pub fn setpoints(&self) -> &ChargeSetpoints {
        &self.setpoints
    }

    /// Advance one control tick: arbitrate the mode request first, then run
    /// the (possibly overridden) phase. Same-tick hand-offs such as CC to CV
    /// keep their output; no tick is lost crossing the threshold.
    pub fn step(&mut self, input: &ChargeInput) -> ChargeOutput {
        let phase = arbitrate_mode(self.phase, input.mode_request);

        let (output, next_phase) = match phase {
            ChargePhase::Off => (ChargeOutput::ALL_OFF, ChargePhase::Off),
            ChargePhase::Init => self.init_tick(input),
            ChargePhase::Cc => self.cc_tick(input),
            ChargePhase::Cv => self.cv_tick(input),
            ChargePhase::Balance => balance_tick(input),
            ChargePhase::Done => (ChargeOutput::ALL_OFF, self.done_tick(input)),
        };

        debug_assert!(!output.charger_on || output.close_contactors);

        self.phase = next_phase;
        output
    }

    /// Command the contactors for the requested mode (closed for charging,
    /// open for balancing) and hold until the aux contacts agree.
    fn init_tick(&self, input: &ChargeInput) -> (ChargeOutput, ChargePhase) {
        let want_closed = input.mode_request == ModeRequest::Charge;
        let output = ChargeOutput::new(want_closed, false, 0, 0);

        let next_phase = if input.contactors_closed == want_closed {
            match input.mode_request {
                ModeRequest::Charge => {
                    if input.pack_cell_max_mv < self.config.cell_max_mv {
                        ChargePhase::Cc
                    } else {
                        ChargePhase::Cv
                    }
                }
                ModeRequest::Balance => ChargePhase::Balance,
                _ => ChargePhase::Init,
            }
        } else {
            ChargePhase::Init
        };

        (output, next_phase)
    }

    fn cc_tick(&self, input: &ChargeInput) -> (ChargeOutput, ChargePhase) {
        // Contactor loss aborts the charge; Init retries the closure.
        if !input.contactors_closed {
            return (ChargeOutput::new(true, false, 0, 0), ChargePhase::Init);
        }

        if input.pack_cell_max_mv >= self.config.cell_max_mv {
            // Hand off to constant voltage on this same tick.
            let sp = &self.setpoints;
            (
                ChargeOutput::new(true, true, sp.cv_voltage_mv, sp.cv_current_ma),
                ChargePhase::Cv,
            )
        } else {
            let sp = &self.setpoints;
            (
                ChargeOutput::new(true, true, sp.cc_voltage_mv, sp.cc_current_ma),
                ChargePhase::Cc,
            )
        }
    }

    fn cv_tick(&mut self, input: &ChargeInput) -> (ChargeOutput, ChargePhase) {
        let sp = self.setpoints;

        if input.pack_cell_max_mv < self.config.cell_max_mv {
            // Dropped back under the cell ceiling, resume constant current.
            return if !input.contactors_closed {
                (ChargeOutput::new(true, false, 0, 0), ChargePhase::Init)
            } else {
                (
                    ChargeOutput::new(true, true, sp.cc_voltage_mv, sp.cc_current_ma),
                    ChargePhase::Cc,
                )
            };
        }

        let pack_cutoff_ma = self.config.cv_min_current_ma * self.config.pack_cells_p;
        if input.pack_current_ma < pack_cutoff_ma {
            // Completion fires the moment the taper has held long enough.
            // Wrapping subtraction keeps this correct across timestamp
            // rollover.
            let held_ms = input.now_ms.wrapping_sub(self.last_time_above_cv_min_curr);
            if held_ms >= self.config.cv_min_current_ms {
                return (ChargeOutput::ALL_OFF, ChargePhase::Done);
            }
        } else {
            self.last_time_above_cv_min_curr = input.now_ms;
        }

        if !input.contactors_closed {
            (ChargeOutput::new(true, false, 0, 0), ChargePhase::Init)
        } else {
            (
                ChargeOutput::new(true, true, sp.cv_voltage_mv, sp.cv_current_ma),
                ChargePhase::Cv,
            )
        }
    }

    fn done_tick(&self, input: &ChargeInput) -> ChargePhase {
        match input.mode_request {
            // The pack sagged back under the ceiling, warrant another cycle.
            ModeRequest::Charge => {
                if input.pack_cell_max_mv < self.config.cell_max_mv {
                    ChargePhase::Init
                } else {
                    ChargePhase::Done
                }
            }
            ModeRequest::Balance => {
                let limit = input.balance_mv + self.config.bal_on_thresh_mv;
                // Sweep the whole pack rather than stopping at the first
                // offender.
                let rebalance = input
                    .cell_voltages_mv
                    .iter()
                    .fold(false, |hit, &cell_mv| hit | (cell_mv > limit));
                if rebalance {
                    ChargePhase::Init
                } else {
                    ChargePhase::Done
                }
            }
            // Leaving charge/balance: wait for the drivers to de-energize
            // before releasing to Off.
            _ => {
                if !input.contactors_closed && !input.charger_on {
                    ChargePhase::Off
                } else {
                    ChargePhase::Done
                }
            }
        }
    }
}

/// Mode arbitration, run before the per-phase behavior each tick. A request
/// may drag the phase to `Init` or `Done`; anything else falls through
/// untouched.
fn arbitrate_mode(phase: ChargePhase, mode_request: ModeRequest) -> ChargePhase {
    match mode_request {
        ModeRequest::Charge => match phase {
            ChargePhase::Off | ChargePhase::Balance => ChargePhase::Init,
            other => other,
        },
        ModeRequest::Balance => match phase {
            ChargePhase::Off | ChargePhase::Cc | ChargePhase::Cv => ChargePhase::Init,
            other => other,
        },
        _ => match phase {
            ChargePhase::Off => ChargePhase::Off,
            _ => ChargePhase::Done,
        },
    }
}

/// Balancing holds everything off; the BMS does the shunting. Contactors
/// closing mid-balance is treated as an interlock and restarts Init.
fn balance_tick(input: &ChargeInput) -> (ChargeOutput, ChargePhase) {
    let next_phase = if input.contactors_closed {
        ChargePhase::Init
    } else if !input.balance_req {
        ChargePhase::Done
    } else {
        ChargePhase::Balance
    };

    (ChargeOutput::ALL_OFF, next_phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PackConfig {
        PackConfig {
            num_modules: 6,
            module_cell_count: 12,
            pack_cells_p: 4,
            cell_capacity_cah: 250,
            cell_charge_c_rating_cc: 100,
            cc_cell_voltage_mv: 3600,
            cell_max_mv: 4200,
            cv_min_current_ma: 250,
            cv_min_current_ms: 60_000,
            bal_on_thresh_mv: 20,
        }
    }

    fn idle_input() -> ChargeInput<'static> {
        ChargeInput {
            mode_request: ModeRequest::Standby,
            pack_cell_max_mv: 0,
            pack_current_ma: 0,
            cell_voltages_mv: &[],
            contactors_closed: false,
            charger_on: false,
            balance_req: false,
            balance_mv: 0,
            now_ms: 0,
        }
    }

    #[test]
    fn setpoint_derivation() {
        let sp = ChargeSetpoints::derive(&test_config());
        // 72 cells in series
        assert_eq!(sp.cc_voltage_mv, 3600 * 72);
        assert_eq!(sp.cv_voltage_mv, 4200 * 72);
        // 250 cAh * 100 cC * 4 P / 10 = 10 A
        assert_eq!(sp.cc_current_ma, 10_000);
        assert_eq!(sp.cv_current_ma, 10_000);
    }

    #[test]
    fn setpoint_derivation_degenerate_config() {
        let mut config = test_config();
        config.num_modules = 0;
        config.cell_capacity_cah = 0;
        let sp = ChargeSetpoints::derive(&config);
        assert_eq!(sp.cc_voltage_mv, 0);
        assert_eq!(sp.cc_current_ma, 0);
        assert_eq!(sp.cv_voltage_mv, 0);
        assert_eq!(sp.cv_current_ma, 0);
    }

    #[test]
    fn mode_arbitration_table() {
        use ChargePhase::*;

        let all_phases = [Off, Init, Cc, Cv, Balance, Done];

        for phase in all_phases {
            // CHARGE pulls Off and Balance into Init, leaves the rest alone
            let expected = match phase {
                Off | Balance => Init,
                other => other,
            };
            assert_eq!(arbitrate_mode(phase, ModeRequest::Charge), expected);

            // BALANCE pulls Off, Cc, and Cv into Init
            let expected = match phase {
                Off | Cc | Cv => Init,
                other => other,
            };
            assert_eq!(arbitrate_mode(phase, ModeRequest::Balance), expected);

            // every other mode winds down through Done, except Off which
            // stays put
            let expected = match phase {
                Off => Off,
                _ => Done,
            };
            for mode in [
                ModeRequest::Init,
                ModeRequest::Idle,
                ModeRequest::Standby,
                ModeRequest::Discharge,
                ModeRequest::Error,
            ] {
                assert_eq!(arbitrate_mode(phase, mode), expected);
            }
        }
    }

    #[test]
    fn off_charge_request_commands_contactors() {
        let mut controller = ChargeController::new(test_config());

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Init);
        assert_eq!(output, ChargeOutput::new(true, false, 0, 0));
    }

    #[test]
    fn init_advances_to_cc_once_contactors_confirm() {
        let mut controller = ChargeController::new(test_config());

        let mut input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 3900,
            ..idle_input()
        };
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Init);

        // feedback still open, no advance
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Init);

        input.contactors_closed = true;
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Cc);
    }

    #[test]
    fn init_goes_straight_to_cv_when_pack_is_full() {
        let mut controller = ChargeController::new(test_config());

        // contactor feedback already matches the closed command, so Init
        // advances on the very tick it was entered
        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            contactors_closed: true,
            ..idle_input()
        };
        let output = controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Cv);
        assert_eq!(output, ChargeOutput::new(true, false, 0, 0));
    }

    fn controller_in_cc() -> ChargeController {
        let mut controller = ChargeController::new(test_config());
        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 3900,
            contactors_closed: true,
            ..idle_input()
        };
        controller.step(&input); // Off -> Init -> Cc (feedback already closed)
        controller.step(&input); // settles in Cc
        assert_eq!(controller.phase(), ChargePhase::Cc);
        controller
    }

    #[test]
    fn cc_hands_off_to_cv_on_the_same_tick() {
        let mut controller = controller_in_cc();
        let sp = *controller.setpoints();

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            pack_current_ma: 9000,
            contactors_closed: true,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Cv);
        assert_eq!(
            output,
            ChargeOutput::new(true, true, sp.cv_voltage_mv, sp.cv_current_ma)
        );
    }

    #[test]
    fn cc_holds_below_the_cell_ceiling() {
        let mut controller = controller_in_cc();
        let sp = *controller.setpoints();

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4199,
            pack_current_ma: 10_000,
            contactors_closed: true,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Cc);
        assert_eq!(
            output,
            ChargeOutput::new(true, true, sp.cc_voltage_mv, sp.cc_current_ma)
        );
    }

    #[test]
    fn cc_contactor_loss_aborts_to_init() {
        let mut controller = controller_in_cc();

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 3900,
            contactors_closed: false,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Init);
        assert_eq!(output, ChargeOutput::new(true, false, 0, 0));
    }

    fn controller_in_cv(now_ms: u32) -> ChargeController {
        let mut controller = ChargeController::new(test_config());
        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            pack_current_ma: 10_000,
            contactors_closed: true,
            now_ms,
            ..idle_input()
        };
        controller.step(&input); // Off -> Init -> Cv (feedback already closed)
        controller.step(&input); // arms the completion timer at now_ms
        assert_eq!(controller.phase(), ChargePhase::Cv);
        controller
    }

    #[test]
    fn cv_recovers_to_cc_below_the_ceiling() {
        let mut controller = controller_in_cv(0);
        let sp = *controller.setpoints();

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4150,
            pack_current_ma: 8000,
            contactors_closed: true,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Cc);
        assert_eq!(
            output,
            ChargeOutput::new(true, true, sp.cc_voltage_mv, sp.cc_current_ma)
        );
    }

    #[test]
    fn cv_completes_only_after_the_taper_holds() {
        let mut controller = controller_in_cv(0);

        // cutoff is cv_min_current_ma * pack_cells_p = 1000 mA
        let mut input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            pack_current_ma: 5000,
            contactors_closed: true,
            now_ms: 1000,
            ..idle_input()
        };

        // still above the cutoff, timer keeps rearming
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Cv);

        // taper under the cutoff, but not yet held for cv_min_current_ms
        input.pack_current_ma = 999;
        input.now_ms = 1000 + 59_999;
        let output = controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Cv);
        assert!(output.charger_on);

        // exactly the required hold
        input.now_ms = 1000 + 60_000;
        let output = controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Done);
        assert_eq!(output, ChargeOutput::ALL_OFF);
    }

    #[test]
    fn cv_completion_timer_survives_timestamp_wraparound() {
        let mut config = test_config();
        config.cv_min_current_ms = 1400;
        let mut controller = ChargeController::new(config);

        let mut input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            pack_current_ma: 10_000,
            contactors_closed: true,
            now_ms: u32::MAX - 1000,
            ..idle_input()
        };
        controller.step(&input); // Off -> Init -> Cv
        controller.step(&input); // arm the timer just before rollover
        assert_eq!(controller.phase(), ChargePhase::Cv);

        // 1401 ms elapsed across the wrap
        input.pack_current_ma = 500;
        input.now_ms = 400;
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Done);
    }

    #[test]
    fn cv_contactor_loss_aborts_to_init() {
        let mut controller = controller_in_cv(0);

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            pack_current_ma: 5000,
            contactors_closed: false,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Init);
        assert_eq!(output, ChargeOutput::new(true, false, 0, 0));
    }

    fn controller_in_balance() -> ChargeController {
        let mut controller = ChargeController::new(test_config());
        let input = ChargeInput {
            mode_request: ModeRequest::Balance,
            balance_req: true,
            ..idle_input()
        };
        controller.step(&input); // Off -> Init -> Balance (contactors open)
        controller.step(&input); // settles in Balance
        assert_eq!(controller.phase(), ChargePhase::Balance);
        controller
    }

    #[test]
    fn balance_finishes_when_request_drops() {
        let mut controller = controller_in_balance();

        let input = ChargeInput {
            mode_request: ModeRequest::Balance,
            balance_req: false,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Done);
        assert_eq!(output, ChargeOutput::ALL_OFF);
    }

    #[test]
    fn balance_interrupted_by_closed_contactors() {
        let mut controller = controller_in_balance();

        // balance_req still true: the contactor interlock wins
        let input = ChargeInput {
            mode_request: ModeRequest::Balance,
            balance_req: true,
            contactors_closed: true,
            ..idle_input()
        };
        let output = controller.step(&input);

        assert_eq!(controller.phase(), ChargePhase::Init);
        assert_eq!(output, ChargeOutput::ALL_OFF);
    }

    fn controller_in_done() -> ChargeController {
        let mut controller = controller_in_balance();
        let input = ChargeInput {
            mode_request: ModeRequest::Balance,
            balance_req: false,
            ..idle_input()
        };
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Done);
        controller
    }

    #[test]
    fn done_rebalances_when_any_cell_is_high() {
        let mut controller = controller_in_done();

        // limit is balance_mv + bal_on_thresh_mv = 3820
        let cells = [3800, 3810, 3821, 3790];
        let input = ChargeInput {
            mode_request: ModeRequest::Balance,
            cell_voltages_mv: &cells,
            balance_mv: 3800,
            ..idle_input()
        };
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Init);
    }

    #[test]
    fn done_stays_put_when_cells_sit_at_the_limit() {
        let mut controller = controller_in_done();

        let cells = [3800, 3820, 3820, 3790];
        let input = ChargeInput {
            mode_request: ModeRequest::Balance,
            cell_voltages_mv: &cells,
            balance_mv: 3800,
            ..idle_input()
        };
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Done);
    }

    #[test]
    fn done_recharges_when_the_pack_sags() {
        let mut controller = controller_in_done();

        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4100,
            ..idle_input()
        };
        controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Init);
    }

    #[test]
    fn done_releases_to_off_once_drivers_are_dead() {
        let mut controller = controller_in_done();

        // charger still reporting on: hold in Done
        let mut input = ChargeInput {
            mode_request: ModeRequest::Standby,
            charger_on: true,
            ..idle_input()
        };
        let output = controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Done);
        assert_eq!(output, ChargeOutput::ALL_OFF);

        input.charger_on = false;
        let output = controller.step(&input);
        assert_eq!(controller.phase(), ChargePhase::Off);
        assert_eq!(output, ChargeOutput::ALL_OFF);
    }

    #[test]
    fn reconfigure_rederives_setpoints_and_restarts() {
        let mut controller = controller_in_cc();

        let mut config = test_config();
        config.pack_cells_p = 2;
        controller.reconfigure(config);

        assert_eq!(controller.phase(), ChargePhase::Off);
        assert_eq!(controller.setpoints().cc_current_ma, 5000);
    }

    #[test]
    fn output_is_safe_for_every_phase_and_mode() {
        use ChargePhase::*;

        let modes = [
            ModeRequest::Init,
            ModeRequest::Idle,
            ModeRequest::Standby,
            ModeRequest::Charge,
            ModeRequest::Balance,
            ModeRequest::Discharge,
            ModeRequest::Error,
        ];
        let cells = [4000, 4100, 4200];

        for start_phase in [Off, Init, Cc, Cv, Balance, Done] {
            for mode in modes {
                for contactors_closed in [false, true] {
                    for pack_cell_max_mv in [3000, 4200] {
                        let mut controller = ChargeController::new(test_config());
                        controller.phase = start_phase;

                        let input = ChargeInput {
                            mode_request: mode,
                            pack_cell_max_mv,
                            pack_current_ma: 500,
                            cell_voltages_mv: &cells,
                            contactors_closed,
                            charger_on: contactors_closed,
                            balance_req: true,
                            balance_mv: 3800,
                            now_ms: 100_000,
                        };
                        let output = controller.step(&input);

                        // charger on implies contactors commanded closed
                        assert!(!output.charger_on || output.close_contactors);

                        // Off and Done always emit all-off
                        if matches!(controller.phase(), Off | Done) {
                            assert_eq!(output, ChargeOutput::ALL_OFF);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn step_is_deterministic() {
        let cells = [4100, 4150, 4200];
        let input = ChargeInput {
            mode_request: ModeRequest::Charge,
            pack_cell_max_mv: 4200,
            pack_current_ma: 800,
            cell_voltages_mv: &cells,
            contactors_closed: true,
            charger_on: true,
            balance_req: false,
            balance_mv: 0,
            now_ms: 5000,
        };

        let mut a = controller_in_cv(0);
        let mut b = controller_in_cv(0);
        assert_eq!(a.step(&input), b.step(&input));
        assert_eq!(a.phase(), b.phase());
    }
}
