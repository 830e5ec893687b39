use embassy_stm32::gpio::{Input, Output};

/// High-voltage contactor pair: coil drive output plus auxiliary-contact
/// feedback. The aux contacts follow the armature, so `is_closed` reflects
/// the physical state, not the commanded one.
pub struct Contactor<'a> {
    coil_pin: Output<'a>,
    aux_pin: Input<'a>,
}

impl<'a> Contactor<'a> {
    pub fn new(coil_pin: Output<'a>, aux_pin: Input<'a>) -> Contactor<'a> {
        Contactor { coil_pin, aux_pin }
    }

    #[inline]
    pub fn set_closed(&mut self, close: bool) {
        if close {
            self.coil_pin.set_high();
        } else {
            self.coil_pin.set_low();
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.aux_pin.is_high()
    }
}
