use embassy_stm32::peripherals::*;

////////////////////////
//  Contactor & HV    //
////////////////////////

pub type ContactorCoilPin = PB0;
pub type ContactorAuxPin = PB1;
pub type ChargerEnablePin = PB2;

////////////////////////////
//  Voltage Measurements  //
////////////////////////////

pub type PackAdc = ADC1;
pub type PackAdcDma = DMA1_CH1;
pub type PackVoltageReadPin = PA0;
pub type PackCurrentReadPin = PA1;

///////////////
//  User IO  //
///////////////

pub type GreenStatusLedPin = PC9;
pub type RedStatusLedPin = PC8;

//////////////////////////
//  BMS Communications  //
//////////////////////////

pub type ComsUartModule = USART1;
pub type ComsUartTxPin = PA9;
pub type ComsUartRxPin = PA10;
pub type ComsUartTxDma = DMA1_CH2;
pub type ComsUartRxDma = DMA1_CH3;
