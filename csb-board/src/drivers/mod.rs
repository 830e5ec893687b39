pub mod contactor;
