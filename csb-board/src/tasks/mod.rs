pub mod charge_task;
pub mod coms_task;
