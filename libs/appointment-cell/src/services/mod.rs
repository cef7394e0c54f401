pub mod appointment;
pub mod availability;
pub mod query;
pub mod status;
