pub mod calendar;
pub mod config;
pub mod error;
pub mod io;
pub mod ledger;
pub mod notify;
pub mod paths;
pub mod roster;
pub mod schedule_run;
pub mod scheduler;
pub mod store;
pub mod summary;
pub mod tracker;
pub mod types;

pub use error::{Result, StandupError};
