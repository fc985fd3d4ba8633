//! Day2Day is a small personal activity logger. Activities are logged through a validated form,
//! shown in a weekly calendar and kept in a local key-value store. While the dashboard runs it
//! reminds you to log what you have been doing.

pub mod calendar;
pub mod cli;
pub mod dashboard;
pub mod form;
pub mod fs;
pub mod notification;
pub mod storage;
pub mod utils;
