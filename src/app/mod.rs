//! Application module

pub mod cli;
pub mod pump;
pub mod startup;
