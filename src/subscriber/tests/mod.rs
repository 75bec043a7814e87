//! Test modules for subscribers

mod memory;
