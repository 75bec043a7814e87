pub mod app;
pub mod core;
pub mod queue;
pub mod subscriber;

include!(concat!(env!("OUT_DIR"), "/version.rs"));
