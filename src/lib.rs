// Library root exposing the tracking pipeline to the vservo binary
// and to the integration tests.

pub mod actuator;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod policy;
pub mod render;
pub mod runner;
pub mod source;
