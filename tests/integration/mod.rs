// Integration test module organization

pub mod common;
pub mod multithreaded;

mod key_rotation_test;
mod session_test;
