// shared fakes and seed helpers for the engine integration tests

pub mod port_fakes;
pub mod seed;

pub use port_fakes::*;
pub use seed::*;
