pub mod gate;
pub mod risk;
pub mod runner;
