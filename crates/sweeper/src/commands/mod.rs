pub mod listen;
pub mod run;
pub mod schedule;
pub mod types;
