pub(crate) mod bootstrap;
mod control;
mod gameplay;
mod level;
pub(crate) mod loop_runner;
