pub(crate) mod bootstrap;
mod demo;
mod fixture;
pub(crate) mod loop_runner;
