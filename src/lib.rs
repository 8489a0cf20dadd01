pub mod agent;
pub mod config;
pub mod error;
pub mod platform;
pub mod shutdown;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
