pub mod events;
pub mod orchestrator;
pub mod rubric;
pub mod state;
pub mod types;
