pub mod claude;
pub mod engine;
pub mod prompt;
pub mod roster;
pub mod tools;
