pub mod controller;
pub mod module;
pub mod registry;
pub mod timers;
