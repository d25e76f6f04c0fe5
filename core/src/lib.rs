pub mod engine;
pub mod error;
pub mod event;
pub mod factory;
pub mod graph;
pub mod injector;
pub mod network;
pub mod orchestrator;
pub mod step;
pub mod steps;
pub mod system;
