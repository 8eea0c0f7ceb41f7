pub mod bootstrap;
pub mod orchestrator;

pub use bootstrap::{bootstrap_vault, BootstrapReport};
pub use orchestrator::{Orchestrator, Outcome};
