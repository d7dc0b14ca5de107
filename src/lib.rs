pub mod config;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod nlp;
pub mod services;

pub use config::{AgendaConfig, ConfigError};
pub use error::{AgendaError, AmbiguityKind};
pub use kernel::reactor::Reactor;
pub use kernel::scheduler::ReminderScheduler;
