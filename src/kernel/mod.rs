pub mod event;
pub mod intent;
pub mod reactor;
pub mod resolver;
pub mod scheduler;
pub mod state;
pub mod templates;
pub mod time;
