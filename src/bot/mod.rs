//! Bot core: activation policy, conversation history lifecycle, and the
//! message handler that ties them to the model and transport capabilities.

pub mod commands;
pub mod handler;
pub mod history;
pub mod overrides;
pub mod policy;
pub mod schedule;


pub use handler::MessageHandler;
pub use history::{HistoryStore, spawn_history_writer};
pub use overrides::OverrideStore;
