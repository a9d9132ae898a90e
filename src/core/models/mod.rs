pub mod diff_result;
pub mod env_config;
pub mod environment;
pub mod history_entry;
pub mod stack;
pub mod state;
