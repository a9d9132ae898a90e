pub mod history;
pub mod state_store;
