pub mod file_state_store;
