pub mod json_history_log;
