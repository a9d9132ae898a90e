pub mod deploy;
pub mod destroy;
pub mod diff;
pub mod history_helpers;
pub mod init;
pub mod list;
pub mod log;
pub mod plan_helpers;
pub mod status;
pub mod synth;
