pub mod deployer;
pub mod diff_service;
pub mod settings_resolver;
pub mod stack_graph;
pub mod stack_planner;
