pub mod capture;
pub mod config;
pub mod edit;
pub mod errors;
pub mod orchestrator;
pub mod presenter;
pub mod services;
pub mod session;
pub mod status;
pub mod ui;
