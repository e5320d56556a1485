pub mod app_config;
pub mod cli;
pub mod doctor;
pub mod fetch;
pub mod filters;
pub mod gmail;
pub mod labels;
pub mod messages;
pub mod migration;
pub mod resolve;
pub mod store;
pub mod util;
