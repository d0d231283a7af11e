pub mod app_pfd;
pub mod config;
pub mod ipfilter;
pub mod pdr_engine;
pub mod pfcp;
pub mod types;
