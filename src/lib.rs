pub mod config;
pub mod dispatcher;
pub mod externals;
pub mod models;
pub mod poller;
pub mod session;
pub mod validation;
