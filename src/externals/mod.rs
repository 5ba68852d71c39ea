pub mod device_api;
pub mod event_logging;
pub mod operator_console;
