pub mod command_payload;
pub mod connection_state;
pub mod line_buffer;
pub mod sensor_reading;
pub mod target;
