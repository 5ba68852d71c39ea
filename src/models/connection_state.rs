use derive_more::Display;

use super::sensor_reading::SensorReading;

/// Liveness of the device as derived from the last applied telemetry cycle.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[display(fmt = "Connected")]
    Connected,

    #[default]
    #[display(fmt = "Disconnected")]
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Connection state and sensor reading, always published as one value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Telemetry {
    pub connection: ConnectionState,
    pub reading: SensorReading,
}

impl std::fmt::Display for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(Telemetry: connection={}, distance={})",
            self.connection, self.reading
        )
    }
}
