use std::sync::Arc;

use reqwest::Url;

use self::services::{ApiError, DeviceApiServiceHttp};

pub mod services;

#[cfg(test)]
pub mod testing;

pub struct DeviceApiModule {
    pub service: Arc<DeviceApiServiceHttp>,
}

impl DeviceApiModule {
    pub fn initialize(base_url: Url) -> Result<Self, ApiError> {
        Ok(Self {
            service: Arc::new(DeviceApiServiceHttp::new(base_url)?),
        })
    }
}
