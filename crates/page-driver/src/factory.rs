//! Session factories: one fresh browser session per confirmation attempt.

use async_trait::async_trait;

use crate::config::DriverConfig;
use crate::driver::{CdpPageDriver, PageDriver};
use crate::error::DriverError;

/// Allocates page sessions. A factory failure is an infrastructure problem
/// (the browser could not start), not a provider rejection.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}

/// Launches a dedicated Chromium process for every session.
pub struct CdpSessionFactory {
    config: DriverConfig,
}

impl CdpSessionFactory {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for CdpSessionFactory {
    async fn open_session(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let driver = CdpPageDriver::launch(&self.config).await?;
        Ok(Box::new(driver))
    }
}
