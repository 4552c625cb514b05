//! Browser session ownership.
//!
//! A [`Session`] owns the driver for the duration of one run. Closing
//! consumes it, so a session cannot be used after teardown. A session dropped
//! without [`Session::close`] logs a warning; the orchestrator always closes
//! explicitly, on success and on failure.

use crate::driver::Driver;
use crate::result::HarnessResult;
use tracing::{debug, warn};

/// One open browser session
#[derive(Debug)]
pub struct Session<D: Driver> {
    driver: D,
    closed: bool,
}

impl<D: Driver> Session<D> {
    /// Wrap an already-launched driver
    #[must_use]
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            closed: false,
        }
    }

    /// Borrow the driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Borrow the driver mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Close the browser and release the session
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the browser did not shut down cleanly.
    /// The session counts as released either way.
    pub async fn close(mut self) -> HarnessResult<()> {
        self.closed = true;
        let result = self.driver.close().await;
        debug!(ok = result.is_ok(), "session closed");
        result
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("browser session dropped without being closed");
        }
    }
}
