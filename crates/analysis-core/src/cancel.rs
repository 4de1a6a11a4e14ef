use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{DetectionError, Result};

/// Cooperative cancellation shared between a caller and a running detection.
///
/// Detectors call [`CancelFlag::check`] once per sampler iteration or
/// segmentation split. Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that trips on its own once `timeout` has elapsed.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DetectionError::Cancelled)
        } else {
            Ok(())
        }
    }
}
