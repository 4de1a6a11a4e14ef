use crate::{CancelFlag, ChangePointSet, Result};

/// Common seam for anything that turns a numeric series into change points.
///
/// Implementations must not keep result state between calls; every call
/// builds and returns its own [`ChangePointSet`].
pub trait ChangePointDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, values: &[f64], cancel: &CancelFlag) -> Result<ChangePointSet>;
}
