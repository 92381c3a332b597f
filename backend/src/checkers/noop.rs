use shared::SafetyResult;

use super::{CheckerError, SafetyDetector};
use crate::ingest::CanonicalImage;

/// Safety gate that lets everything through - for deployments that opt out of NSFW filtering.
pub struct PermissiveSafety;

impl PermissiveSafety {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PermissiveSafety {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyDetector for PermissiveSafety {
    fn version(&self) -> &str {
        "permissive-1.0"
    }

    fn detect(&self, _image: &CanonicalImage) -> Result<SafetyResult, CheckerError> {
        Ok(SafetyResult::safe(0.0)) // Always safe
    }
}
