//! Error types for capture operations.

use thiserror::Error;

/// Errors that can occur during capture operations.
///
/// Permission problems are reported separately from generic OS failures so
/// callers can point the user at the right System Settings pane instead of
/// suggesting a blind retry. The engine re-probes the capture capability
/// after any failed OS call to decide which variant applies.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Display enumeration returned nothing usable.
    #[error("No displays available for capture")]
    NoDisplaysAvailable,

    /// The OS refused the capture because Screen Recording permission is
    /// missing.
    #[error(
        "Screen capture permission denied.\n\nGrant permission in:\n  \
         System Settings > Privacy & Security > Screen Recording"
    )]
    PermissionDenied,

    /// OS-level capture failure that is not a permission problem.
    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    /// The window vanished between enumeration and capture.
    #[error("Window {id} not found (it may have been closed)")]
    WindowNotFound { id: u32 },

    /// Requested rectangle has non-positive width or height.
    #[error("Invalid capture rectangle: {width}x{height}")]
    InvalidRectangle { width: f64, height: f64 },

    /// User aborted an interactive selection. A normal terminal outcome,
    /// not surfaced to the output layer as a failure.
    #[error("Selection cancelled")]
    SelectionCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_names_settings_pane() {
        let msg = format!("{}", CaptureError::PermissionDenied);
        assert!(msg.contains("Screen Recording"));
        assert!(msg.contains("System Settings"));
    }

    #[test]
    fn test_window_not_found_names_id() {
        let msg = format!("{}", CaptureError::WindowNotFound { id: 42 });
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_invalid_rectangle_reports_dimensions() {
        let err = CaptureError::InvalidRectangle {
            width: -3.0,
            height: 10.0,
        };
        assert!(format!("{}", err).contains("-3x10"));
    }
}
