//! OS capability checks for screen capture and global input interception.
//!
//! Everything else in the system depends on these two capabilities, so they
//! are verified up front with clear remediation paths instead of letting a
//! capture or tap fail with an opaque OS error later.

use std::process::{Command, Stdio};

use crate::display::ScreenSource;

/// The two OS capabilities this system needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Pixel capture of displays and windows.
    ScreenCapture,
    /// System-wide low-level keyboard tap.
    InputInterception,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::ScreenCapture => "Screen Recording",
            Capability::InputInterception => "Accessibility",
        }
    }

    /// System Settings pane granting this capability.
    pub fn system_settings_path(&self) -> &'static str {
        match self {
            Capability::ScreenCapture => {
                "System Settings > Privacy & Security > Screen Recording"
            }
            Capability::InputInterception => {
                "System Settings > Privacy & Security > Accessibility"
            }
        }
    }

    /// Deep link opening System Settings at this capability's pane.
    pub fn system_settings_url(&self) -> &'static str {
        match self {
            Capability::ScreenCapture => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_ScreenCapture"
            }
            Capability::InputInterception => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility"
            }
        }
    }
}

/// A missing capability, with how to grant it.
#[derive(Debug, thiserror::Error)]
#[error(
    "{} permission is required.\n\nGrant permission in:\n  {}\n\n\
     You can open System Settings directly by running:\n  open \"{}\"",
    capability.name(),
    capability.system_settings_path(),
    capability.system_settings_url()
)]
pub struct PermissionError {
    pub capability: Capability,
}

/// Probe interface for the input-interception capability. The real
/// implementation lives next to the tap (`hotkeys::RdevProbe`); tests
/// substitute canned answers.
pub trait InterceptProbe {
    /// Cheap declarative query of the capability. May be stale.
    fn declarative_check(&self) -> bool;

    /// Attempt to actually construct the interception resource in
    /// listen-only mode, releasing it immediately. Authoritative.
    fn construct_listen_probe(&self) -> bool;
}

/// Non-blocking, idempotent check of the capture capability.
///
/// There is no reliable declarative query for this one, so the check is a
/// throwaway capture attempt: if the OS hands back pixels, the capability
/// is real.
pub fn check_capture(source: &dyn ScreenSource) -> bool {
    let displays = match source.displays() {
        Ok(d) if !d.is_empty() => d,
        _ => return false,
    };
    match source.capture_display(displays[0].id) {
        Ok(image) => image.width() > 0 && image.height() > 0,
        Err(_) => false,
    }
}

/// Fire-and-forget consent surface for screen capture. There is no
/// completion callback; callers re-run [`check_capture`] before the next
/// capture attempt.
pub fn request_capture() {
    open_settings_pane(Capability::ScreenCapture, false);
}

/// Two-stage check of the input-interception capability.
///
/// Stage one is the cheap declarative query. Only a positive answer is
/// trusted enough to spend stage two on: constructing the real interception
/// resource in listen-only mode. A construction failure despite a positive
/// declarative answer means the OS answer was stale, and the capability is
/// reported missing.
pub fn check_intercept_input(probe: &dyn InterceptProbe) -> bool {
    if !probe.declarative_check() {
        return false;
    }
    let constructed = probe.construct_listen_probe();
    if !constructed {
        log::warn!("Input interception declared available but tap construction failed");
    }
    constructed
}

/// Synchronous-prompting consent surface for input interception.
pub fn request_intercept_input() {
    // Touching System Events is what makes the OS put up the consent
    // prompt; the settings pane opens afterwards for the manual toggle.
    if cfg!(target_os = "macos") {
        let script = r#"
            tell application "System Events"
                set frontApp to name of first application process whose frontmost is true
            end tell
            return frontApp
        "#;
        let _ = Command::new("osascript")
            .args(["-e", script])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output();
    }
    open_settings_pane(Capability::InputInterception, true);
}

/// macOS declarative check for input interception: a trivial AppleScript
/// that requires Accessibility trust. On other platforms there is nothing
/// declarative to ask, so stage two decides alone.
pub fn declarative_intercept_check() -> bool {
    if !cfg!(target_os = "macos") {
        return true;
    }
    let script = r#"
        tell application "System Events"
            set frontApp to name of first application process whose frontmost is true
        end tell
        return frontApp
    "#;
    let output = Command::new("osascript")
        .args(["-e", script])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();
    match output {
        Ok(result) => {
            let stderr = String::from_utf8_lossy(&result.stderr);
            !(stderr.contains("not allowed")
                || stderr.contains("assistive access")
                || stderr.contains("denied"))
        }
        Err(e) => {
            log::warn!("Failed to run osascript for accessibility check: {}", e);
            false
        }
    }
}

/// Check both capabilities, returning an error per missing one.
pub fn verify_permissions(
    source: &dyn ScreenSource,
    probe: &dyn InterceptProbe,
    need_capture: bool,
    need_intercept: bool,
) -> Vec<PermissionError> {
    let mut errors = Vec::new();
    if need_capture && !check_capture(source) {
        errors.push(PermissionError {
            capability: Capability::ScreenCapture,
        });
    }
    if need_intercept && !check_intercept_input(probe) {
        errors.push(PermissionError {
            capability: Capability::InputInterception,
        });
    }
    errors
}

/// Print a user-facing summary of missing permissions.
pub fn print_permission_errors(errors: &[PermissionError]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("\nMissing permissions detected:\n");
    for (i, error) in errors.iter().enumerate() {
        eprintln!("{}. {}", i + 1, error.capability.name());
        eprintln!(
            "   Grant permission in: {}",
            error.capability.system_settings_path()
        );
        eprintln!("   Or run: open \"{}\"", error.capability.system_settings_url());
        eprintln!();
    }
    eprintln!("After granting permissions, restart the application.\n");
}

fn open_settings_pane(capability: Capability, wait: bool) {
    if !cfg!(target_os = "macos") {
        log::warn!(
            "No consent surface to open for {} on this platform",
            capability.name()
        );
        return;
    }
    let mut cmd = Command::new("open");
    cmd.arg(capability.system_settings_url())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let result = if wait {
        cmd.status().map(|_| ())
    } else {
        cmd.spawn().map(|_| ())
    };
    if let Err(e) = result {
        log::warn!("Failed to open System Settings: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProbe {
        declarative: bool,
        constructs: bool,
        construct_calls: std::cell::Cell<u32>,
    }

    impl CannedProbe {
        fn new(declarative: bool, constructs: bool) -> Self {
            Self {
                declarative,
                constructs,
                construct_calls: std::cell::Cell::new(0),
            }
        }
    }

    impl InterceptProbe for CannedProbe {
        fn declarative_check(&self) -> bool {
            self.declarative
        }
        fn construct_listen_probe(&self) -> bool {
            self.construct_calls.set(self.construct_calls.get() + 1);
            self.constructs
        }
    }

    #[test]
    fn test_capability_names_and_urls() {
        assert_eq!(Capability::ScreenCapture.name(), "Screen Recording");
        assert!(Capability::ScreenCapture
            .system_settings_url()
            .contains("ScreenCapture"));
        assert!(Capability::InputInterception
            .system_settings_url()
            .contains("Accessibility"));
    }

    #[test]
    fn test_intercept_check_skips_stage_two_when_declared_absent() {
        let probe = CannedProbe::new(false, true);
        assert!(!check_intercept_input(&probe));
        assert_eq!(probe.construct_calls.get(), 0);
    }

    #[test]
    fn test_intercept_check_distrusts_stale_declarative_answer() {
        // Declarative says yes, construction fails: the cached OS answer
        // was stale and the capability is reported missing.
        let probe = CannedProbe::new(true, false);
        assert!(!check_intercept_input(&probe));
        assert_eq!(probe.construct_calls.get(), 1);
    }

    #[test]
    fn test_intercept_check_both_stages_positive() {
        let probe = CannedProbe::new(true, true);
        assert!(check_intercept_input(&probe));
    }

    #[test]
    fn test_permission_error_display() {
        let err = PermissionError {
            capability: Capability::ScreenCapture,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Screen Recording permission is required"));
        assert!(msg.contains("System Settings"));
        assert!(msg.contains("open \""));
    }
}
