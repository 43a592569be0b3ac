//! Display and window enumeration.
//!
//! Descriptors are queried fresh from the OS on every call and never cached
//! long-term; display arrangement and window sets change under us. The
//! `xcap`-backed source is the infrastructure layer — everything above it
//! talks to the [`ScreenSource`] trait so the capture engine can be driven
//! by synthetic displays in tests.

use image::RgbaImage;
use xcap::{Monitor, Window};

use crate::capture::CaptureError;
use crate::geometry::Rect;

/// Windows smaller than this on either axis are dropped during enumeration
/// (tooltips, indicator slivers, and similar transients).
const MIN_WINDOW_SIZE: f64 = 50.0;

/// A display as reported by the OS, in capture-space coordinates.
/// The primary display's bounds always have origin (0,0).
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDescriptor {
    pub id: u32,
    pub bounds: Rect,
    pub is_primary: bool,
    /// Ratio of raw captured pixels to logical bounds units. High-resolution
    /// displays report 2.0 or more.
    pub pixel_density: f64,
}

/// A window as reported by the OS, in capture-space coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDescriptor {
    pub id: u32,
    pub owner_name: String,
    pub title: String,
    pub bounds: Rect,
    /// Window-server layer. Normal application windows live on layer 0;
    /// the menu bar, dock, and decorative system surfaces do not.
    pub layer: i32,
    pub is_on_screen: bool,
}

impl WindowDescriptor {
    /// Human-readable label: `"{owner} - {title}"`, or just the owner when
    /// the window has no title.
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            self.owner_name.clone()
        } else {
            format!("{} - {}", self.owner_name, self.title)
        }
    }

    /// Enumeration filter: on-screen layer-0 windows of a useful size.
    pub fn is_capturable(&self) -> bool {
        self.is_on_screen
            && self.layer == 0
            && self.bounds.width >= MIN_WINDOW_SIZE
            && self.bounds.height >= MIN_WINDOW_SIZE
    }
}

/// Live OS state the capture engine depends on.
///
/// `capture_display` and `capture_window` return raw RGBA frames at the
/// display's native pixel density; cropping and density conversion happen
/// in the engine, not here.
pub trait ScreenSource: Send + Sync {
    fn displays(&self) -> Result<Vec<DisplayDescriptor>, CaptureError>;

    /// On-screen, layer-0 windows of a useful size, front to back.
    fn windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError>;

    fn capture_display(&self, id: u32) -> Result<RgbaImage, CaptureError>;

    /// Capture a single window scoped to its id. `include_shadow` asks the
    /// OS to keep the decorative drop shadow around the frame.
    fn capture_window(&self, id: u32, include_shadow: bool)
        -> Result<RgbaImage, CaptureError>;
}

/// Production [`ScreenSource`] backed by the `xcap` crate.
pub struct XcapScreenSource;

impl XcapScreenSource {
    pub fn new() -> Self {
        Self
    }

    fn monitor_by_id(id: u32) -> Result<Monitor, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        for monitor in monitors {
            if monitor.id().map_err(|e| CaptureError::CaptureFailed(e.to_string()))? == id {
                return Ok(monitor);
            }
        }
        Err(CaptureError::NoDisplaysAvailable)
    }
}

impl Default for XcapScreenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenSource for XcapScreenSource {
    fn displays(&self) -> Result<Vec<DisplayDescriptor>, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let mut out = Vec::with_capacity(monitors.len());
        for monitor in monitors {
            let descriptor = (|| -> Result<DisplayDescriptor, xcap::XCapError> {
                Ok(DisplayDescriptor {
                    id: monitor.id()?,
                    bounds: Rect::new(
                        monitor.x()? as f64,
                        monitor.y()? as f64,
                        monitor.width()? as f64,
                        monitor.height()? as f64,
                    ),
                    is_primary: monitor.is_primary()?,
                    pixel_density: monitor.scale_factor()? as f64,
                })
            })();
            match descriptor {
                Ok(d) => out.push(d),
                // Skip displays the OS refuses to describe; a hot-unplugged
                // monitor mid-enumeration shows up this way.
                Err(e) => log::warn!("Skipping undescribable display: {}", e),
            }
        }
        if out.is_empty() {
            return Err(CaptureError::NoDisplaysAvailable);
        }
        Ok(out)
    }

    fn windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError> {
        let windows =
            Window::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let mut out = Vec::new();
        for window in windows {
            let descriptor = (|| -> Result<WindowDescriptor, xcap::XCapError> {
                Ok(WindowDescriptor {
                    id: window.id()?,
                    owner_name: window.app_name()?,
                    title: window.title()?,
                    bounds: Rect::new(
                        window.x()? as f64,
                        window.y()? as f64,
                        window.width()? as f64,
                        window.height()? as f64,
                    ),
                    // xcap only reports normal application windows; system
                    // surfaces (menu bar, dock) never make it this far.
                    layer: 0,
                    is_on_screen: !window.is_minimized()?,
                })
            })();
            match descriptor {
                Ok(d) if d.is_capturable() => out.push(d),
                Ok(_) => {}
                Err(e) => log::debug!("Skipping undescribable window: {}", e),
            }
        }
        Ok(out)
    }

    fn capture_display(&self, id: u32) -> Result<RgbaImage, CaptureError> {
        let monitor = Self::monitor_by_id(id)?;
        monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    fn capture_window(
        &self,
        id: u32,
        include_shadow: bool,
    ) -> Result<RgbaImage, CaptureError> {
        // xcap captures window content without the decorative shadow; there
        // is no toggle to add it back, so the flag is honored by omission.
        let _ = include_shadow;
        let windows =
            Window::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        for window in windows {
            if window.id().map_err(|e| CaptureError::CaptureFailed(e.to_string()))? == id {
                return window
                    .capture_image()
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()));
            }
        }
        Err(CaptureError::WindowNotFound { id })
    }
}
