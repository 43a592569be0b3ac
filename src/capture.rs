//! Capture engine: capture operations and the pending-capture cache.
//!
//! The engine owns the short-lived per-display snapshot cache the hotkey
//! interceptor populates right before a mode handler runs. Serving captures
//! out of that cache is what preserves transient UI state (hover effects,
//! open menus) that would vanish the moment a selection overlay takes input
//! focus. Every capture operation takes the whole cache up front, used or
//! not, so stale frames never leak into an unrelated later capture.

pub mod composite;
pub mod errors;

pub use composite::{composite_rect, DisplayFrame};
pub use errors::CaptureError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use image::RgbaImage;

use crate::display::{DisplayDescriptor, ScreenSource, WindowDescriptor};
use crate::geometry::{Point, Rect};
use crate::permissions;

/// The fixed set of capture modes. Matched exhaustively at every decision
/// point: binding parse, handler dispatch, result tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    FullScreen,
    Area,
    Window,
    CustomRegion,
}

impl CaptureMode {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureMode::FullScreen => "full-screen",
            CaptureMode::Area => "area",
            CaptureMode::Window => "window",
            CaptureMode::CustomRegion => "custom-region",
        }
    }
}

/// One successful capture. Immutable once created; ownership passes to the
/// output layer.
#[derive(Debug)]
pub struct CaptureResult {
    pub image: RgbaImage,
    pub mode: CaptureMode,
    /// Captured region in capture-space logical units.
    pub rect: Rect,
    pub timestamp: SystemTime,
    /// Owning application, when the capture was scoped to a window.
    pub source_app: Option<String>,
}

impl CaptureResult {
    fn new(image: RgbaImage, mode: CaptureMode, rect: Rect) -> Self {
        Self {
            image,
            mode,
            rect,
            timestamp: SystemTime::now(),
            source_app: None,
        }
    }

    fn with_source_app(mut self, app: impl Into<String>) -> Self {
        self.source_app = Some(app.into());
        self
    }
}

/// Owns the pending-capture cache and all capture operations.
///
/// Not a singleton: the composition root creates one engine and hands
/// references to collaborators (the interceptor shares the cache through
/// the engine, never directly).
pub struct CaptureEngine {
    source: Box<dyn ScreenSource>,
    /// DisplayId -> raw frame. Replaced wholesale by `precapture_all`,
    /// taken wholesale by every capture operation.
    cache: Mutex<HashMap<u32, RgbaImage>>,
    /// Last pointer position seen by the tap, capture space. Lets
    /// `capture_full_display(None)` target the display under the cursor.
    pointer: Arc<Mutex<Option<Point>>>,
    include_window_shadow: bool,
    preserve_hover: bool,
}

impl CaptureEngine {
    pub fn new(source: Box<dyn ScreenSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
            pointer: Arc::new(Mutex::new(None)),
            include_window_shadow: false,
            preserve_hover: true,
        }
    }

    /// Keep decorative window shadows in window captures.
    pub fn with_window_shadow(mut self, include: bool) -> Self {
        self.include_window_shadow = include;
        self
    }

    /// Disabling hover preservation turns `precapture_all` into a no-op, so
    /// every capture takes the live path.
    pub fn with_hover_preservation(mut self, preserve: bool) -> Self {
        self.preserve_hover = preserve;
        self
    }

    /// Shared slot the interceptor writes pointer positions into.
    pub fn pointer_hint(&self) -> Arc<Mutex<Option<Point>>> {
        self.pointer.clone()
    }

    pub fn get_displays(&self) -> Result<Vec<DisplayDescriptor>, CaptureError> {
        self.source.displays()
    }

    pub fn get_windows(&self) -> Result<Vec<WindowDescriptor>, CaptureError> {
        self.source.windows()
    }

    /// Cheap capability probe used before spending time on a pre-capture.
    pub fn probe_capture(&self) -> bool {
        permissions::check_capture(self.source.as_ref())
    }

    /// Snapshot every active display into the pending-capture cache.
    ///
    /// Runs on the interceptor's worker thread, never on the tap callback.
    /// The cache is replaced in one assignment so a concurrently running
    /// consumer sees either the old mapping or the new one, never a torn
    /// mix of the two.
    pub fn precapture_all(&self) -> Result<(), CaptureError> {
        if !self.preserve_hover {
            log::debug!("Hover preservation disabled; skipping pre-capture");
            return Ok(());
        }
        let displays = self.source.displays()?;
        let mut frames = HashMap::with_capacity(displays.len());
        for display in &displays {
            match self.source.capture_display(display.id) {
                Ok(image) if image.width() > 0 && image.height() > 0 => {
                    frames.insert(display.id, image);
                }
                Ok(_) => log::warn!("Pre-capture of display {} was empty", display.id),
                Err(e) => log::warn!("Pre-capture of display {} failed: {}", display.id, e),
            }
        }
        log::debug!("Pre-captured {} of {} displays", frames.len(), displays.len());
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = frames;
        Ok(())
    }

    /// Number of cached per-display frames. Exposed for tests and status
    /// output; the capture paths consume the cache through `take_cache`.
    pub fn cached_frame_count(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Consume and clear the whole cache. Unconditional: once any capture
    /// attempt starts, cached frames are spent whether or not they get used.
    fn take_cache(&self) -> HashMap<u32, RgbaImage> {
        std::mem::take(&mut *self.cache.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Capture one full display. `None` targets the display under the
    /// pointer (falling back to the primary display). A cached frame for
    /// the target display wins over a live capture.
    pub fn capture_full_display(
        &self,
        display_id: Option<u32>,
    ) -> Result<CaptureResult, CaptureError> {
        let mut cached = self.take_cache();
        let displays = self.source.displays()?;
        let target = self.resolve_target_display(&displays, display_id)?;

        let image = match cached.remove(&target.id) {
            Some(frame) if frame.width() > 0 && frame.height() > 0 => {
                log::debug!("Serving display {} from pre-capture cache", target.id);
                frame
            }
            _ => self.live_capture_display(target.id)?,
        };

        Ok(CaptureResult::new(
            image,
            CaptureMode::FullScreen,
            target.bounds,
        ))
    }

    /// Capture a specific window. Prefers cropping the window's bounds out
    /// of cached per-display frames (keeping hover state); falls back to a
    /// direct OS window capture scoped to the window id.
    pub fn capture_window(&self, window_id: u32) -> Result<CaptureResult, CaptureError> {
        let cached = self.take_cache();
        let windows = self.source.windows()?;
        let window = windows
            .into_iter()
            .find(|w| w.id == window_id)
            .ok_or(CaptureError::WindowNotFound { id: window_id })?;

        if !cached.is_empty() {
            let displays = self.source.displays()?;
            let frames = pair_frames(&displays, cached);
            match composite_rect(window.bounds, &frames) {
                Ok(image) => {
                    return Ok(CaptureResult::new(image, CaptureMode::Window, window.bounds)
                        .with_source_app(window.owner_name));
                }
                Err(e) => {
                    log::warn!("Cached window crop failed ({}); capturing live", e)
                }
            }
        }

        let image = self
            .source
            .capture_window(window_id, self.include_window_shadow)
            .map_err(|e| self.triage(e))?;
        Ok(CaptureResult::new(image, CaptureMode::Window, window.bounds)
            .with_source_app(window.owner_name))
    }

    /// Capture an arbitrary rectangle in capture space.
    pub fn capture_rect(&self, rect: Rect) -> Result<CaptureResult, CaptureError> {
        self.capture_area(rect, CaptureMode::Area)
    }

    /// Same pixels as [`capture_rect`], tagged as a custom-region capture.
    /// The caller contracts not to persist the region afterwards.
    pub fn capture_custom_region(&self, region: Rect) -> Result<CaptureResult, CaptureError> {
        self.capture_area(region, CaptureMode::CustomRegion)
    }

    fn capture_area(
        &self,
        rect: Rect,
        mode: CaptureMode,
    ) -> Result<CaptureResult, CaptureError> {
        let cached = self.take_cache();
        if rect.is_empty() {
            return Err(CaptureError::InvalidRectangle {
                width: rect.width,
                height: rect.height,
            });
        }
        let displays = self.source.displays()?;

        if !cached.is_empty() {
            let frames = pair_frames(&displays, cached);
            match composite_rect(rect, &frames) {
                Ok(image) => return Ok(CaptureResult::new(image, mode, rect)),
                Err(e) => log::warn!("Cached composite failed ({}); capturing live", e),
            }
        }

        let image = self.live_capture_area(rect, &displays)?;
        Ok(CaptureResult::new(image, mode, rect))
    }

    /// Live path: capture only the displays the rectangle overlaps, then
    /// run the same compositor the cached path uses.
    fn live_capture_area(
        &self,
        rect: Rect,
        displays: &[DisplayDescriptor],
    ) -> Result<RgbaImage, CaptureError> {
        let overlapping: Vec<&DisplayDescriptor> = displays
            .iter()
            .filter(|d| rect.intersection(&d.bounds).is_some())
            .collect();
        if overlapping.is_empty() {
            return Err(CaptureError::CaptureFailed(
                "capture rectangle does not intersect any display".to_string(),
            ));
        }

        let mut frames = Vec::with_capacity(overlapping.len());
        for display in &overlapping {
            match self.source.capture_display(display.id) {
                Ok(image) if image.width() > 0 && image.height() > 0 => {
                    frames.push(DisplayFrame::new(display.bounds, image));
                }
                Ok(_) => log::warn!("Live capture of display {} was empty", display.id),
                Err(e) => log::warn!("Live capture of display {} failed: {}", display.id, e),
            }
        }
        if frames.is_empty() {
            // Every overlapping display refused; decide whether that is a
            // permission problem or a generic failure.
            return Err(self.triage(CaptureError::CaptureFailed(
                "no overlapping display could be captured".to_string(),
            )));
        }
        composite_rect(rect, &frames)
    }

    fn live_capture_display(&self, id: u32) -> Result<RgbaImage, CaptureError> {
        match self.source.capture_display(id) {
            Ok(image) if image.width() > 0 && image.height() > 0 => Ok(image),
            Ok(_) => Err(self.triage(CaptureError::CaptureFailed(format!(
                "display {} capture produced no image",
                id
            )))),
            Err(e) => Err(self.triage(e)),
        }
    }

    fn resolve_target_display<'a>(
        &self,
        displays: &'a [DisplayDescriptor],
        display_id: Option<u32>,
    ) -> Result<&'a DisplayDescriptor, CaptureError> {
        if displays.is_empty() {
            return Err(CaptureError::NoDisplaysAvailable);
        }
        if let Some(id) = display_id {
            return displays.iter().find(|d| d.id == id).ok_or_else(|| {
                CaptureError::CaptureFailed(format!("display {} not found", id))
            });
        }
        let pointer = *self.pointer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = pointer {
            if let Some(display) = displays.iter().find(|d| d.bounds.contains(p)) {
                return Ok(display);
            }
        }
        Ok(displays
            .iter()
            .find(|d| d.is_primary)
            .unwrap_or(&displays[0]))
    }

    /// After a failed OS capture, re-query the capture capability so the
    /// caller gets an actionable permission error instead of a generic one.
    fn triage(&self, err: CaptureError) -> CaptureError {
        match err {
            CaptureError::CaptureFailed(msg) => {
                if permissions::check_capture(self.source.as_ref()) {
                    CaptureError::CaptureFailed(msg)
                } else {
                    CaptureError::PermissionDenied
                }
            }
            other => other,
        }
    }
}

/// Pair cached frames with the bounds of the displays they came from.
/// Frames for displays that vanished since the pre-capture are dropped.
fn pair_frames(
    displays: &[DisplayDescriptor],
    mut cached: HashMap<u32, RgbaImage>,
) -> Vec<DisplayFrame> {
    displays
        .iter()
        .filter_map(|d| {
            cached
                .remove(&d.id)
                .filter(|img| img.width() > 0 && img.height() > 0)
                .map(|img| DisplayFrame::new(d.bounds, img))
        })
        .collect()
}
