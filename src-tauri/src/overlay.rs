// =============================================================================
// overlay.rs - Overlay de capture rendu dans la webview
// overlay.rs - Capture overlay rendered in the webview
// =============================================================================
//
// Le moteur dessine via des événements émis vers la webview ; la webview
// renvoie pointeur / clavier / redimensionnement par la commande
// `overlay_event`, transmise ici à la session active.
// The engine draws through events emitted to the webview; the webview
// sends pointer / keyboard / resize back through the `overlay_event`
// command, forwarded here to the active session.

use std::sync::{Mutex, MutexGuard};

use base64::Engine;
use cca_sampler::{MagnifierView, Overlay, OverlayEvent, ProjectionMapping, Raster, Viewport};
use crossbeam_channel::Sender;
use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};
use tracing::{debug, warn};

// Événements émis / Emitted events
const EVENT_SHOW: &str = "overlay-show";
const EVENT_FRAME: &str = "overlay-frame";
const EVENT_MAGNIFIER: &str = "overlay-magnifier";
const EVENT_MAGNIFIER_HIDE: &str = "overlay-magnifier-hide";
const EVENT_HIDE: &str = "overlay-hide";

/// Image RGBA encodée pour la webview
/// RGBA image encoded for the webview
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct ImagePayload {
    width: u32,
    height: u32,
    rgba_base64: String,
}

impl ImagePayload {
    fn from_raster(raster: &Raster) -> Self {
        Self {
            width: raster.width(),
            height: raster.height(),
            rgba_base64: base64::engine::general_purpose::STANDARD.encode(raster.to_rgba()),
        }
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct FramePayload {
    image: ImagePayload,
    mapping: ProjectionMapping,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct MagnifierPayload {
    image: ImagePayload,
    #[serde(flatten)]
    view: MagnifierView,
}

pub struct TauriOverlay {
    app: AppHandle,
    sender: Mutex<Option<Sender<OverlayEvent>>>,
    /// Dernière zone connue, si la fenêtre ne répond pas
    /// Last known box, when the window does not answer
    viewport: Mutex<Viewport>,
}

impl TauriOverlay {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            sender: Mutex::new(None),
            viewport: Mutex::new(Viewport { width: 1280.0, height: 800.0, device_pixel_ratio: 1.0 }),
        }
    }

    /// Transmet un événement de la webview à la session active
    /// Forwards a webview event to the active session
    pub fn forward(&self, event: OverlayEvent) {
        if let OverlayEvent::Resize { width, height, device_pixel_ratio } = event {
            *lock(&self.viewport) = Viewport { width, height, device_pixel_ratio };
        }
        match lock(&self.sender).as_ref() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("Capture session already gone, dropping overlay event");
                }
            }
            None => debug!(?event, "No capture session listening"),
        }
    }

    fn emit<S: Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app.emit(event, payload) {
            warn!(event, error = %e, "Failed to emit overlay event");
        }
    }

    fn window_viewport(&self) -> Option<Viewport> {
        let window = self.app.get_webview_window("main")?;
        let size = window.inner_size().ok()?;
        let scale = window.scale_factor().ok()?;
        Some(Viewport {
            width: f64::from(size.width) / scale,
            height: f64::from(size.height) / scale,
            device_pixel_ratio: scale,
        })
    }
}

impl Overlay for TauriOverlay {
    fn show(&self) -> Viewport {
        let viewport = match self.window_viewport() {
            Some(viewport) => {
                *lock(&self.viewport) = viewport;
                viewport
            }
            None => *lock(&self.viewport),
        };
        self.emit(EVENT_SHOW, viewport);
        viewport
    }

    fn attach(&self, events: Sender<OverlayEvent>) {
        *lock(&self.sender) = Some(events);
    }

    fn detach(&self) {
        lock(&self.sender).take();
    }

    fn draw_frame(&self, frame: &Raster, mapping: &ProjectionMapping) {
        self.emit(EVENT_FRAME, FramePayload { image: ImagePayload::from_raster(frame), mapping: *mapping });
    }

    fn draw_magnifier(&self, view: &MagnifierView) {
        self.emit(
            EVENT_MAGNIFIER,
            MagnifierPayload { image: ImagePayload::from_raster(&view.image), view: view.clone() },
        );
    }

    fn hide_magnifier(&self) {
        self.emit(EVENT_MAGNIFIER_HIDE, ());
    }

    fn hide(&self) {
        self.emit(EVENT_HIDE, ());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
