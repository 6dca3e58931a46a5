//! =============================================================================
//! CAPTURE.RS - Stratégie capture d'écran + loupe
//! CAPTURE.RS - Display capture + magnifier strategy
//! =============================================================================
//!
//! Acquiert un flux de capture de l'écran, l'affiche dans un overlay, suit le
//! pointeur avec une loupe et lit le pixel exact sous le curseur au clic.
//!
//! Acquires a display capture stream, shows it in an overlay, follows the
//! pointer with a magnifier and reads back the exact pixel under the cursor
//! on click.
//!
//! # États / States
//! `Idle -> AcquiringStream -> Previewing -> Sampling -> TornDown`
//!
//! Chaque chemin de sortie (clic, Échap, bouton, clic droit, refus de
//! capture, overlay fermé) passe par `teardown()`, exécuté une seule fois.
//! Every exit path (click, Escape, button, right click, capture refused,
//! overlay closed) goes through `teardown()`, which runs exactly once.
//!
//! # Contrôles / Controls
//! - Souris / Mouse: déplacer la loupe / move the magnifier
//! - Clic / Click: choisir la couleur / pick the color
//! - Entrée, Espace / Enter, Space: choisir sous le pointeur / pick under the pointer
//! - Flèches / Arrow keys: 1 pixel (Shift: 50 pixels)
//! - Molette / Scroll wheel: zoom de la loupe / magnifier zoom
//! - Échap, clic droit / Escape, right click: annuler / cancel

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{never, select, tick, unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::common::{CancelToken, PickOutcome, PickStrategy};
use super::magnifier::{place_magnifier, render_magnifier, MagnifierView};
use crate::color::Rgb;
use crate::config::{self, SamplerConfig};
use crate::error::CaptureError;
use crate::projection::{Point, ProjectionMapping, Size};
use crate::raster::Raster;

// =============================================================================
// INTERFACES PLATEFORME
// PLATFORM INTERFACES
// =============================================================================

/// Source de capture de l'écran
/// Display capture source
pub trait DisplayCapture: Send + Sync {
    /// Demande un flux ; peut bloquer le temps que l'utilisateur réponde
    /// Requests a stream; may block while the user answers
    fn start(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// Flux de capture actif
/// Active capture stream
pub trait CaptureStream: Send {
    /// Trame la plus récente, `None` si rien de nouveau
    /// Most recent frame, `None` when nothing new
    fn frame(&mut self) -> Option<Raster>;

    /// Arrête toutes les pistes du flux
    /// Stops every track of the stream
    fn stop(&mut self);
}

/// Zone de projection de l'overlay, en coordonnées logiques
/// Overlay projection box, in logical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn logical_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn device_size(&self) -> Size {
        Size::new(self.width * self.device_pixel_ratio, self.height * self.device_pixel_ratio)
    }
}

/// Touches gérées par l'overlay (valeurs `KeyboardEvent.key`)
/// Keys handled by the overlay (`KeyboardEvent.key` values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    #[serde(alias = " ")]
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    #[serde(other)]
    Other,
}

/// Événements envoyés par l'overlay, traités dans l'ordre d'arrivée
/// Events sent by the overlay, handled in arrival order
///
/// Les coordonnées sont logiques, relatives à la zone de projection.
/// Coordinates are logical, relative to the projection box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OverlayEvent {
    PointerMove { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    SecondaryClick,
    Key {
        key: Key,
        #[serde(default)]
        shift: bool,
    },
    #[serde(rename_all = "camelCase")]
    Wheel { delta_y: f64 },
    #[serde(rename_all = "camelCase")]
    Resize { width: f64, height: f64, device_pixel_ratio: f64 },
    CancelButton,
}

/// Surface d'affichage de l'overlay
/// Overlay display surface
pub trait Overlay: Send + Sync {
    /// Affiche l'overlay et retourne la zone de projection
    /// Shows the overlay and returns the projection box
    fn show(&self) -> Viewport;

    /// Enregistre les écouteurs pointeur / clavier / redimensionnement
    /// Registers the pointer / keyboard / resize listeners
    fn attach(&self, events: Sender<OverlayEvent>);

    /// Retire tous les écouteurs enregistrés
    /// Removes every registered listener
    fn detach(&self);

    fn draw_frame(&self, frame: &Raster, mapping: &ProjectionMapping);

    fn draw_magnifier(&self, view: &MagnifierView);

    fn hide_magnifier(&self);

    fn hide(&self);
}

// =============================================================================
// SESSION DE CAPTURE
// CAPTURE SESSION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AcquiringStream,
    Previewing,
    Sampling,
    TornDown,
}

/// Une session de capture : flux, écouteurs, minuterie et tampon affiché
/// One capture session: stream, listeners, timer and displayed buffer
pub struct CaptureSession {
    state: SessionState,
    overlay: Arc<dyn Overlay>,
    stream: Option<Box<dyn CaptureStream>>,
    ticker: Option<Receiver<Instant>>,
    listening: bool,
    viewport: Viewport,
    /// Dernière trame dessinée ; c'est elle qu'on échantillonne
    /// Last drawn frame; this is the one being sampled
    backing: Option<Raster>,
    mapping: Option<ProjectionMapping>,
    /// Pointeur en coordonnées logiques, converti avec le ratio courant
    /// Pointer in logical coordinates, converted with the current ratio
    pointer: Option<Point>,
    zoom: u32,
    captured_pixels: u32,
    magnifier_offset: f64,
    redraw_interval: Duration,
    teardowns: usize,
}

impl CaptureSession {
    pub fn new(overlay: Arc<dyn Overlay>, config: &SamplerConfig) -> Self {
        Self {
            state: SessionState::Idle,
            overlay,
            stream: None,
            ticker: None,
            listening: false,
            viewport: Viewport { width: 0.0, height: 0.0, device_pixel_ratio: 1.0 },
            backing: None,
            mapping: None,
            pointer: None,
            zoom: config.zoom.clamp(config::ZOOM_MIN, config::ZOOM_MAX),
            captured_pixels: config.captured_pixels.max(1),
            magnifier_offset: config.magnifier_offset,
            redraw_interval: Duration::from_millis(config.redraw_interval_ms.max(1)),
            teardowns: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mapping(&self) -> Option<&ProjectionMapping> {
        self.mapping.as_ref()
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Nombre de démontages effectifs (0 ou 1)
    /// Number of effective teardowns (0 or 1)
    pub fn teardown_count(&self) -> usize {
        self.teardowns
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn has_timer(&self) -> bool {
        self.ticker.is_some()
    }

    /// Acquiert le flux et ouvre l'overlay
    /// Acquires the stream and opens the overlay
    ///
    /// En cas de refus, la session est démontée sans rien afficher.
    /// On refusal the session is torn down without showing anything.
    pub fn start(&mut self, capture: &dyn DisplayCapture) -> Result<Receiver<OverlayEvent>, PickOutcome> {
        if self.state != SessionState::Idle {
            return Err(PickOutcome::Cancelled);
        }

        self.state = SessionState::AcquiringStream;
        debug!("Requesting display capture stream");
        let stream = match capture.start() {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Display capture refused");
                self.teardown();
                return Err(PickOutcome::CaptureDenied { reason: e.to_string() });
            }
        };

        self.stream = Some(stream);
        self.state = SessionState::Previewing;
        self.viewport = self.overlay.show();

        let (tx, rx) = unbounded();
        self.overlay.attach(tx);
        self.listening = true;
        self.ticker = Some(tick(self.redraw_interval));

        info!(viewport = ?self.viewport, "Capture overlay open");
        self.redraw();
        Ok(rx)
    }

    /// Boucle d'événements : file ordonnée + minuterie + annulation
    /// Event loop: ordered queue + timer + cancellation
    pub fn run(&mut self, events: &Receiver<OverlayEvent>, cancel: &CancelToken) -> PickOutcome {
        loop {
            if self.state == SessionState::TornDown {
                return PickOutcome::Cancelled;
            }
            let ticker = self.ticker.clone().unwrap_or_else(never);

            select! {
                recv(cancel.signal()) -> _ => return self.cancel(),
                recv(events) -> event => match event {
                    Ok(event) => {
                        if let Some(outcome) = self.handle_event(event) {
                            return outcome;
                        }
                    }
                    Err(_) => {
                        debug!("Overlay event queue closed");
                        return self.cancel();
                    }
                },
                recv(ticker) -> _ => self.redraw(),
            }
        }
    }

    /// Traite un événement ; `Some` quand la session se termine
    /// Handles one event; `Some` when the session ends
    pub fn handle_event(&mut self, event: OverlayEvent) -> Option<PickOutcome> {
        if self.state != SessionState::Previewing {
            return None;
        }

        match event {
            OverlayEvent::PointerMove { x, y } => {
                self.pointer = Some(Point::new(x, y));
                self.update_magnifier();
                None
            }
            OverlayEvent::Click { x, y } => {
                self.pointer = Some(Point::new(x, y));
                self.sample()
            }
            OverlayEvent::Key { key: Key::Enter | Key::Space, .. } => self.sample(),
            OverlayEvent::Key { key: Key::Escape, .. } | OverlayEvent::SecondaryClick | OverlayEvent::CancelButton => {
                Some(self.cancel())
            }
            OverlayEvent::Key { key, shift } => {
                self.nudge(key, shift);
                None
            }
            // Défilement horizontal : pas de zoom / Horizontal scroll: no zoom
            OverlayEvent::Wheel { delta_y } if delta_y == 0.0 => None,
            OverlayEvent::Wheel { delta_y } => {
                self.zoom = if delta_y < 0.0 {
                    (self.zoom + config::ZOOM_STEP).min(config::ZOOM_MAX)
                } else {
                    self.zoom.saturating_sub(config::ZOOM_STEP).max(config::ZOOM_MIN)
                };
                self.update_magnifier();
                None
            }
            OverlayEvent::Resize { width, height, device_pixel_ratio } => {
                self.viewport = Viewport { width, height, device_pixel_ratio };
                self.refit();
                None
            }
        }
    }

    /// Rafraîchit la trame depuis le flux et redessine
    /// Refreshes the frame from the stream and redraws
    pub fn redraw(&mut self) {
        if self.state != SessionState::Previewing {
            return;
        }
        // Rien de nouveau : la trame affichée reste valable
        // Nothing new: the displayed frame stays valid
        let Some(frame) = self.stream.as_mut().and_then(|s| s.frame()) else {
            return;
        };
        if self.backing.as_ref() == Some(&frame) {
            return;
        }
        self.backing = Some(frame);
        self.refit();
    }

    /// Annulation explicite : démontage sans échantillonnage
    /// Explicit cancellation: teardown without sampling
    pub fn cancel(&mut self) -> PickOutcome {
        if self.teardown() {
            info!("Capture pick cancelled");
        }
        PickOutcome::Cancelled
    }

    /// Arrête le flux, retire les écouteurs, coupe la minuterie, cache l'overlay
    /// Stops the stream, removes listeners, cancels the timer, hides the overlay
    ///
    /// Idempotent ; retourne `true` seulement au premier appel effectif.
    /// Idempotent; returns `true` only on the first effective call.
    pub fn teardown(&mut self) -> bool {
        if self.state == SessionState::TornDown {
            return false;
        }

        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        if self.listening {
            self.overlay.detach();
            self.listening = false;
        }
        self.ticker = None;
        if matches!(self.state, SessionState::Previewing | SessionState::Sampling) {
            self.overlay.hide_magnifier();
            self.overlay.hide();
        }

        self.state = SessionState::TornDown;
        self.teardowns += 1;
        debug!("Capture session torn down");
        true
    }

    // -------------------------------------------------------------------------
    // Interne / Internal
    // -------------------------------------------------------------------------

    /// Recalcule le placement et redessine la trame courante (sans nouvelle capture)
    /// Recomputes the mapping and redraws the current frame (no new capture)
    fn refit(&mut self) {
        let Some(backing) = self.backing.as_ref() else {
            return;
        };
        self.mapping = ProjectionMapping::contain(backing.size(), self.viewport.device_size());
        if let Some(mapping) = self.mapping.as_ref() {
            self.overlay.draw_frame(backing, mapping);
        }
        self.update_magnifier();
    }

    /// Pixel source sous le pointeur, avec le placement courant
    /// Source pixel under the pointer, with the current mapping
    fn pointed_pixel(&self) -> Option<((u32, u32), Rgb)> {
        let pointer = self.pointer?.to_device(self.viewport.device_pixel_ratio);
        let source = self.mapping.as_ref()?.source_pixel(pointer)?;
        let color = self.backing.as_ref()?.pixel(source.0, source.1)?;
        Some((source, color))
    }

    fn sample(&mut self) -> Option<PickOutcome> {
        let Some((source, color)) = self.pointed_pixel() else {
            debug!(pointer = ?self.pointer, "Nothing to sample under the pointer");
            return None;
        };

        self.state = SessionState::Sampling;
        let hex = color.to_hex();
        info!(x = source.0, y = source.1, %hex, "Sampled pixel");
        self.teardown();
        Some(PickOutcome::Picked { hex })
    }

    /// Déplace le pointeur d'un nombre de pixels physiques
    /// Moves the pointer by a number of device pixels
    fn nudge(&mut self, key: Key, shift: bool) {
        let device_step = if shift { config::SHIFT_MOVE_PIXELS } else { config::MOVE_PIXELS };
        let step = device_step / self.viewport.device_pixel_ratio;
        let (dx, dy) = match key {
            Key::ArrowLeft => (-step, 0.0),
            Key::ArrowRight => (step, 0.0),
            Key::ArrowUp => (0.0, -step),
            Key::ArrowDown => (0.0, step),
            _ => return,
        };
        let current = self
            .pointer
            .unwrap_or_else(|| Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0));
        self.pointer = Some(Point::new(current.x + dx, current.y + dy));
        self.update_magnifier();
    }

    fn update_magnifier(&self) {
        let (Some(pointer), Some((source, color)), Some(backing)) =
            (self.pointer, self.pointed_pixel(), self.backing.as_ref())
        else {
            self.overlay.hide_magnifier();
            return;
        };

        let fill = Rgb::from(config::OUT_OF_BOUNDS_RGB);
        let image = render_magnifier(backing, source, self.captured_pixels, self.zoom, fill);
        let dpr = self.viewport.device_pixel_ratio;
        let size = Size::new(f64::from(image.width()) / dpr, f64::from(image.height()) / dpr);
        let position = place_magnifier(pointer, size, self.viewport.logical_size(), self.magnifier_offset);

        self.overlay.draw_magnifier(&MagnifierView {
            image,
            position,
            size,
            source_pixel: source,
            color,
            hex: color.to_hex(),
        });
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// STRATÉGIE
// STRATEGY
// =============================================================================

/// Stratégie de repli : capture de l'écran + loupe
/// Fallback strategy: display capture + magnifier
pub struct CaptureStrategy {
    capture: Arc<dyn DisplayCapture>,
    overlay: Arc<dyn Overlay>,
    config: SamplerConfig,
}

impl CaptureStrategy {
    pub fn new(capture: Arc<dyn DisplayCapture>, overlay: Arc<dyn Overlay>, config: SamplerConfig) -> Self {
        Self { capture, overlay, config }
    }
}

impl PickStrategy for CaptureStrategy {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn pick(&self, cancel: &CancelToken) -> PickOutcome {
        let mut session = CaptureSession::new(Arc::clone(&self.overlay), &self.config);
        if cancel.is_cancelled() {
            return session.cancel();
        }

        let events = match session.start(self.capture.as_ref()) {
            Ok(events) => events,
            Err(outcome) => return outcome,
        };
        session.run(&events, cancel)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::common::cancellation;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -------------------------------------------------------------------------
    // Doublures / Test doubles
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeOverlay {
        script: Vec<OverlayEvent>,
        viewport: Option<Viewport>,
        sender: Mutex<Option<Sender<OverlayEvent>>>,
        visible: Mutex<bool>,
        shows: AtomicUsize,
        hides: AtomicUsize,
        detaches: AtomicUsize,
        frames: Mutex<Vec<(Raster, ProjectionMapping)>>,
        magnifiers: Mutex<Vec<MagnifierView>>,
    }

    impl FakeOverlay {
        fn scripted(script: Vec<OverlayEvent>) -> Arc<Self> {
            Arc::new(Self { script, ..Self::default() })
        }
        fn visible(&self) -> bool {
            *self.visible.lock().unwrap()
        }
        fn listening(&self) -> bool {
            self.sender.lock().unwrap().is_some()
        }
    }

    impl Overlay for FakeOverlay {
        fn show(&self) -> Viewport {
            self.shows.fetch_add(1, Ordering::SeqCst);
            *self.visible.lock().unwrap() = true;
            self.viewport.unwrap_or(Viewport { width: 880.0, height: 600.0, device_pixel_ratio: 1.0 })
        }
        fn attach(&self, events: Sender<OverlayEvent>) {
            for event in &self.script {
                events.send(event.clone()).unwrap();
            }
            *self.sender.lock().unwrap() = Some(events);
        }
        fn detach(&self) {
            self.detaches.fetch_add(1, Ordering::SeqCst);
            self.sender.lock().unwrap().take();
        }
        fn draw_frame(&self, frame: &Raster, mapping: &ProjectionMapping) {
            self.frames.lock().unwrap().push((frame.clone(), *mapping));
        }
        fn draw_magnifier(&self, view: &MagnifierView) {
            self.magnifiers.lock().unwrap().push(view.clone());
        }
        fn hide_magnifier(&self) {}
        fn hide(&self) {
            self.hides.fetch_add(1, Ordering::SeqCst);
            *self.visible.lock().unwrap() = false;
        }
    }

    #[derive(Default)]
    struct StreamLog {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    /// 1600×1200, chaque trame a une couleur de base différente
    /// 1600×1200, every frame has a different base color
    struct FakeCapture {
        deny: bool,
        feed: Feed,
        log: Arc<StreamLog>,
    }

    /// Ce que le flux rend à chaque appel de `frame`
    /// What the stream yields on each `frame` call
    #[derive(Clone, Copy, PartialEq)]
    enum Feed {
        /// Nouvelle trame à chaque fois / New frame every time
        Fresh,
        /// Toujours la même trame / Always the same frame
        Still,
        /// Une seule trame puis rien / One frame then nothing
        Once,
    }

    struct FakeStream {
        serial: u8,
        feed: Feed,
        log: Arc<StreamLog>,
    }

    impl DisplayCapture for FakeCapture {
        fn start(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
            if self.deny {
                return Err(CaptureError::Denied("permission refused".into()));
            }
            self.log.started.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream { serial: 0, feed: self.feed, log: Arc::clone(&self.log) }))
        }
    }

    fn frame(serial: u8) -> Raster {
        Raster::from_fn(1600, 1200, move |x, y| Rgb::new(serial, (x % 256) as u8, (y % 256) as u8))
    }

    impl CaptureStream for FakeStream {
        fn frame(&mut self) -> Option<Raster> {
            match self.feed {
                Feed::Fresh => self.serial = self.serial.wrapping_add(1),
                Feed::Still => self.serial = 1,
                Feed::Once if self.serial > 0 => return None,
                Feed::Once => self.serial = 1,
            }
            Some(frame(self.serial))
        }
        fn stop(&mut self) {
            self.log.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn capture(deny: bool) -> (Arc<FakeCapture>, Arc<StreamLog>) {
        fed_capture(deny, Feed::Fresh)
    }

    fn fed_capture(deny: bool, feed: Feed) -> (Arc<FakeCapture>, Arc<StreamLog>) {
        let log = Arc::new(StreamLog::default());
        (Arc::new(FakeCapture { deny, feed, log: Arc::clone(&log) }), log)
    }

    fn slow_config() -> SamplerConfig {
        // Minuterie longue : seul le dessin initial a lieu pendant les tests
        // Long timer: only the initial draw happens during the tests
        SamplerConfig { redraw_interval_ms: 60_000, ..SamplerConfig::default() }
    }

    fn started_session(overlay: &Arc<FakeOverlay>) -> (CaptureSession, Receiver<OverlayEvent>, Arc<StreamLog>) {
        started_session_with(overlay, Feed::Fresh)
    }

    fn started_session_with(
        overlay: &Arc<FakeOverlay>,
        feed: Feed,
    ) -> (CaptureSession, Receiver<OverlayEvent>, Arc<StreamLog>) {
        let (cap, log) = fed_capture(false, feed);
        let overlay_dyn: Arc<dyn Overlay> = overlay.clone();
        let mut session = CaptureSession::new(overlay_dyn, &slow_config());
        let rx = session.start(cap.as_ref()).unwrap();
        (session, rx, log)
    }

    fn assert_torn_down(session: &CaptureSession, overlay: &FakeOverlay, log: &StreamLog) {
        assert_eq!(session.state(), SessionState::TornDown);
        assert_eq!(session.teardown_count(), 1);
        assert!(!session.has_stream());
        assert!(!session.has_timer());
        assert!(!overlay.visible());
        assert!(!overlay.listening());
        assert_eq!(log.stopped.load(Ordering::SeqCst), log.started.load(Ordering::SeqCst));
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_start_shows_overlay_and_draws_first_frame() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (session, _rx, _log) = started_session(&overlay);
        assert_eq!(session.state(), SessionState::Previewing);
        assert!(overlay.visible());
        assert!(overlay.listening());
        assert!(session.has_timer());

        let mapping = *session.mapping().unwrap();
        assert_eq!(mapping.scale, 0.5);
        assert_eq!(mapping.offset_x, 40.0);
        assert_eq!(mapping.offset_y, 0.0);
        assert_eq!(overlay.frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_click_samples_last_drawn_frame() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, log) = started_session(&overlay);
        session.redraw();
        session.redraw();

        assert_eq!(session.handle_event(OverlayEvent::PointerMove { x: 420.0, y: 300.0 }), None);
        let outcome = session.handle_event(OverlayEvent::Click { x: 420.0, y: 300.0 }).unwrap();

        let frames = overlay.frames.lock().unwrap();
        let (last, mapping) = frames.last().unwrap();
        assert_eq!(mapping.source_pixel(Point::new(420.0, 300.0)), Some((760, 600)));
        let expected = last.pixel(760, 600).unwrap();
        assert_eq!(expected, Rgb::new(3, (760 % 256) as u8, (600 % 256) as u8));
        assert_eq!(outcome, PickOutcome::Picked { hex: expected.to_hex() });
        drop(frames);

        assert_torn_down(&session, &overlay, &log);
    }

    #[test]
    fn test_device_pixel_ratio_applies_before_inverse_mapping() {
        let overlay = Arc::new(FakeOverlay {
            viewport: Some(Viewport { width: 440.0, height: 300.0, device_pixel_ratio: 2.0 }),
            ..FakeOverlay::default()
        });
        let (mut session, _rx, _log) = started_session(&overlay);
        // 210×2 = 420, 150×2 = 300 -> source (760, 600)
        let outcome = session.handle_event(OverlayEvent::Click { x: 210.0, y: 150.0 }).unwrap();
        assert_eq!(outcome, PickOutcome::Picked { hex: Rgb::new(1, 248, 88).to_hex() });
    }

    #[test]
    fn test_click_in_letterbox_is_ignored() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        assert_eq!(session.handle_event(OverlayEvent::Click { x: 10.0, y: 300.0 }), None);
        assert_eq!(session.state(), SessionState::Previewing);
    }

    #[test]
    fn test_magnifier_follows_pointer() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        session.handle_event(OverlayEvent::PointerMove { x: 420.0, y: 300.0 });

        let views = overlay.magnifiers.lock().unwrap();
        let view = views.last().unwrap();
        assert_eq!(view.source_pixel, (760, 600));
        assert_eq!(view.image.width(), config::CAPTURED_PIXELS * config::INITIAL_ZOOM_FACTOR);
        assert_eq!(view.position, Point::new(444.0, 324.0));
        assert_eq!(view.hex, view.color.to_hex());
    }

    #[test]
    fn test_magnifier_flips_near_edge() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        session.handle_event(OverlayEvent::PointerMove { x: 800.0, y: 500.0 });
        let views = overlay.magnifiers.lock().unwrap();
        let view = views.last().unwrap();
        assert_eq!(view.position, Point::new(800.0 - 24.0 - 160.0, 500.0 - 24.0 - 160.0));
    }

    #[test]
    fn test_wheel_changes_zoom_within_bounds() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        for _ in 0..20 {
            session.handle_event(OverlayEvent::Wheel { delta_y: -1.0 });
        }
        assert_eq!(session.zoom(), config::ZOOM_MAX);
        for _ in 0..20 {
            session.handle_event(OverlayEvent::Wheel { delta_y: 1.0 });
        }
        assert_eq!(session.zoom(), config::ZOOM_MIN);
    }

    #[test]
    fn test_zero_wheel_delta_keeps_zoom() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        assert_eq!(session.handle_event(OverlayEvent::Wheel { delta_y: 0.0 }), None);
        assert_eq!(session.zoom(), config::INITIAL_ZOOM_FACTOR);
        session.handle_event(OverlayEvent::Wheel { delta_y: -0.0 });
        assert_eq!(session.zoom(), config::INITIAL_ZOOM_FACTOR);
    }

    #[test]
    fn test_arrow_keys_then_enter() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        session.handle_event(OverlayEvent::PointerMove { x: 420.0, y: 300.0 });
        session.handle_event(OverlayEvent::Key { key: Key::ArrowRight, shift: true });
        session.handle_event(OverlayEvent::Key { key: Key::ArrowDown, shift: false });
        // (470, 301) -> source (860, 602)
        let outcome = session.handle_event(OverlayEvent::Key { key: Key::Enter, shift: false }).unwrap();
        assert_eq!(outcome, PickOutcome::Picked { hex: Rgb::new(1, (860 % 256) as u8, (602 % 256) as u8).to_hex() });
    }

    #[test]
    fn test_resize_refits_without_new_frame() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        session.handle_event(OverlayEvent::Resize { width: 400.0, height: 600.0, device_pixel_ratio: 1.0 });

        let mapping = *session.mapping().unwrap();
        assert_eq!(mapping.scale, 0.25);
        assert_eq!(mapping.offset_y, 150.0);
        let frames = overlay.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, frames[1].0);
    }

    #[test]
    fn test_pointer_stays_on_pixel_when_ratio_changes() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        session.handle_event(OverlayEvent::PointerMove { x: 420.0, y: 300.0 });
        assert_eq!(overlay.magnifiers.lock().unwrap().last().unwrap().source_pixel, (760, 600));

        // Même zone logique, écran 2x : 1760×1200 physiques, échelle 1, marge 80
        // Same logical box, 2x screen: 1760×1200 device, scale 1, margin 80
        session.handle_event(OverlayEvent::Resize { width: 880.0, height: 600.0, device_pixel_ratio: 2.0 });
        let mapping = *session.mapping().unwrap();
        assert_eq!(mapping.scale, 1.0);
        assert_eq!(mapping.offset_x, 80.0);
        assert_eq!(overlay.magnifiers.lock().unwrap().last().unwrap().source_pixel, (760, 600));

        let outcome = session.handle_event(OverlayEvent::Key { key: Key::Enter, shift: false }).unwrap();
        assert_eq!(outcome, PickOutcome::Picked { hex: Rgb::new(1, 248, 88).to_hex() });
    }

    #[test]
    fn test_arrow_step_is_device_pixels() {
        let overlay = Arc::new(FakeOverlay {
            viewport: Some(Viewport { width: 440.0, height: 300.0, device_pixel_ratio: 2.0 }),
            ..FakeOverlay::default()
        });
        let (mut session, _rx, _log) = started_session(&overlay);
        session.handle_event(OverlayEvent::PointerMove { x: 210.0, y: 150.0 });
        session.handle_event(OverlayEvent::Key { key: Key::ArrowRight, shift: false });
        // 2 × 210 + 1 = 421 physiques -> source 762
        // 2 × 210 + 1 = 421 device -> source 762
        let view = overlay.magnifiers.lock().unwrap().last().unwrap().clone();
        assert_eq!(view.source_pixel, (762, 600));
    }

    #[test]
    fn test_idle_ticks_do_not_redraw() {
        for feed in [Feed::Still, Feed::Once] {
            let overlay = FakeOverlay::scripted(vec![]);
            let (mut session, _rx, _log) = started_session_with(&overlay, feed);
            for _ in 0..10 {
                session.redraw();
            }
            assert_eq!(overlay.frames.lock().unwrap().len(), 1);
            assert_eq!(session.state(), SessionState::Previewing);
        }
    }

    #[test]
    fn test_new_frame_is_drawn_on_tick() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, _log) = started_session(&overlay);
        session.redraw();
        session.redraw();
        assert_eq!(overlay.frames.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_every_terminal_path_tears_down_once() {
        let exits = [
            OverlayEvent::Key { key: Key::Escape, shift: false },
            OverlayEvent::CancelButton,
            OverlayEvent::SecondaryClick,
        ];
        for exit in exits {
            let overlay = FakeOverlay::scripted(vec![]);
            let (mut session, _rx, log) = started_session(&overlay);
            assert_eq!(session.handle_event(exit.clone()), Some(PickOutcome::Cancelled));
            assert_torn_down(&session, &overlay, &log);
            assert_eq!(overlay.hides.load(Ordering::SeqCst), 1);
            assert_eq!(overlay.detaches.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_teardown_idempotent() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, _rx, log) = started_session(&overlay);
        session.handle_event(OverlayEvent::Click { x: 420.0, y: 300.0 }).unwrap();
        // Annuler après un choix réussi, deux fois
        // Cancel after a successful pick, twice
        assert_eq!(session.cancel(), PickOutcome::Cancelled);
        assert_eq!(session.cancel(), PickOutcome::Cancelled);
        assert!(!session.teardown());
        assert_torn_down(&session, &overlay, &log);
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 1);
        // Plus aucun événement traité / No event handled anymore
        assert_eq!(session.handle_event(OverlayEvent::Click { x: 420.0, y: 300.0 }), None);
    }

    #[test]
    fn test_denied_capture_shows_nothing() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (cap, log) = capture(true);
        let strategy = CaptureStrategy::new(cap, overlay.clone(), slow_config());
        let (_handle, token) = cancellation();
        match strategy.pick(&token) {
            PickOutcome::CaptureDenied { reason } => assert!(reason.contains("permission refused")),
            other => panic!("expected a denial, got {other:?}"),
        }
        assert_eq!(overlay.shows.load(Ordering::SeqCst), 0);
        assert_eq!(overlay.hides.load(Ordering::SeqCst), 0);
        assert!(!overlay.listening());
        assert_eq!(log.started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_strategy_end_to_end() {
        let overlay = FakeOverlay::scripted(vec![
            OverlayEvent::PointerMove { x: 100.0, y: 100.0 },
            OverlayEvent::PointerMove { x: 420.0, y: 300.0 },
            OverlayEvent::Click { x: 420.0, y: 300.0 },
        ]);
        let (cap, log) = capture(false);
        let strategy = CaptureStrategy::new(cap, overlay.clone(), slow_config());
        let (_handle, token) = cancellation();

        let outcome = strategy.pick(&token);
        let frames = overlay.frames.lock().unwrap();
        let expected = frames.last().unwrap().0.pixel(760, 600).unwrap();
        assert_eq!(outcome, PickOutcome::Picked { hex: expected.to_hex() });
        assert!(!overlay.visible());
        assert!(!overlay.listening());
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_strategy_cancel_while_previewing() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (cap, log) = capture(false);
        let strategy = CaptureStrategy::new(cap, overlay.clone(), SamplerConfig::default());
        let (handle, token) = cancellation();

        let worker = std::thread::spawn(move || strategy.pick(&token));
        while overlay.shows.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();
        assert_eq!(worker.join().unwrap(), PickOutcome::Cancelled);
        assert!(!overlay.visible());
        assert!(!overlay.listening());
        assert_eq!(log.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_overlay_cancels() {
        let overlay = FakeOverlay::scripted(vec![]);
        let (mut session, rx, log) = started_session(&overlay);
        overlay.sender.lock().unwrap().take();
        let (_handle, token) = cancellation();
        assert_eq!(session.run(&rx, &token), PickOutcome::Cancelled);
        assert_torn_down(&session, &overlay, &log);
    }

    #[test]
    fn test_events_deserialize_from_ui_json() {
        let event: OverlayEvent = serde_json::from_str(r#"{"type":"pointerMove","x":1.5,"y":2}"#).unwrap();
        assert_eq!(event, OverlayEvent::PointerMove { x: 1.5, y: 2.0 });
        let event: OverlayEvent = serde_json::from_str(r#"{"type":"key","key":" "}"#).unwrap();
        assert_eq!(event, OverlayEvent::Key { key: Key::Space, shift: false });
        let event: OverlayEvent = serde_json::from_str(r#"{"type":"key","key":"Tab","shift":true}"#).unwrap();
        assert_eq!(event, OverlayEvent::Key { key: Key::Other, shift: true });
        let event: OverlayEvent =
            serde_json::from_str(r#"{"type":"resize","width":800,"height":600,"devicePixelRatio":2}"#).unwrap();
        assert_eq!(event, OverlayEvent::Resize { width: 800.0, height: 600.0, device_pixel_ratio: 2.0 });
    }
}
