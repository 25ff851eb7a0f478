//! Recording display doubles for unit and integration tests.
//!
//! # Why recording doubles?
//!
//! The real adapters talk to live X servers: they grab the pointer, warp it
//! and inject input through XTest.  None of that can run in CI, and none of
//! it can be observed from Rust test code.
//!
//! [`RecordingSource`] and [`RecordingDestination`] replace every server
//! call with in-memory recording.  Each call is pushed into a
//! `Mutex<Vec<...>>` so assertions can inspect exactly what happened and in
//! what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let dest = Rc::new(RecordingDestination::new("dest"));
//! let forwarder = InputForwarder::new(config, vec![Rc::clone(&dest) as Rc<dyn Destination>]);
//!
//! forwarder.motion(0, 40, 50);
//!
//! assert_eq!(dest.injected(), vec![Injected::Motion(0, 40, 50)]);
//! ```
//!
//! # Keycodes
//!
//! [`RecordingDestination`] derives a stable keycode from every keysym (see
//! [`RecordingDestination::keycode_of`]).  Tests can remove a keysym from
//! the keyboard map with `forget_keysym` and describe a key's shift levels
//! with `set_levels`.
//!
//! # `should_fail` flag
//!
//! Set it with `set_should_fail(true)` to make every injection return an
//! [`InjectError`], or `set_refuse_grab(true)` on the source to make grabs
//! fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use edgeshift_core::Keysym;

use crate::application::connection::{SourceControl, SourceError};
use crate::application::forward_input::{Destination, InjectError};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Destination ───────────────────────────────────────────────────────────────

/// One input event injected into a [`RecordingDestination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injected {
    /// `(screen, x, y)`
    Motion(usize, i32, i32),
    /// `(button, pressed)`
    Button(u32, bool),
    /// `(keycode, pressed)`
    Key(u8, bool),
}

/// A destination that records every injected event.
#[derive(Debug, Default)]
pub struct RecordingDestination {
    name: String,
    /// Every injected event, in order.
    injected: Mutex<Vec<Injected>>,
    flushes: AtomicUsize,
    wakes: AtomicUsize,
    /// Keysyms with no keycode on this display.
    forgotten: Mutex<Vec<Keysym>>,
    /// `(keycode, unshifted, shifted)` entries for `keysym_at`.
    levels: Mutex<Vec<(u8, Keysym, Keysym)>>,
    /// When `true`, every injection returns `InjectError::Platform`.
    should_fail: AtomicBool,
}

impl RecordingDestination {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// The keycode this double assigns to `keysym`.
    pub fn keycode_of(&self, keysym: Keysym) -> u8 {
        (8 + keysym.0 % 240) as u8
    }

    pub fn forget_keysym(&self, keysym: Keysym) {
        lock(&self.forgotten).push(keysym);
    }

    /// Makes the key that produces `keysym` report `plain` and `shifted` as
    /// its two shift levels.
    pub fn set_levels(&self, keysym: Keysym, plain: Keysym, shifted: Keysym) {
        let keycode = self.keycode_of(keysym);
        lock(&self.levels).push((keycode, plain, shifted));
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub fn injected(&self) -> Vec<Injected> {
        lock(&self.injected).clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn wake_count(&self) -> usize {
        self.wakes.load(Ordering::Relaxed)
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        lock(&self.injected).clear();
        self.flushes.store(0, Ordering::Relaxed);
        self.wakes.store(0, Ordering::Relaxed);
    }

    fn record(&self, event: Injected) -> Result<(), InjectError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(InjectError::Platform {
                display: self.name.clone(),
                reason: "mock failure".to_string(),
            });
        }
        lock(&self.injected).push(event);
        Ok(())
    }
}

impl Destination for RecordingDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn fake_motion(&self, screen: usize, x: i32, y: i32) -> Result<(), InjectError> {
        self.record(Injected::Motion(screen, x, y))
    }

    fn fake_button(&self, button: u32, pressed: bool) -> Result<(), InjectError> {
        self.record(Injected::Button(button, pressed))
    }

    fn fake_key(&self, keycode: u8, pressed: bool) -> Result<(), InjectError> {
        self.record(Injected::Key(keycode, pressed))
    }

    fn keycode_for(&self, keysym: Keysym) -> Option<u8> {
        if lock(&self.forgotten).contains(&keysym) {
            return None;
        }
        Some(self.keycode_of(keysym))
    }

    fn keysym_at(&self, keycode: u8, shifted: bool) -> Keysym {
        lock(&self.levels)
            .iter()
            .find(|(code, _, _)| *code == keycode)
            .map_or(Keysym::NO_SYMBOL, |&(_, plain, upper)| {
                if shifted {
                    upper
                } else {
                    plain
                }
            })
    }

    fn wake(&self) -> Result<(), InjectError> {
        self.wakes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Source ────────────────────────────────────────────────────────────────────

/// A source that records grabs, warps and window changes.
#[derive(Debug, Default)]
pub struct RecordingSource {
    /// Every `(x, y)` passed to `warp_pointer`.
    warps: Mutex<Vec<(i32, i32)>>,
    grabs: AtomicUsize,
    releases: AtomicUsize,
    shows: AtomicUsize,
    hides: AtomicUsize,
    raises: AtomicUsize,
    claims: AtomicUsize,
    /// When `true`, `grab_input` fails with `SourceError::KeyboardGrab`.
    refuse_grab: AtomicBool,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_refuse_grab(&self, refuse: bool) {
        self.refuse_grab.store(refuse, Ordering::Relaxed);
    }

    pub fn warps(&self) -> Vec<(i32, i32)> {
        lock(&self.warps).clone()
    }

    /// Successful grabs.
    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::Relaxed)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    pub fn capture_window_shows(&self) -> usize {
        self.shows.load(Ordering::Relaxed)
    }

    pub fn capture_window_hides(&self) -> usize {
        self.hides.load(Ordering::Relaxed)
    }

    pub fn raise_count(&self) -> usize {
        self.raises.load(Ordering::Relaxed)
    }

    pub fn selection_claims(&self) -> usize {
        self.claims.load(Ordering::Relaxed)
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        lock(&self.warps).clear();
        for counter in [
            &self.grabs,
            &self.releases,
            &self.shows,
            &self.hides,
            &self.raises,
            &self.claims,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl SourceControl for RecordingSource {
    fn grab_input(&self) -> Result<(), SourceError> {
        if self.refuse_grab.load(Ordering::Relaxed) {
            return Err(SourceError::KeyboardGrab(1));
        }
        self.grabs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn release_input(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    fn warp_pointer(&self, x: i32, y: i32) {
        lock(&self.warps).push((x, y));
    }

    fn show_capture_window(&self) {
        self.shows.fetch_add(1, Ordering::Relaxed);
    }

    fn hide_capture_window(&self) {
        self.hides.fetch_add(1, Ordering::Relaxed);
    }

    fn raise_trigger(&self) {
        self.raises.fetch_add(1, Ordering::Relaxed);
    }

    fn claim_selection(&self) {
        self.claims.fetch_add(1, Ordering::Relaxed);
    }
}
