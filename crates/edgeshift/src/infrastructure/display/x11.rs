//! Xlib and XTest implementations of the display ports.
//!
//! - [`XConnection`] owns one `Display*` and closes it on drop.
//! - [`X11Source`] owns the trigger window (and the optional full-screen
//!   capture window) on the source display.  It implements
//!   [`SourceControl`] and turns raw X events into [`SourceEvent`]s.
//! - [`X11Destination`] injects input through XTest and reports pointer
//!   mapping changes.
//!
//! # Implementation notes
//!
//! Every adapter lives on the event loop task; none of them is `Send`.
//! Requests are buffered by Xlib and pushed with `XFlush` after each
//! logical operation.  Asynchronous protocol errors (a destination window
//! going away, a grab racing a window unmap) are logged by
//! [`install_error_handler`] instead of terminating the process.

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_long, c_uint};
use std::os::unix::io::RawFd;
use std::ptr;

use edgeshift_core::{ButtonMask, Configuration, Keysym, ScreenChain, ScreenGeometry, MAX_BUTTONS};
use tracing::{debug, error, warn};
use x11::{xlib, xtest};

use super::DisplayError;
use crate::application::connection::{SourceControl, SourceError};
use crate::application::forward_input::{Destination, InjectError, KeyInput};
use crate::application::session::{DestinationEvent, SourceEvent};
use crate::infrastructure::event_loop::EventPump;

/// Font tried after the configured one.
const DEFAULT_FONT: &str = "-*-times-bold-r-*-*-*-180-*-*-*-*-*-*";
const FALLBACK_FONT: &str = "fixed";
const DEFAULT_WINDOW_SIZE: (u32, u32) = (100, 100);
const XC_EXCHANGE: c_uint = 50;

// ── Error handler ─────────────────────────────────────────────────────────────

/// Makes Xlib log protocol errors instead of exiting.
pub fn install_error_handler() {
    // SAFETY: the handler is a plain function with the signature Xlib
    // expects and does not call back into Xlib except XGetErrorText.
    unsafe {
        xlib::XSetErrorHandler(Some(log_x_error));
    }
}

unsafe extern "C" fn log_x_error(display: *mut xlib::Display, event: *mut xlib::XErrorEvent) -> c_int {
    // SAFETY: Xlib passes a valid display and error event to the handler.
    let event = unsafe { &*event };
    let mut text = [0 as c_char; 256];
    // SAFETY: `text` is a writable buffer of the length passed in.
    unsafe {
        xlib::XGetErrorText(
            display,
            c_int::from(event.error_code),
            text.as_mut_ptr(),
            text.len() as c_int,
        );
    }
    // SAFETY: XGetErrorText always NUL-terminates within the buffer.
    let text = unsafe { CStr::from_ptr(text.as_ptr()) }.to_string_lossy();
    error!(
        request = event.request_code,
        minor = event.minor_code,
        resource = event.resourceid,
        "X protocol error: {text}"
    );
    0
}

// ── Connection ────────────────────────────────────────────────────────────────

/// An open Xlib display connection.
pub struct XConnection {
    display: *mut xlib::Display,
    name: String,
}

impl XConnection {
    /// Opens the display called `name`.  Returns `None` when the server
    /// cannot be reached.
    pub fn open(name: &str) -> Option<Self> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: XOpenDisplay is called with a NUL-terminated display name.
        // The returned pointer is released by XCloseDisplay in Drop.
        let display = unsafe { xlib::XOpenDisplay(c_name.as_ptr()) };
        if display.is_null() {
            return None;
        }
        Some(Self {
            display,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> *mut xlib::Display {
        self.display
    }

    /// The socket carrying this connection.
    pub fn fd(&self) -> RawFd {
        // SAFETY: `display` is a valid open display.
        unsafe { xlib::XConnectionNumber(self.display) }
    }

    /// Size of every screen of the display, in screen order.
    pub fn screens(&self) -> Vec<ScreenGeometry> {
        // SAFETY: `display` is valid and every index is below XScreenCount.
        unsafe {
            let count = xlib::XScreenCount(self.display);
            (0..count)
                .map(|screen| {
                    ScreenGeometry::new(
                        xlib::XDisplayWidth(self.display, screen).max(0) as u32,
                        xlib::XDisplayHeight(self.display, screen).max(0) as u32,
                    )
                })
                .collect()
        }
    }

    /// Size of the default screen.
    pub fn default_screen(&self) -> ScreenGeometry {
        // SAFETY: `display` is a valid open display.
        unsafe {
            let screen = xlib::XDefaultScreen(self.display);
            ScreenGeometry::new(
                xlib::XDisplayWidth(self.display, screen).max(0) as u32,
                xlib::XDisplayHeight(self.display, screen).max(0) as u32,
            )
        }
    }

    pub fn flush(&self) {
        // SAFETY: `display` is a valid open display.
        unsafe {
            xlib::XFlush(self.display);
        }
    }

    /// Pops every queued event, reading from the socket without blocking.
    fn pending_events(&self) -> Vec<xlib::XEvent> {
        let mut events = Vec::new();
        // SAFETY: `display` is valid; XNextEvent only runs while XPending
        // reports a queued event, so it never blocks.
        unsafe {
            while xlib::XPending(self.display) > 0 {
                let mut event: xlib::XEvent = std::mem::zeroed();
                xlib::XNextEvent(self.display, &mut event);
                events.push(event);
            }
        }
        events
    }
}

impl Drop for XConnection {
    fn drop(&mut self) {
        // SAFETY: `display` came from XOpenDisplay and is closed exactly once.
        unsafe {
            xlib::XCloseDisplay(self.display);
        }
    }
}

// ── Source ────────────────────────────────────────────────────────────────────

/// Label drawn in the window-mode trigger window.
struct Label {
    font: *mut xlib::XFontStruct,
    gc: xlib::GC,
    text: CString,
}

/// The source display: trigger window, capture window, grabs.
pub struct X11Source {
    conn: XConnection,
    root: xlib::Window,
    trigger: xlib::Window,
    capture: Option<xlib::Window>,
    event_mask: c_long,
    cursor: xlib::Cursor,
    wm_protocols: xlib::Atom,
    wm_delete: xlib::Atom,
    label: Option<Label>,
    size: Cell<(u32, u32)>,
}

impl X11Source {
    /// Creates and maps the trigger window on `conn`.
    ///
    /// In edge mode the trigger is an override-redirect strip placed at the
    /// chain's trigger origin; otherwise it is a normal titled window with a
    /// label.  With selection enabled the window claims PRIMARY.
    pub fn create(
        conn: XConnection,
        config: &Configuration,
        chain: &ScreenChain,
        to_name: &str,
    ) -> Self {
        let dpy = conn.raw();
        // SAFETY: `dpy` is valid for the lifetime of `conn`, which moves into
        // the returned value.  All created resources belong to this
        // connection and are released when it closes.
        unsafe {
            let screen = xlib::XDefaultScreen(dpy);
            let root = xlib::XDefaultRootWindow(dpy);
            let black = xlib::XBlackPixel(dpy, screen);
            let white = xlib::XWhitePixel(dpy, screen);
            let source = chain.source();

            let mut event_mask = xlib::KeyPressMask | xlib::KeyReleaseMask;
            if config.resurface {
                event_mask |= xlib::VisibilityChangeMask;
            }

            let (trigger, cursor, size) = if config.edge_mode() {
                event_mask |= xlib::EnterWindowMask;
                let axis = chain.axis();
                let across = source.extent(axis.orthogonal()) as i32;
                let (x, y) = axis.join(chain.anchors().trigger_origin, 0);
                let (w, h) = axis.join(config.trigger_width as i32, across);
                let mut attributes: xlib::XSetWindowAttributes = std::mem::zeroed();
                attributes.background_pixel = black;
                attributes.override_redirect = xlib::True;
                let window = xlib::XCreateWindow(
                    dpy,
                    root,
                    x,
                    y,
                    w as c_uint,
                    h as c_uint,
                    0,
                    xlib::CopyFromParent,
                    xlib::InputOutput as c_uint,
                    ptr::null_mut(),
                    xlib::CWBackPixel | xlib::CWOverrideRedirect,
                    &mut attributes,
                );
                (window, blank_cursor(dpy, root), (w as u32, h as u32))
            } else {
                event_mask |= xlib::StructureNotifyMask | xlib::ExposureMask;
                if config.capture_mouse {
                    event_mask |= xlib::ButtonPressMask | xlib::ButtonReleaseMask;
                }
                let geometry = config.geometry.unwrap_or_default();
                let (x, y, w, h) =
                    geometry.place((source.width, source.height), DEFAULT_WINDOW_SIZE);
                let window = xlib::XCreateSimpleWindow(dpy, root, x, y, w, h, 0, black, white);
                let mut hints: xlib::XSizeHints = std::mem::zeroed();
                hints.flags = xlib::USPosition | xlib::USSize;
                hints.x = x;
                hints.y = y;
                hints.width = w as c_int;
                hints.height = h as c_int;
                xlib::XSetWMNormalHints(dpy, window, &mut hints);
                (window, xlib::XCreateFontCursor(dpy, XC_EXCHANGE), (w, h))
            };

            let title = config
                .title
                .clone()
                .unwrap_or_else(|| format!("edgeshift {to_name}"));
            if let Ok(title) = CString::new(title) {
                xlib::XStoreName(dpy, trigger, title.as_ptr());
                xlib::XSetIconName(dpy, trigger, title.as_ptr());
            }

            let wm_protocols = intern(dpy, b"WM_PROTOCOLS\0");
            let wm_delete = intern(dpy, b"WM_DELETE_WINDOW\0");
            let mut protocols = [wm_delete];
            xlib::XSetWMProtocols(dpy, trigger, protocols.as_mut_ptr(), 1);

            let capture = config.big_window.then(|| {
                let mut attributes: xlib::XSetWindowAttributes = std::mem::zeroed();
                attributes.override_redirect = xlib::True;
                xlib::XCreateWindow(
                    dpy,
                    root,
                    0,
                    0,
                    source.width,
                    source.height,
                    0,
                    0,
                    xlib::InputOnly as c_uint,
                    ptr::null_mut(),
                    xlib::CWOverrideRedirect,
                    &mut attributes,
                )
            });

            let label = if config.edge_mode() {
                None
            } else {
                let text = config.label.clone().unwrap_or_else(|| to_name.to_string());
                load_label(dpy, trigger, config.font.as_deref(), &text, black)
            };

            xlib::XDefineCursor(dpy, trigger, cursor);
            xlib::XSelectInput(dpy, trigger, event_mask);
            xlib::XMapRaised(dpy, trigger);
            if config.selection {
                xlib::XSetSelectionOwner(dpy, xlib::XA_PRIMARY, trigger, xlib::CurrentTime);
            }
            xlib::XFlush(dpy);

            debug!(window = trigger, edge = ?config.edge, "trigger window mapped");
            Self {
                conn,
                root,
                trigger,
                capture,
                event_mask,
                cursor,
                wm_protocols,
                wm_delete,
                label,
                size: Cell::new(size),
            }
        }
    }

    pub fn connection(&self) -> &XConnection {
        &self.conn
    }

    fn draw_label(&self) {
        let Some(label) = &self.label else {
            return;
        };
        let dpy = self.conn.raw();
        let (width, height) = self.size.get();
        // SAFETY: font and GC were created on this connection and stay
        // alive as long as `self`; `text` is NUL-terminated.
        unsafe {
            let len = label.text.as_bytes().len() as c_int;
            let text_width = xlib::XTextWidth(label.font, label.text.as_ptr(), len);
            let ascent = (*label.font).ascent;
            let descent = (*label.font).descent;
            let x = (width as c_int - text_width) / 2;
            let y = (height as c_int + ascent - descent) / 2;
            xlib::XClearWindow(dpy, self.trigger);
            xlib::XDrawString(dpy, self.trigger, label.gc, x, y, label.text.as_ptr(), len);
            xlib::XFlush(dpy);
        }
    }

    fn translate(&self, event: &mut xlib::XEvent) -> Option<SourceEvent> {
        let kind = event.get_type();
        // SAFETY: each union field is read only after `get_type` identified
        // the matching event structure.
        unsafe {
            match kind {
                xlib::MotionNotify => {
                    let ev = event.motion;
                    Some(SourceEvent::Motion {
                        x: ev.x_root,
                        y: ev.y_root,
                        same_screen: ev.same_screen != 0,
                        buttons: held_buttons(ev.state),
                    })
                }
                xlib::EnterNotify => {
                    let ev = event.crossing;
                    Some(SourceEvent::Enter {
                        x: ev.x_root,
                        y: ev.y_root,
                        normal: ev.mode == xlib::NotifyNormal,
                    })
                }
                xlib::ButtonPress | xlib::ButtonRelease => {
                    let ev = event.button;
                    let buttons = held_buttons(ev.state);
                    Some(if kind == xlib::ButtonPress {
                        SourceEvent::ButtonPress {
                            button: ev.button,
                            x: ev.x_root,
                            y: ev.y_root,
                            buttons,
                        }
                    } else {
                        SourceEvent::ButtonRelease {
                            button: ev.button,
                            x: ev.x_root,
                            y: ev.y_root,
                            buttons,
                        }
                    })
                }
                xlib::KeyPress | xlib::KeyRelease => {
                    let mut keysym: xlib::KeySym = 0;
                    xlib::XLookupString(
                        &mut event.key,
                        ptr::null_mut(),
                        0,
                        &mut keysym,
                        ptr::null_mut(),
                    );
                    let state = event.key.state;
                    Some(SourceEvent::Key(KeyInput {
                        keysym: Keysym(keysym as u32),
                        pressed: kind == xlib::KeyPress,
                        shift: state & xlib::ShiftMask != 0,
                        lock: state & xlib::LockMask != 0,
                    }))
                }
                xlib::Expose => {
                    if event.expose.count == 0 {
                        self.draw_label();
                    }
                    None
                }
                xlib::ConfigureNotify => {
                    let ev = event.configure;
                    self.size.set((ev.width.max(1) as u32, ev.height.max(1) as u32));
                    None
                }
                xlib::VisibilityNotify => {
                    (event.visibility.state != xlib::VisibilityUnobscured)
                        .then_some(SourceEvent::Obscured)
                }
                xlib::SelectionClear => Some(SourceEvent::SelectionLost),
                xlib::ClientMessage => {
                    let ev = event.client_message;
                    let closing = ev.message_type == self.wm_protocols
                        && ev.data.get_long(0) as xlib::Atom == self.wm_delete;
                    closing.then_some(SourceEvent::CloseRequested)
                }
                xlib::MappingNotify => {
                    xlib::XRefreshKeyboardMapping(&mut event.mapping);
                    None
                }
                _ => None,
            }
        }
    }
}

impl SourceControl for X11Source {
    fn grab_input(&self) -> Result<(), SourceError> {
        let dpy = self.conn.raw();
        // SAFETY: `dpy` and `trigger` are valid for the lifetime of `self`.
        unsafe {
            let status = xlib::XGrabPointer(
                dpy,
                self.trigger,
                xlib::True,
                (xlib::PointerMotionMask | xlib::ButtonPressMask | xlib::ButtonReleaseMask)
                    as c_uint,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
                0,
                self.cursor,
                xlib::CurrentTime,
            );
            if status != xlib::GrabSuccess {
                return Err(SourceError::PointerGrab(status));
            }
            let status = xlib::XGrabKeyboard(
                dpy,
                self.trigger,
                xlib::True,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
                xlib::CurrentTime,
            );
            if status != xlib::GrabSuccess {
                xlib::XUngrabPointer(dpy, xlib::CurrentTime);
                xlib::XFlush(dpy);
                return Err(SourceError::KeyboardGrab(status));
            }
            xlib::XSelectInput(dpy, self.trigger, self.event_mask | xlib::PointerMotionMask);
            xlib::XFlush(dpy);
        }
        Ok(())
    }

    fn release_input(&self) {
        let dpy = self.conn.raw();
        // SAFETY: ungrabbing is valid whether or not a grab is active.
        unsafe {
            xlib::XUngrabKeyboard(dpy, xlib::CurrentTime);
            xlib::XUngrabPointer(dpy, xlib::CurrentTime);
            xlib::XSelectInput(dpy, self.trigger, self.event_mask);
            xlib::XFlush(dpy);
        }
    }

    fn warp_pointer(&self, x: i32, y: i32) {
        let dpy = self.conn.raw();
        // SAFETY: `root` belongs to this display.
        unsafe {
            xlib::XWarpPointer(dpy, 0, self.root, 0, 0, 0, 0, x, y);
            xlib::XFlush(dpy);
        }
    }

    fn show_capture_window(&self) {
        if let Some(window) = self.capture {
            // SAFETY: `window` was created on this display.
            unsafe {
                xlib::XMapRaised(self.conn.raw(), window);
            }
        }
    }

    fn hide_capture_window(&self) {
        if let Some(window) = self.capture {
            // SAFETY: `window` was created on this display.
            unsafe {
                xlib::XUnmapWindow(self.conn.raw(), window);
            }
        }
    }

    fn raise_trigger(&self) {
        // SAFETY: `trigger` was created on this display.
        unsafe {
            xlib::XRaiseWindow(self.conn.raw(), self.trigger);
            xlib::XFlush(self.conn.raw());
        }
    }

    fn claim_selection(&self) {
        // SAFETY: `trigger` was created on this display.
        unsafe {
            xlib::XSetSelectionOwner(
                self.conn.raw(),
                xlib::XA_PRIMARY,
                self.trigger,
                xlib::CurrentTime,
            );
        }
    }
}

impl EventPump for X11Source {
    type Event = SourceEvent;

    fn fd(&self) -> RawFd {
        self.conn.fd()
    }

    fn drain(&self, out: &mut Vec<SourceEvent>) {
        for mut event in self.conn.pending_events() {
            out.extend(self.translate(&mut event));
        }
    }
}

impl Drop for X11Source {
    fn drop(&mut self) {
        if let Some(label) = self.label.take() {
            // SAFETY: font and GC belong to this still-open connection.
            unsafe {
                xlib::XFreeGC(self.conn.raw(), label.gc);
                xlib::XFreeFont(self.conn.raw(), label.font);
            }
        }
    }
}

/// Buttons 1..=5 held according to an event's state field.
fn held_buttons(state: c_uint) -> ButtonMask {
    ButtonMask::from_bits(((state >> 8) & 0x1f) as u8)
}

/// # Safety
///
/// `dpy` must be a valid open display and `name` must end with a NUL byte.
unsafe fn intern(dpy: *mut xlib::Display, name: &[u8]) -> xlib::Atom {
    debug_assert_eq!(name.last(), Some(&0));
    // SAFETY: guaranteed by the caller.
    unsafe { xlib::XInternAtom(dpy, name.as_ptr().cast::<c_char>(), xlib::False) }
}

/// An invisible cursor for the edge strip.
///
/// # Safety
///
/// `dpy` must be a valid open display and `root` one of its root windows.
unsafe fn blank_cursor(dpy: *mut xlib::Display, root: xlib::Window) -> xlib::Cursor {
    // SAFETY: guaranteed by the caller.
    unsafe {
        let pixmap = xlib::XCreatePixmap(dpy, root, 1, 1, 1);
        let mut foreground: xlib::XColor = std::mem::zeroed();
        let mut background: xlib::XColor = std::mem::zeroed();
        let cursor = xlib::XCreatePixmapCursor(
            dpy,
            pixmap,
            pixmap,
            &mut foreground,
            &mut background,
            0,
            0,
        );
        xlib::XFreePixmap(dpy, pixmap);
        cursor
    }
}

/// Loads the first available font and a GC to draw `text` with.
///
/// # Safety
///
/// `dpy` must be a valid open display and `window` one of its windows.
unsafe fn load_label(
    dpy: *mut xlib::Display,
    window: xlib::Window,
    font: Option<&str>,
    text: &str,
    foreground: std::os::raw::c_ulong,
) -> Option<Label> {
    let text = CString::new(text).ok()?;
    let candidates = font.into_iter().chain([DEFAULT_FONT, FALLBACK_FONT]);
    for name in candidates {
        let Ok(c_name) = CString::new(name) else {
            continue;
        };
        // SAFETY: guaranteed by the caller; `c_name` is NUL-terminated.
        let loaded = unsafe { xlib::XLoadQueryFont(dpy, c_name.as_ptr()) };
        if loaded.is_null() {
            debug!("font {name:?} not available");
            continue;
        }
        // SAFETY: `loaded` is a valid font on `dpy`.
        let gc = unsafe {
            let gc = xlib::XCreateGC(dpy, window, 0, ptr::null_mut());
            xlib::XSetFont(dpy, gc, (*loaded).fid);
            xlib::XSetForeground(dpy, gc, foreground);
            gc
        };
        return Some(Label {
            font: loaded,
            gc,
            text,
        });
    }
    warn!("no usable font; trigger window label disabled");
    None
}

// ── Destination ───────────────────────────────────────────────────────────────

/// A destination display driven through XTest.
pub struct X11Destination {
    conn: XConnection,
    /// Only the primary destination reports pointer mapping changes.
    primary: bool,
    screen_count: usize,
}

impl X11Destination {
    /// Wraps `conn` after checking that it supports XTest.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::MissingXTest`] when the extension is absent.
    pub fn new(conn: XConnection, primary: bool) -> Result<Self, DisplayError> {
        let dpy = conn.raw();
        let (mut event_base, mut error_base, mut major, mut minor) = (0, 0, 0, 0);
        // SAFETY: `dpy` is valid and the out-parameters point to locals.
        let present = unsafe {
            xtest::XTestQueryExtension(dpy, &mut event_base, &mut error_base, &mut major, &mut minor)
        };
        if present == 0 {
            return Err(DisplayError::MissingXTest(conn.name().to_string()));
        }
        // SAFETY: `dpy` is valid; makes injected events ignore client grabs.
        unsafe {
            xtest::XTestGrabControl(dpy, xlib::True);
        }
        let screen_count = conn.screens().len().max(1);
        debug!(display = conn.name(), major, minor, screen_count, "XTest available");
        Ok(Self {
            conn,
            primary,
            screen_count,
        })
    }

    pub fn connection(&self) -> &XConnection {
        &self.conn
    }

    /// Screen sizes, used to build the chain from the primary destination.
    pub fn screens(&self) -> Vec<ScreenGeometry> {
        self.conn.screens()
    }

    /// The physical-to-logical pointer mapping (`map[i]` is the logical
    /// button reported for physical button `i + 1`).
    pub fn pointer_mapping(&self) -> Vec<u8> {
        let mut map = [0u8; MAX_BUTTONS];
        // SAFETY: `map` has room for the MAX_BUTTONS entries requested.
        let count = unsafe {
            xlib::XGetPointerMapping(self.conn.raw(), map.as_mut_ptr(), map.len() as c_int)
        };
        let count = (count.max(0) as usize).min(map.len());
        map[..count].to_vec()
    }

    fn failed(&self, reason: &str) -> InjectError {
        InjectError::Platform {
            display: self.conn.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Destination for X11Destination {
    fn name(&self) -> &str {
        self.conn.name()
    }

    fn fake_motion(&self, screen: usize, x: i32, y: i32) -> Result<(), InjectError> {
        let screen = screen.min(self.screen_count - 1) as c_int;
        // SAFETY: `screen` is below the display's screen count.
        let status = unsafe { xtest::XTestFakeMotionEvent(self.conn.raw(), screen, x, y, 0) };
        if status == 0 {
            return Err(self.failed("XTestFakeMotionEvent failed"));
        }
        Ok(())
    }

    fn fake_button(&self, button: u32, pressed: bool) -> Result<(), InjectError> {
        // SAFETY: the display is valid; the server validates the button.
        let status = unsafe {
            xtest::XTestFakeButtonEvent(self.conn.raw(), button, c_int::from(pressed), 0)
        };
        if status == 0 {
            return Err(self.failed("XTestFakeButtonEvent failed"));
        }
        Ok(())
    }

    fn fake_key(&self, keycode: u8, pressed: bool) -> Result<(), InjectError> {
        // SAFETY: the display is valid; `keycode` came from XKeysymToKeycode.
        let status = unsafe {
            xtest::XTestFakeKeyEvent(
                self.conn.raw(),
                c_uint::from(keycode),
                c_int::from(pressed),
                0,
            )
        };
        if status == 0 {
            return Err(self.failed("XTestFakeKeyEvent failed"));
        }
        Ok(())
    }

    fn keycode_for(&self, keysym: Keysym) -> Option<u8> {
        // SAFETY: the display is valid.
        let keycode =
            unsafe { xlib::XKeysymToKeycode(self.conn.raw(), xlib::KeySym::from(keysym.0)) };
        (keycode != 0).then_some(keycode)
    }

    fn keysym_at(&self, keycode: u8, shifted: bool) -> Keysym {
        // SAFETY: the display is valid; out-of-range indexes yield NoSymbol.
        let keysym =
            unsafe { xlib::XKeycodeToKeysym(self.conn.raw(), keycode, c_int::from(shifted)) };
        Keysym(keysym as u32)
    }

    fn wake(&self) -> Result<(), InjectError> {
        // SAFETY: the display is valid.
        unsafe {
            xlib::XForceScreenSaver(self.conn.raw(), xlib::ScreenSaverReset);
        }
        Ok(())
    }

    fn flush(&self) {
        self.conn.flush();
    }
}

impl EventPump for X11Destination {
    type Event = DestinationEvent;

    fn fd(&self) -> RawFd {
        self.conn.fd()
    }

    fn drain(&self, out: &mut Vec<DestinationEvent>) {
        for mut event in self.conn.pending_events() {
            if event.get_type() != xlib::MappingNotify {
                continue;
            }
            // SAFETY: the event type was checked above.
            let request = unsafe {
                xlib::XRefreshKeyboardMapping(&mut event.mapping);
                event.mapping.request
            };
            if request == xlib::MappingPointer && self.primary {
                out.push(DestinationEvent::PointerMappingChanged(
                    self.pointer_mapping(),
                ));
            }
        }
    }
}

// ── Keysym names ─────────────────────────────────────────────────────────────

/// Resolves a keysym name through Xlib's own keysym database.
///
/// Needs no display connection.  Returns `None` for unknown names.
pub fn keysym_from_xlib(name: &str) -> Option<Keysym> {
    let c_name = CString::new(name).ok()?;
    // SAFETY: XStringToKeysym only reads the NUL-terminated name.
    let value = unsafe { xlib::XStringToKeysym(c_name.as_ptr()) };
    u32::try_from(value)
        .ok()
        .filter(|&value| value != 0)
        .map(Keysym)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
