//! The event loop: one task multiplexing the source connection, every
//! destination connection and Ctrl-C.
//!
//! Each display connection is a socket.  The loop registers the sockets with
//! tokio through [`AsyncFd`] and sleeps until one becomes readable, then
//! drains every queued event: all source events first, then the
//! destinations.  Events are handled one at a time on the calling task, so
//! the [`Session`] needs no locking.
//!
//! Xlib reads ahead into its own buffer whenever it talks to the server, so
//! events can be queued while the socket itself is idle.  A handler that
//! makes a round trip (a grab, a pointer mapping query) can leave events
//! behind in that buffer.  The loop therefore repeats the drain pass until a
//! whole pass finds nothing, and only then waits on the sockets.

use std::future::poll_fn;
use std::os::unix::io::{AsRawFd, RawFd};
use std::task::Poll;

use thiserror::Error;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::{debug, info};

use crate::application::session::{DestinationEvent, Flow, Session, SourceEvent};

/// Error type for the event loop.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("event loop I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A display connection that can be waited on and drained.
pub trait EventPump {
    type Event;

    /// The connection's socket.
    fn fd(&self) -> RawFd;

    /// Appends every event that can be read without blocking to `out`.
    fn drain(&self, out: &mut Vec<Self::Event>);
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The trigger window was closed.
    WindowClosed,
    Interrupted,
}

struct PumpFd(RawFd);

impl AsRawFd for PumpFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

/// Runs `session` until the trigger window is closed or Ctrl-C arrives.
///
/// The caller is responsible for [`Session::shutdown`] afterwards, on every
/// exit path.
///
/// # Errors
///
/// Returns [`LoopError::Io`] if a socket cannot be registered with the
/// runtime or its readiness cannot be polled.
pub async fn run_event_loop(
    session: &mut Session,
    source: &dyn EventPump<Event = SourceEvent>,
    destinations: &[&dyn EventPump<Event = DestinationEvent>],
) -> Result<StopReason, LoopError> {
    let source_fd = AsyncFd::with_interest(PumpFd(source.fd()), Interest::READABLE)?;
    let dest_fds = destinations
        .iter()
        .map(|d| AsyncFd::with_interest(PumpFd(d.fd()), Interest::READABLE))
        .collect::<Result<Vec<_>, _>>()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut source_events = Vec::new();
    let mut dest_events = Vec::new();

    info!(destinations = destinations.len(), "event loop running");
    loop {
        loop {
            source.drain(&mut source_events);
            let mut handled = source_events.len();
            for event in source_events.drain(..) {
                if session.handle_source_event(event) == Flow::Quit {
                    return Ok(StopReason::WindowClosed);
                }
            }
            for dest in destinations {
                dest.drain(&mut dest_events);
                handled += dest_events.len();
                for event in dest_events.drain(..) {
                    session.handle_destination_event(event);
                }
            }
            if handled == 0 {
                break;
            }
        }

        tokio::select! {
            biased;

            result = &mut ctrl_c => {
                result?;
                info!("interrupted");
                return Ok(StopReason::Interrupted);
            }

            guard = source_fd.readable() => {
                guard?.clear_ready();
            }

            index = poll_fn(|cx| {
                for (index, fd) in dest_fds.iter().enumerate() {
                    match fd.poll_read_ready(cx) {
                        Poll::Ready(Ok(mut guard)) => {
                            guard.clear_ready();
                            return Poll::Ready(Ok(index));
                        }
                        Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                        Poll::Pending => {}
                    }
                }
                Poll::Pending
            }) => {
                let index = index?;
                debug!(destination = index, "destination readable");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::application::connection::{Mode, SourceControl, SourceError};
    use crate::application::forward_input::{Destination, KeyInput};
    use crate::infrastructure::display::mock::{RecordingDestination, RecordingSource};
    use edgeshift_core::{ButtonMask, Configuration, Edge, Keysym, ScreenChain, ScreenGeometry};

    /// Turns each byte read from a socket into one event.
    struct BytePump<E> {
        stream: UnixStream,
        translate: fn(u8) -> E,
    }

    impl<E> BytePump<E> {
        fn new(stream: UnixStream, translate: fn(u8) -> E) -> Self {
            stream.set_nonblocking(true).expect("nonblocking");
            Self { stream, translate }
        }
    }

    impl<E> EventPump for BytePump<E> {
        type Event = E;

        fn fd(&self) -> RawFd {
            self.stream.as_raw_fd()
        }

        fn drain(&self, out: &mut Vec<E>) {
            let mut buf = [0u8; 64];
            loop {
                match (&self.stream).read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => out.extend(buf[..n].iter().map(|&b| (self.translate)(b))),
                }
            }
        }
    }

    fn source_event(byte: u8) -> SourceEvent {
        match byte {
            b'e' => SourceEvent::Enter {
                x: 999,
                y: 300,
                normal: true,
            },
            b'k' => SourceEvent::Key(KeyInput {
                keysym: Keysym(0x61),
                pressed: true,
                shift: false,
                lock: false,
            }),
            b'q' => SourceEvent::CloseRequested,
            _ => SourceEvent::Motion {
                x: 500,
                y: 300,
                same_screen: true,
                buttons: ButtonMask::NONE,
            },
        }
    }

    fn destination_event(_byte: u8) -> DestinationEvent {
        DestinationEvent::PointerMappingChanged(vec![3, 2, 1])
    }

    /// Stands in for an Xlib connection that reads events into its own
    /// queue while a grab request waits for its reply.  The socket itself
    /// never becomes readable.
    struct ReadAheadSource {
        stream: UnixStream,
        queued: RefCell<VecDeque<SourceEvent>>,
        read_during_grab: RefCell<Vec<SourceEvent>>,
    }

    impl EventPump for ReadAheadSource {
        type Event = SourceEvent;

        fn fd(&self) -> RawFd {
            self.stream.as_raw_fd()
        }

        fn drain(&self, out: &mut Vec<SourceEvent>) {
            out.extend(self.queued.borrow_mut().drain(..));
        }
    }

    impl SourceControl for ReadAheadSource {
        fn grab_input(&self) -> Result<(), SourceError> {
            let read = std::mem::take(&mut *self.read_during_grab.borrow_mut());
            self.queued.borrow_mut().extend(read);
            Ok(())
        }

        fn release_input(&self) {}

        fn warp_pointer(&self, _x: i32, _y: i32) {}

        fn show_capture_window(&self) {}

        fn hide_capture_window(&self) {}

        fn raise_trigger(&self) {}

        fn claim_selection(&self) {}
    }

    fn session() -> (Session, Rc<RecordingDestination>) {
        session_with_source(Rc::new(RecordingSource::new()))
    }

    fn session_with_source(source: Rc<dyn SourceControl>) -> (Session, Rc<RecordingDestination>) {
        let config = Rc::new(Configuration {
            edge: Some(Edge::East),
            ..Configuration::default()
        });
        let chain = ScreenChain::build(
            ScreenGeometry::new(1000, 600),
            &[ScreenGeometry::new(800, 600)],
            &config.chain_layout(),
        )
        .expect("valid chain");
        let dest = Rc::new(RecordingDestination::new("dest"));
        let session = Session::new(
            config,
            chain,
            source,
            vec![Rc::clone(&dest) as Rc<dyn Destination>],
            &[1, 2, 3],
        );
        (session, dest)
    }

    #[tokio::test]
    async fn test_loop_handles_queued_events_until_close() {
        // Arrange
        let (mut session, dest) = session();
        let (mut source_tx, source_rx) = UnixStream::pair().expect("pair");
        let (_dest_tx, dest_rx) = UnixStream::pair().expect("pair");
        let source = BytePump::new(source_rx, source_event);
        let destination = BytePump::new(dest_rx, destination_event);
        source_tx.write_all(b"ekq").expect("write");

        // Act
        let reason = run_event_loop(&mut session, &source, &[&destination])
            .await
            .expect("loop");

        // Assert
        assert_eq!(reason, StopReason::WindowClosed);
        assert_eq!(session.mode(), Mode::Connected);
        assert_eq!(dest.injected().len(), 2);
    }

    #[tokio::test]
    async fn test_loop_wakes_for_destination_then_source() {
        // Arrange
        let (mut session, _dest) = session();
        let (mut source_tx, source_rx) = UnixStream::pair().expect("pair");
        let (mut dest_tx, dest_rx) = UnixStream::pair().expect("pair");
        let source = BytePump::new(source_rx, source_event);
        let destination = BytePump::new(dest_rx, destination_event);

        let writer = tokio::spawn(async move {
            tokio::task::yield_now().await;
            dest_tx.write_all(b"p").expect("write");
            tokio::task::yield_now().await;
            source_tx.write_all(b"q").expect("write");
            (source_tx, dest_tx)
        });

        // Act
        let reason = run_event_loop(&mut session, &source, &[&destination])
            .await
            .expect("loop");
        let _streams = writer.await.expect("writer");

        // Assert
        assert_eq!(reason, StopReason::WindowClosed);
        assert_eq!(session.forwarder().button_map().physical(1), Some(3));
    }

    #[tokio::test]
    async fn test_loop_handles_events_read_ahead_during_a_grab() {
        // Arrange
        let (_idle_tx, idle_rx) = UnixStream::pair().expect("pair");
        let source = Rc::new(ReadAheadSource {
            stream: idle_rx,
            queued: RefCell::new(VecDeque::from([source_event(b'e')])),
            read_during_grab: RefCell::new(vec![source_event(b'k'), source_event(b'q')]),
        });
        let (mut session, dest) = session_with_source(Rc::clone(&source) as Rc<dyn SourceControl>);
        let (_dest_tx, dest_rx) = UnixStream::pair().expect("pair");
        let destination = BytePump::new(dest_rx, destination_event);

        // Act
        let reason = tokio::time::timeout(
            Duration::from_secs(5),
            run_event_loop(&mut session, &*source, &[&destination]),
        )
        .await
        .expect("queued events handled without waiting on the socket")
        .expect("loop");

        // Assert
        assert_eq!(reason, StopReason::WindowClosed);
        assert_eq!(session.mode(), Mode::Connected);
        assert_eq!(dest.injected().len(), 2);
    }
}
