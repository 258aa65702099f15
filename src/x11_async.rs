//! X11 Async Event Stream
//!
//! Readiness of the X socket, bridged into tokio through a mio poller.

use anyhow::{Context, Result};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// X11 event source for the main loop
///
/// A blocking task polls the connection's file descriptor and wakes the
/// loop whenever it turns readable. The task stops once the stream is
/// dropped.
pub struct X11EventStream {
    conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    /// Must be called from inside a tokio runtime.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);

        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 FD with mio")?;

        let timeout = Duration::from_millis(100);
        tokio::task::spawn_blocking(move || {
            while !guard.is_closed() {
                if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                    tracing::warn!("X11 socket poll failed: {:?}", err);
                    continue;
                }
                if events.iter().any(|event| event.token() == X11_TOKEN) {
                    task_notify.notify_one();
                }
            }
            tracing::debug!("X11 socket polling thread shutting down");
        });

        Ok(Self {
            conn,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Next event already read from the socket, without blocking.
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    /// Resolve once the socket has data.
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }

    /// Send all queued requests to the server.
    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
