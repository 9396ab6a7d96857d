//! Interactive preview surface.
//!
//! The render loop polls `should_close` once per frame. Closing stops the loop
//! before the next frame is encoded; the output is still finalized.

use std::io;
use std::thread;

use crossbeam::channel::{self, Receiver, TryRecvError};

/// Receives rendered frames and reports when the viewer is closed
pub trait PreviewSurface {
    fn should_close(&mut self) -> bool;

    /// Show a rendered RGBA8 frame
    fn present(&mut self, _rgba: &[u8], _width: u32, _height: u32) {}
}

/// No viewer; never closes.
#[derive(Debug, Default)]
pub struct Headless;

impl PreviewSurface for Headless {
    fn should_close(&mut self) -> bool {
        false
    }
}

/// Terminal preview that closes on Ctrl-C.
pub struct InterruptPreview {
    close_rx: Receiver<()>,
    closed: bool,
}

impl InterruptPreview {
    /// Install the Ctrl-C listener on a background thread
    pub fn install() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (close_tx, close_rx) = channel::bounded(1);

        thread::Builder::new()
            .name("preview-close".to_string())
            .spawn(move || match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    let _ = close_tx.send(());
                }
                Err(e) => tracing::warn!("Ctrl-C listener failed: {}", e),
            })?;

        Ok(Self::from_receiver(close_rx))
    }

    fn from_receiver(close_rx: Receiver<()>) -> Self {
        Self {
            close_rx,
            closed: false,
        }
    }
}

impl PreviewSurface for InterruptPreview {
    fn should_close(&mut self) -> bool {
        if !self.closed {
            match self.close_rx.try_recv() {
                Ok(()) => {
                    tracing::info!("Preview closed");
                    self.closed = true;
                }
                Err(TryRecvError::Empty) => {}
                // Listener gone without a signal: keep running.
                Err(TryRecvError::Disconnected) => {}
            }
        }
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_signal_latches() {
        let (tx, rx) = channel::bounded(1);
        let mut preview = InterruptPreview::from_receiver(rx);
        assert!(!preview.should_close());
        tx.send(()).unwrap();
        assert!(preview.should_close());
        assert!(preview.should_close());
    }

    #[test]
    fn test_dropped_listener_does_not_close() {
        let (tx, rx) = channel::bounded::<()>(1);
        let mut preview = InterruptPreview::from_receiver(rx);
        drop(tx);
        assert!(!preview.should_close());
        assert!(!Headless.should_close());
    }
}
