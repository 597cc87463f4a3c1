/*
 *  mailbox.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Latest-wins frame mailbox between producers and the controller
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::arbiter::Snapshot;
use crate::frame::PixelFrame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("frame is {got_w}x{got_h}, active canvas is {want_w}x{want_h}")]
    DimensionMismatch {
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },
}

/// Single-slot mailbox carrying at most one pending frame.
///
/// Any number of producers submit; the controller is the only taker. A
/// submission overwrites whatever is pending, so overload sheds intermediate
/// frames and keeps the newest. Producers see no backpressure, ever.
pub struct FrameMailbox {
    slot: Mutex<Option<(PixelFrame, u64)>>,
    next_tag: AtomicU64,
    snapshot: watch::Receiver<Arc<Snapshot>>,
}

impl FrameMailbox {
    pub fn new(snapshot: watch::Receiver<Arc<Snapshot>>) -> Arc<Self> {
        Arc::new(FrameMailbox {
            slot: Mutex::new(None),
            next_tag: AtomicU64::new(0),
            snapshot,
        })
    }

    /// Hand a frame to the display. The only rejection is a dimension
    /// mismatch against the active layout; acceptance is no guarantee of
    /// display, a later submit or a generated frame may displace it.
    pub fn submit(&self, frame: PixelFrame) -> Result<(), SubmitError> {
        let (want_w, want_h) = self.snapshot.borrow().layout.canvas_size();
        let (got_w, got_h) = frame.dimensions();
        if (got_w, got_h) != (want_w, want_h) {
            return Err(SubmitError::DimensionMismatch {
                got_w,
                got_h,
                want_w,
                want_h,
            });
        }

        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        // critical section covers only the slot swap; the displaced frame
        // drops outside the lock
        let displaced = {
            let mut slot = self.slot.lock().unwrap();
            slot.replace((frame, tag))
        };
        drop(displaced);
        Ok(())
    }

    /// Non-blocking: the pending frame and its tag, emptying the slot.
    pub fn take(&self) -> Option<(PixelFrame, u64)> {
        self.slot.lock().unwrap().take()
    }

    /// 0 or 1 by construction; surfaced through status.
    pub fn depth(&self) -> usize {
        usize::from(self.slot.lock().unwrap().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;
    use crate::layout::test_support::default_doc;
    use crate::layout::Layout;
    use crate::power::PowerSettings;

    fn mailbox() -> Arc<FrameMailbox> {
        let layout = Layout::parse(&default_doc()).unwrap();
        let (_arbiter, rx) = crate::arbiter::Arbiter::new(layout, 128, PowerSettings::default());
        FrameMailbox::new(rx)
    }

    #[test]
    fn test_empty_take() {
        let mb = mailbox();
        assert!(mb.take().is_none());
        assert_eq!(mb.depth(), 0);
    }

    #[test]
    fn test_submit_then_take() {
        let mb = mailbox();
        mb.submit(PixelFrame::black(32, 32)).unwrap();
        assert_eq!(mb.depth(), 1);
        let (frame, _tag) = mb.take().unwrap();
        assert_eq!(frame.dimensions(), (32, 32));
        assert!(mb.take().is_none());
    }

    #[test]
    fn test_latest_wins() {
        let mb = mailbox();
        mb.submit(PixelFrame::filled(32, 32, Rgb::new(1, 0, 0))).unwrap();
        mb.submit(PixelFrame::filled(32, 32, Rgb::new(2, 0, 0))).unwrap();

        let (frame, _) = mb.take().unwrap();
        assert_eq!(frame.get(0, 0), Rgb::new(2, 0, 0));
        assert!(mb.take().is_none());
    }

    #[test]
    fn test_tags_are_monotonic() {
        let mb = mailbox();
        mb.submit(PixelFrame::black(32, 32)).unwrap();
        let (_, t1) = mb.take().unwrap();
        mb.submit(PixelFrame::black(32, 32)).unwrap();
        let (_, t2) = mb.take().unwrap();
        assert!(t2 > t1);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mb = mailbox();
        let err = mb.submit(PixelFrame::black(16, 16));
        assert!(matches!(err, Err(SubmitError::DimensionMismatch { .. })));
        assert_eq!(mb.depth(), 0);
    }

    #[test]
    fn test_concurrent_submits_leave_one_frame() {
        let mb = mailbox();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mb = Arc::clone(&mb);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        mb.submit(PixelFrame::filled(32, 32, Rgb::new(i, i, i))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(mb.depth(), 1);
        assert!(mb.take().is_some());
        assert_eq!(mb.depth(), 0);
    }
}
