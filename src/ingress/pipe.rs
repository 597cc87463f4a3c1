/*
 *  ingress/pipe.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Named-pipe frame ingress - header-framed byte stream
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

use crate::frame::PixelFrame;
use crate::ingress::{parse_header, HEADER_LEN};
use crate::mailbox::FrameMailbox;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Create the FIFO if it does not exist yet.
fn ensure_fifo(path: &Path) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    let cpath = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pipe path contains NUL"))?;
    let rc = unsafe { libc::mkfifo(cpath.as_ptr(), 0o644) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Spawn the blocking reader thread. Opening a FIFO read-only parks until a
/// writer appears, so this lives on its own thread rather than the runtime.
pub fn spawn(
    path: PathBuf,
    mailbox: Arc<FrameMailbox>,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    ensure_fifo(&path)?;
    info!("pipe frame ingress on {}", path.display());

    std::thread::Builder::new()
        .name("frame-pipe".to_string())
        .spawn(move || read_loop(&path, &mailbox, &shutdown))
}

fn read_loop(path: &Path, mailbox: &FrameMailbox, shutdown: &AtomicBool) {
    let mut dropped: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        // blocks until a writer opens the FIFO
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("cannot open {}: {}", path.display(), e);
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        // one writer session: header-framed frames until hang-up or desync
        loop {
            let mut header = [0u8; HEADER_LEN];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    warn!("pipe read error: {}", e);
                    break;
                }
            }

            let (w, h) = match parse_header(&header) {
                Ok(dims) => dims,
                Err(e) => {
                    // lost framing; drop the session and wait for a fresh writer
                    warn!("pipe desync: {}", e);
                    break;
                }
            };

            let mut payload = vec![0u8; (w * h * 3) as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) => {
                    debug!("pipe closed mid-frame: {}", e);
                    break;
                }
            }

            let frame = PixelFrame::from_rgb_bytes(w, h, &payload).expect("length checked");
            if let Err(e) = mailbox.submit(frame) {
                dropped += 1;
                if dropped % 100 == 1 {
                    warn!("rejected pipe frame: {} ({} so far)", e, dropped);
                }
            }
        }
    }
}
