/*
 *  ingress/chunk.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Reassembly of sequence-numbered frame chunks from the BLE bridge
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
use crate::ingress::{parse_header, CodecError, HEADER_LEN};
use std::time::{Duration, Instant};
use thiserror::Error;

/// The bridge abandons a frame this long after its first chunk.
pub const ASSEMBLY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk 0 header invalid: {0}")]
    BadHeader(#[from] CodecError),
    #[error("expected chunk {expected}, got {got}")]
    OutOfSequence { expected: u16, got: u16 },
    #[error("chunk overruns the frame: {got} of {want} payload bytes")]
    Overrun { want: usize, got: usize },
}

struct Assembly {
    width: u32,
    height: u32,
    buf: Vec<u8>,
    next_seq: u16,
    started: Instant,
}

/// Reassembles one frame at a time from small transport chunks.
///
/// Chunk 0 opens a frame and carries the wire header; later chunks must
/// arrive in sequence. Any gap, overrun or timeout discards the partial
/// frame - the producer simply starts over, nothing is retransmitted.
pub struct ChunkAssembler {
    timeout: Duration,
    state: Option<Assembly>,
}

impl ChunkAssembler {
    pub fn new(timeout: Duration) -> Self {
        ChunkAssembler {
            timeout,
            state: None,
        }
    }

    /// Feed one chunk; `Ok(Some(frame))` when it completes a frame.
    pub fn push(
        &mut self,
        seq: u16,
        payload: &[u8],
        now: Instant,
    ) -> Result<Option<PixelFrame>, ChunkError> {
        // stale partial frames die quietly before the new chunk is judged
        if let Some(a) = &self.state {
            if now.duration_since(a.started) > self.timeout {
                self.state = None;
            }
        }

        if seq == 0 {
            let (width, height) = match parse_header(payload) {
                Ok(dims) => dims,
                Err(e) => {
                    self.state = None;
                    return Err(e.into());
                }
            };
            let mut buf = Vec::with_capacity((width * height * 3) as usize);
            buf.extend_from_slice(&payload[HEADER_LEN..]);
            self.state = Some(Assembly {
                width,
                height,
                buf,
                next_seq: 1,
                started: now,
            });
        } else {
            let a = match &mut self.state {
                Some(a) if a.next_seq == seq => a,
                other => {
                    let expected = other.as_ref().map(|a| a.next_seq).unwrap_or(0);
                    self.state = None;
                    return Err(ChunkError::OutOfSequence { expected, got: seq });
                }
            };
            a.buf.extend_from_slice(payload);
            a.next_seq += 1;
        }

        let a = self.state.as_ref().expect("assembly exists past this point");
        let want = (a.width * a.height * 3) as usize;
        if a.buf.len() > want {
            let got = a.buf.len();
            self.state = None;
            return Err(ChunkError::Overrun { want, got });
        }
        if a.buf.len() == want {
            let a = self.state.take().expect("checked above");
            return Ok(PixelFrame::from_rgb_bytes(a.width, a.height, &a.buf));
        }
        Ok(None)
    }

    /// Whether a partial frame is currently buffered.
    pub fn in_progress(&self) -> bool {
        self.state.is_some()
    }
}
