/*
 *  ingress/mod.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Frame ingress - wire format shared by every transport
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

pub mod chunk;
pub mod pipe;
pub mod udp;

use crate::frame::PixelFrame;
use thiserror::Error;

/// Every transport leads a frame with this magic.
pub const FRAME_MAGIC: [u8; 4] = *b"LEDF";

/// Magic plus two big-endian u16 dimensions.
pub const HEADER_LEN: usize = 8;

/// Refuse absurd headers before allocating for the payload.
const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame shorter than its header ({0} bytes)")]
    TooShort(usize),
    #[error("bad frame magic {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("implausible frame dimensions {0}x{1}")]
    BadDimensions(u32, u32),
    #[error("payload is {got} bytes, header promises {want}")]
    LengthMismatch { want: usize, got: usize },
}

/// Parse the 8-byte header into (width, height).
pub fn parse_header(buf: &[u8]) -> Result<(u32, u32), CodecError> {
    if buf.len() < HEADER_LEN {
        return Err(CodecError::TooShort(buf.len()));
    }
    let magic = [buf[0], buf[1], buf[2], buf[3]];
    if magic != FRAME_MAGIC {
        return Err(CodecError::BadMagic(magic));
    }
    let w = u16::from_be_bytes([buf[4], buf[5]]) as u32;
    let h = u16::from_be_bytes([buf[6], buf[7]]) as u32;
    if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(CodecError::BadDimensions(w, h));
    }
    Ok((w, h))
}

/// Decode one complete wire frame: header followed by W*H*3 payload bytes.
pub fn decode_frame(buf: &[u8]) -> Result<PixelFrame, CodecError> {
    let (w, h) = parse_header(buf)?;
    let want = (w * h * 3) as usize;
    let payload = &buf[HEADER_LEN..];
    if payload.len() != want {
        return Err(CodecError::LengthMismatch {
            want,
            got: payload.len(),
        });
    }
    // length checked above, so this cannot fail
    Ok(PixelFrame::from_rgb_bytes(w, h, payload).expect("length checked"))
}

/// Wire-encode a frame; used by tests and local senders.
pub fn encode_frame(frame: &PixelFrame) -> Vec<u8> {
    let (w, h) = frame.dimensions();
    let mut out = Vec::with_capacity(HEADER_LEN + frame.as_slice().len() * 3);
    out.extend_from_slice(&FRAME_MAGIC);
    out.extend_from_slice(&(w as u16).to_be_bytes());
    out.extend_from_slice(&(h as u16).to_be_bytes());
    for px in frame.as_slice() {
        out.extend_from_slice(&[px.r, px.g, px.b]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;

    #[test]
    fn test_encode_decode_round_trip() {
        let mut frame = PixelFrame::black(3, 2);
        frame.set(1, 0, Rgb::new(10, 20, 30));
        frame.set(2, 1, Rgb::new(40, 50, 60));

        let wire = encode_frame(&frame);
        assert_eq!(wire.len(), HEADER_LEN + 18);
        assert_eq!(&wire[..4], b"LEDF");

        let decoded = decode_frame(&wire).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut wire = encode_frame(&PixelFrame::black(2, 2));
        wire[0] = b'X';
        assert!(matches!(decode_frame(&wire), Err(CodecError::BadMagic(_))));
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(matches!(
            decode_frame(b"LEDF"),
            Err(CodecError::TooShort(4))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let mut wire = encode_frame(&PixelFrame::black(4, 4));
        wire.truncate(wire.len() - 1);
        assert!(matches!(
            decode_frame(&wire),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_header_rejects_zero_dimensions() {
        let wire = [b'L', b'E', b'D', b'F', 0, 0, 0, 4];
        assert!(matches!(
            parse_header(&wire),
            Err(CodecError::BadDimensions(0, 4))
        ));
    }
}
