/*
 *  ingress/udp.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Datagram frame ingress - one packet per frame
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

use crate::ingress::decode_frame;
use crate::mailbox::FrameMailbox;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Receive frames as single datagrams until the task is dropped. Malformed
/// or mismatched packets are counted and discarded; the sender is never
/// pushed back on.
pub async fn run(port: u16, mailbox: Arc<FrameMailbox>) -> std::io::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    info!("UDP frame ingress listening on port {}", port);

    let mut buf = vec![0u8; 65536];
    let mut dropped: u64 = 0;

    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!("UDP receive error: {}", e);
                continue;
            }
        };

        match decode_frame(&buf[..n]) {
            Ok(frame) => {
                if let Err(e) = mailbox.submit(frame) {
                    dropped += 1;
                    if dropped % 100 == 1 {
                        warn!("rejected frame from {}: {} ({} so far)", peer, e, dropped);
                    }
                }
            }
            Err(e) => {
                dropped += 1;
                debug!("bad datagram from {}: {}", peer, e);
            }
        }
    }
}
