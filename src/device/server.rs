//! TCP front end for the software device, compatible with `TcpTransport`.
//!
//! Connections are served one at a time; the device processes a single
//! command at a time.

use std::io::{self, Read, Write};
use std::net::TcpListener;

use tracing::{info, warn};

use super::{Approver, Device};
use crate::transport::{read_request, write_response};

/// Accept connections forever, serving each until the host disconnects.
pub fn serve<A: Approver>(listener: &TcpListener, device: &mut Device<A>) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, "device listening");
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let peer = stream.peer_addr().ok();
        info!(?peer, "host connected");
        match serve_connection(stream, device) {
            Ok(count) => info!(?peer, commands = count, "host disconnected"),
            Err(e) => warn!(?peer, error = %e, "connection dropped"),
        }
    }
    Ok(())
}

/// Serve request frames on one stream until EOF. Returns the number of
/// commands handled.
pub fn serve_connection<S, A>(mut stream: S, device: &mut Device<A>) -> io::Result<usize>
where
    S: Read + Write,
    A: Approver,
{
    let mut count = 0;
    while let Some(apdu) = read_request(&mut stream)? {
        let answer = device.process(&apdu);
        write_response(&mut stream, &answer)?;
        count += 1;
    }
    Ok(count)
}
