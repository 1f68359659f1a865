//! Connection setup exchange
//!
//! Sends the setup request, classifies the reply and hands a success
//! payload to the decoder. Every read is all-or-nothing: a stream that
//! ends early is reported as a short read, never decoded.

use crate::connection::Transport;
use crate::protocol::*;

/// Fill `buf` completely from `transport`
pub(crate) fn read_full<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    phase: Phase,
) -> Result<(), TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        match transport.recv(&mut buf[filled..]) {
            Ok(0) => {
                return Err(TransportError::ShortRead {
                    phase,
                    expected: buf.len(),
                    got: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(source) => return Err(TransportError::Io { phase, source }),
        }
    }
    Ok(())
}

/// Run the setup handshake, announcing `byte_order` to the server.
///
/// The success payload is decoded in the same byte order.
///
/// On `Rejected` only the `detail` reason bytes are consumed; the server's
/// padding up to `length * 4` bytes is left unread on the transport.
pub fn initiate<T: Transport + ?Sized>(
    transport: &mut T,
    byte_order: ByteOrder,
) -> HandshakeResult<SetupPayload> {
    let request = SetupRequest::new(byte_order);
    transport
        .send(&request.encode())
        .map_err(|source| TransportError::Io {
            phase: Phase::SendRequest,
            source,
        })?;
    log::debug!(
        "sent setup request: byte order {}, protocol {}.{}",
        byte_order,
        request.protocol_major_version,
        request.protocol_minor_version
    );

    let mut raw = [0u8; SETUP_HEADER_LEN];
    read_full(transport, &mut raw, Phase::ReadHeader)?;
    let header = SetupResponseHeader::parse(&raw, byte_order);

    log::debug!("status: {}", raw[0]);
    log::debug!(
        "version: {}.{}",
        header.protocol_major_version,
        header.protocol_minor_version
    );
    log::debug!("data length: {}", header.payload_len());

    match header.status {
        SetupStatus::Failed => Err(read_failure(transport, &header)),
        SetupStatus::Success => {
            log::info!("setup returned success");
            read_setup_payload(transport, header.payload_len(), byte_order)
        }
        SetupStatus::Authenticate => {
            drain_auth_challenge(transport, &header, byte_order)?;
            Err(HandshakeError::AuthNotSupported)
        }
        SetupStatus::Unknown(code) => Err(HandshakeError::UnexpectedStatus(code)),
    }
}

/// Run the setup handshake in the default (LSB first) byte order
pub fn initiate_default<T: Transport + ?Sized>(transport: &mut T) -> HandshakeResult<SetupPayload> {
    initiate(transport, ByteOrder::default())
}

/// Read exactly `declared_len` payload bytes and decode them
pub fn read_setup_payload<T: Transport + ?Sized>(
    transport: &mut T,
    declared_len: usize,
    byte_order: ByteOrder,
) -> HandshakeResult<SetupPayload> {
    let mut buf = vec![0u8; declared_len];
    read_full(transport, &mut buf, Phase::ReadPayload)?;
    log::debug!("bytes read from response: {}", buf.len());

    Ok(SetupPayload::decode(&buf, byte_order)?)
}

// The reason length is the detail byte, counted in bytes rather than words.
fn read_failure<T: Transport + ?Sized>(
    transport: &mut T,
    header: &SetupResponseHeader,
) -> HandshakeError {
    let mut reason = vec![0u8; header.detail as usize];
    if let Err(e) = read_full(transport, &mut reason, Phase::ReadReason) {
        return e.into();
    }

    let detail = FailureDetail {
        protocol_major_version: header.protocol_major_version,
        protocol_minor_version: header.protocol_minor_version,
        reason: String::from_utf8_lossy(&reason).into_owned(),
    };
    log::warn!("setup failed: {}", detail);
    HandshakeError::Rejected(detail)
}

// Authenticate replies carry `length` words of challenge text. Consuming
// them keeps the stream framed for whoever uses the transport next.
fn drain_auth_challenge<T: Transport + ?Sized>(
    transport: &mut T,
    header: &SetupResponseHeader,
    byte_order: ByteOrder,
) -> Result<(), TransportError> {
    let mut challenge = vec![0u8; header.payload_len()];
    read_full(transport, &mut challenge, Phase::ReadAuthChallenge)?;

    let text = String::from_utf8_lossy(&challenge);
    log::debug!(
        "server requested authentication ({} bytes, {}): {}",
        challenge.len(),
        byte_order,
        text.trim_end_matches('\0')
    );
    Ok(())
}
