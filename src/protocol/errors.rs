//! Connection setup errors

use std::fmt;
use std::io;

use thiserror::Error;

/// Step of the handshake an I/O operation belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SendRequest,
    ReadHeader,
    ReadReason,
    ReadPayload,
    ReadAuthChallenge,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::SendRequest => "send setup request",
            Phase::ReadHeader => "read setup reply header",
            Phase::ReadReason => "read setup failure reason",
            Phase::ReadPayload => "read setup payload",
            Phase::ReadAuthChallenge => "read authentication challenge",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{phase}: {source}")]
    Io {
        phase: Phase,
        #[source]
        source: io::Error,
    },
    #[error("{phase}: short read, expected {expected} bytes but got {got}")]
    ShortRead {
        phase: Phase,
        expected: usize,
        got: usize,
    },
}

impl TransportError {
    pub fn phase(&self) -> Phase {
        match self {
            TransportError::Io { phase, .. } | TransportError::ShortRead { phase, .. } => *phase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("setup payload too small for {what}: need {needed} bytes, have {available}")]
    BufferTooSmall {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    /// Setup request whose first byte is neither 'l' nor 'B'
    #[error("invalid byte order marker {0:#04x}")]
    BadByteOrder(u8),
}

/// Server refusal, as carried in a Failed setup reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub reason: String,
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (server protocol {}.{})",
            self.reason, self.protocol_major_version, self.protocol_minor_version
        )
    }
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("connection refused by server: {0}")]
    Rejected(FailureDetail),
    #[error("server requested authentication, which is not supported")]
    AuthNotSupported,
    #[error("unexpected setup status {0}")]
    UnexpectedStatus(u8),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type for the setup exchange
pub type HandshakeResult<T> = Result<T, HandshakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_single_line() {
        let errors = [
            HandshakeError::from(TransportError::ShortRead {
                phase: Phase::ReadHeader,
                expected: 8,
                got: 3,
            }),
            HandshakeError::Rejected(FailureDetail {
                protocol_major_version: 11,
                protocol_minor_version: 0,
                reason: "nopel".to_string(),
            }),
            HandshakeError::AuthNotSupported,
            HandshakeError::UnexpectedStatus(7),
            HandshakeError::from(DecodeError::BadByteOrder(b'x')),
        ];

        for err in errors {
            assert!(!err.to_string().contains('\n'), "{}", err);
        }
    }

    #[test]
    fn test_short_read_carries_phase() {
        let err = TransportError::ShortRead {
            phase: Phase::ReadPayload,
            expected: 40,
            got: 12,
        };
        assert_eq!(err.phase(), Phase::ReadPayload);
        assert_eq!(
            err.to_string(),
            "read setup payload: short read, expected 40 bytes but got 12"
        );
    }
}
