/// xwin - X11 client connection setup
///
/// This library performs the X11 connection setup handshake: it sends the
/// setup request, classifies the server's reply and decodes the success
/// payload down to the first screen's root window and visual.

pub mod protocol;
pub mod connection;
pub mod client;

pub use protocol::{ByteOrder, HandshakeError, SetupPayload, VisualID, Window, XID};
pub use connection::{Connection, DisplayAddress, Transport};
pub use client::{initiate, initiate_default, Client, ClientError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
