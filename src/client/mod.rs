//! Client session
//!
//! This module provides the Client struct which owns a transport to an X
//! server after a successful connection setup, together with the setup
//! parameters the server handed out.

pub mod handshake;

pub use handshake::{initiate, initiate_default, read_setup_payload};

use std::io;

use thiserror::Error;

use crate::connection::{AddressError, Connection, DisplayAddress, Transport};
use crate::protocol::{ByteOrder, HandshakeError, SetupPayload, VisualID, Window, XID};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid display: {0}")]
    Address(#[from] AddressError),
    #[error("cannot connect to {address}: {source}")]
    Connect {
        address: DisplayAddress,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

/// An X11 client whose connection setup has completed
pub struct Client<T: Transport = Connection> {
    transport: T,

    /// Byte order announced in the setup request
    byte_order: ByteOrder,

    setup: SetupPayload,

    /// Last resource ID handed out, before or-ing in the base
    last_id: u32,
}

impl Client<Connection> {
    /// Open the display named `display` and run the setup handshake on it
    pub fn connect(display: &str, byte_order: ByteOrder) -> Result<Self, ClientError> {
        let address = DisplayAddress::parse(display)?;
        log::info!("connecting to {}", address);

        let connection = Connection::open(&address)
            .map_err(|source| ClientError::Connect { address, source })?;

        Ok(Client::from_transport(connection, byte_order)?)
    }
}

impl<T: Transport> Client<T> {
    /// Run the setup handshake over an already open transport
    pub fn from_transport(mut transport: T, byte_order: ByteOrder) -> Result<Self, HandshakeError> {
        let setup = handshake::initiate(&mut transport, byte_order)?;
        Ok(Client {
            transport,
            byte_order,
            setup,
            last_id: 0,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn setup(&self) -> &SetupPayload {
        &self.setup
    }

    pub fn root_window(&self) -> Window {
        self.setup.screen.root
    }

    pub fn root_visual(&self) -> VisualID {
        self.setup.screen.root_visual
    }

    /// Allocate a fresh resource ID from the server-assigned base and mask.
    ///
    /// Returns `None` once the mask's range is exhausted.
    pub fn generate_id(&mut self) -> Option<XID> {
        let mask = self.setup.resource_id_mask;
        if mask == 0 {
            return None;
        }

        // Lowest set bit of the mask is the step between consecutive IDs
        let step = mask & mask.wrapping_neg();
        let next = self.last_id.checked_add(step)?;
        if next & !mask != 0 {
            return None;
        }

        self.last_id = next;
        Some(XID::new(self.setup.resource_id_base | next))
    }

    /// Give back the transport, e.g. to continue with post-setup requests
    pub fn into_transport(self) -> T {
        self.transport
    }
}
