//! X11 connection setup protocol
//!
//! This module holds the wire layout of the initial connection handshake:
//! the 12-byte request a client sends, the 8-byte header every reply starts
//! with, and the decoder for the success payload.
//!
//! All payload offsets are relative to the first byte after the 8-byte
//! reply header.

use super::*;

/// Size of the setup request with empty authorization fields
pub const SETUP_REQUEST_LEN: usize = 12;

/// Size of the header that starts every setup reply
pub const SETUP_HEADER_LEN: usize = 8;

/// Fixed part of the success payload that precedes the vendor string
pub const SETUP_FIXED_LEN: usize = 32;

/// Each pixmap format entry is 8 bytes
pub const FORMAT_LEN: usize = 8;

/// Bytes of a screen descriptor needed to reach the root visual
pub const SCREEN_MIN_LEN: usize = 36;

/// Convert a length expressed in 4-byte units into bytes
pub fn words_to_bytes(words: u16) -> usize {
    words as usize * 4
}

/// Offset of the first screen descriptor within the success payload
pub fn screens_start_offset(vendor_len: u16, number_of_formats: u8) -> usize {
    SETUP_FIXED_LEN + padded_len(vendor_len as usize) + number_of_formats as usize * FORMAT_LEN
}

fn field<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    buf.get(offset..offset + len)
        .ok_or(DecodeError::BufferTooSmall {
            what,
            needed: offset + len,
            available: buf.len(),
        })
}

pub(crate) fn field_u8(buf: &[u8], offset: usize, what: &'static str) -> Result<u8, DecodeError> {
    Ok(field(buf, offset, 1, what)?[0])
}

pub(crate) fn field_u16(
    buf: &[u8],
    offset: usize,
    byte_order: ByteOrder,
    what: &'static str,
) -> Result<u16, DecodeError> {
    Ok(byte_order.read_u16(field(buf, offset, 2, what)?))
}

pub(crate) fn field_u32(
    buf: &[u8],
    offset: usize,
    byte_order: ByteOrder,
    what: &'static str,
) -> Result<u32, DecodeError> {
    Ok(byte_order.read_u32(field(buf, offset, 4, what)?))
}

/// Connection setup request from client
///
/// Authorization is never offered, so both auth lengths stay zero and the
/// request is always exactly 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupRequest {
    pub byte_order: ByteOrder,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub auth_proto_name_len: u16,
    pub auth_proto_data_len: u16,
}

impl SetupRequest {
    pub fn new(byte_order: ByteOrder) -> Self {
        SetupRequest {
            byte_order,
            protocol_major_version: PROTOCOL_MAJOR_VERSION,
            protocol_minor_version: PROTOCOL_MINOR_VERSION,
            auth_proto_name_len: 0,
            auth_proto_data_len: 0,
        }
    }

    /// Encode to the wire layout
    /// `[order][pad][major:2][minor:2][name len:2][data len:2][pad:2]`
    pub fn encode(&self) -> [u8; SETUP_REQUEST_LEN] {
        let mut buf = [0u8; SETUP_REQUEST_LEN];
        let order = self.byte_order;

        buf[0] = order.marker();
        order.write_u16(&mut buf[2..4], self.protocol_major_version);
        order.write_u16(&mut buf[4..6], self.protocol_minor_version);
        order.write_u16(&mut buf[6..8], self.auth_proto_name_len);
        order.write_u16(&mut buf[8..10], self.auth_proto_data_len);

        buf
    }

    /// Parse the 12 request bytes, using the byte order the marker announces
    pub fn parse(buf: &[u8; SETUP_REQUEST_LEN]) -> Result<Self, DecodeError> {
        let byte_order = ByteOrder::from_marker(buf[0]).ok_or(DecodeError::BadByteOrder(buf[0]))?;

        Ok(SetupRequest {
            byte_order,
            protocol_major_version: byte_order.read_u16(&buf[2..4]),
            protocol_minor_version: byte_order.read_u16(&buf[4..6]),
            auth_proto_name_len: byte_order.read_u16(&buf[6..8]),
            auth_proto_data_len: byte_order.read_u16(&buf[8..10]),
        })
    }
}

impl Default for SetupRequest {
    fn default() -> Self {
        SetupRequest::new(ByteOrder::default())
    }
}

/// Setup response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Failed,
    Success,
    Authenticate,
    Unknown(u8),
}

impl SetupStatus {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => SetupStatus::Failed,
            1 => SetupStatus::Success,
            2 => SetupStatus::Authenticate,
            other => SetupStatus::Unknown(other),
        }
    }
}

/// First 8 bytes of every setup reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupResponseHeader {
    pub status: SetupStatus,
    /// Reason length on failure, unused otherwise
    pub detail: u8,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    /// Length of the rest of the reply, in 4-byte units
    pub length: u16,
}

impl SetupResponseHeader {
    pub fn parse(buf: &[u8; SETUP_HEADER_LEN], byte_order: ByteOrder) -> Self {
        SetupResponseHeader {
            status: SetupStatus::from_u8(buf[0]),
            detail: buf[1],
            protocol_major_version: byte_order.read_u16(&buf[2..4]),
            protocol_minor_version: byte_order.read_u16(&buf[4..6]),
            length: byte_order.read_u16(&buf[6..8]),
        }
    }

    /// Length of the data following the header, in bytes
    pub fn payload_len(&self) -> usize {
        words_to_bytes(self.length)
    }
}

/// Pixmap format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub depth: u8,
    pub bits_per_pixel: u8,
    pub scanline_pad: u8,
}

impl Format {
    fn decode(entry: &[u8]) -> Self {
        Format {
            depth: entry[0],
            bits_per_pixel: entry[1],
            scanline_pad: entry[2],
        }
    }
}

/// The part of the first screen descriptor a client needs to start drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDescriptor {
    pub root: Window,
    pub root_visual: VisualID,
    pub width_in_pixels: u16,
    pub height_in_pixels: u16,
}

impl ScreenDescriptor {
    /// Decode the screen starting at `offset`. The caller has checked that
    /// `SCREEN_MIN_LEN` bytes are available there.
    fn decode(buf: &[u8], offset: usize, byte_order: ByteOrder) -> Result<Self, DecodeError> {
        Ok(ScreenDescriptor {
            root: Window::new(field_u32(buf, offset, byte_order, "root window")?),
            width_in_pixels: field_u16(buf, offset + 20, byte_order, "screen width")?,
            height_in_pixels: field_u16(buf, offset + 22, byte_order, "screen height")?,
            root_visual: VisualID::new(field_u32(buf, offset + 32, byte_order, "root visual")?),
        })
    }
}

/// Decoded success payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPayload {
    pub release_number: u32,
    pub resource_id_base: u32,
    pub resource_id_mask: u32,
    pub motion_buffer_size: u32,
    pub vendor_len: u16,
    pub maximum_request_length: u16,
    pub number_of_screens: u8,
    pub number_of_formats: u8,
    /// Raw image byte order (0 = LSBFirst, 1 = MSBFirst)
    pub image_byte_order: u8,
    /// Raw bitmap bit order (0 = LeastSignificant, 1 = MostSignificant)
    pub bitmap_format_bit_order: u8,
    pub bitmap_format_scanline_unit: u8,
    pub bitmap_format_scanline_pad: u8,
    pub min_keycode: u8,
    pub max_keycode: u8,
    pub vendor: String,
    pub pixmap_formats: Vec<Format>,
    /// Offset of the first screen descriptor within the payload
    pub screens_offset: usize,
    pub screen: ScreenDescriptor,
}

impl SetupPayload {
    /// Decode a success payload (the bytes after the reply header).
    ///
    /// Multi-byte fields are read in `byte_order`, which must be the order
    /// announced in the setup request.
    pub fn decode(buf: &[u8], byte_order: ByteOrder) -> Result<Self, DecodeError> {
        if buf.len() < SETUP_FIXED_LEN {
            return Err(DecodeError::BufferTooSmall {
                what: "fixed setup fields",
                needed: SETUP_FIXED_LEN,
                available: buf.len(),
            });
        }

        let release_number = field_u32(buf, 0, byte_order, "release number")?;
        let resource_id_base = field_u32(buf, 4, byte_order, "resource id base")?;
        let resource_id_mask = field_u32(buf, 8, byte_order, "resource id mask")?;
        let motion_buffer_size = field_u32(buf, 12, byte_order, "motion buffer size")?;
        let vendor_len = field_u16(buf, 16, byte_order, "vendor length")?;
        let maximum_request_length = field_u16(buf, 18, byte_order, "maximum request length")?;
        let number_of_screens = field_u8(buf, 20, "screen count")?;
        let number_of_formats = field_u8(buf, 21, "format count")?;

        let image_byte_order = field_u8(buf, 22, "image byte order")?;
        let bitmap_format_bit_order = field_u8(buf, 23, "bitmap bit order")?;

        log::debug!("id base: 0x{:x}", resource_id_base);
        log::debug!("id mask: 0x{:x}", resource_id_mask);
        log::debug!("vendor length: {}", vendor_len);
        log::debug!("pixmap formats: {}", number_of_formats);

        let screens_offset = screens_start_offset(vendor_len, number_of_formats);
        log::debug!("screens offset: {}", screens_offset);

        // Nothing past the fixed part is read until the whole span up to the
        // root visual is known to be present.
        let needed = screens_offset + SCREEN_MIN_LEN;
        if buf.len() < needed {
            return Err(DecodeError::BufferTooSmall {
                what: "first screen",
                needed,
                available: buf.len(),
            });
        }
        if number_of_screens == 0 {
            log::warn!("setup payload lists no screens, reading the first one anyway");
        }

        let vendor_bytes = field(buf, SETUP_FIXED_LEN, vendor_len as usize, "vendor")?;
        let vendor = String::from_utf8_lossy(vendor_bytes).into_owned();

        let formats_offset = SETUP_FIXED_LEN + padded_len(vendor_len as usize);
        let formats_len = number_of_formats as usize * FORMAT_LEN;
        let pixmap_formats = field(buf, formats_offset, formats_len, "pixmap formats")?
            .chunks_exact(FORMAT_LEN)
            .map(Format::decode)
            .collect();

        let screen = ScreenDescriptor::decode(buf, screens_offset, byte_order)?;
        log::debug!("root window id: {}", screen.root.id());
        log::debug!("root visual id: {}", screen.root_visual);

        Ok(SetupPayload {
            release_number,
            resource_id_base,
            resource_id_mask,
            motion_buffer_size,
            vendor_len,
            maximum_request_length,
            number_of_screens,
            number_of_formats,
            image_byte_order,
            bitmap_format_bit_order,
            bitmap_format_scanline_unit: buf[24],
            bitmap_format_scanline_pad: buf[25],
            min_keycode: buf[26],
            max_keycode: buf[27],
            vendor,
            pixmap_formats,
            screens_offset,
            screen,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Success payload with the given vendor, formats and one screen
    fn payload(order: ByteOrder, vendor: &str, formats: &[Format], root: u32, visual: u32) -> Vec<u8> {
        let mut buf = vec![0u8; SETUP_FIXED_LEN];
        let put_u16 = |buf: &mut Vec<u8>, at: usize, v: u16| order.write_u16(&mut buf[at..at + 2], v);
        let put_u32 = |buf: &mut Vec<u8>, at: usize, v: u32| {
            let bytes = match order {
                ByteOrder::LSBFirst => v.to_le_bytes(),
                ByteOrder::MSBFirst => v.to_be_bytes(),
            };
            buf[at..at + 4].copy_from_slice(&bytes);
        };

        put_u32(&mut buf, 0, 12101004);
        put_u32(&mut buf, 4, 0x0040_0000);
        put_u32(&mut buf, 8, 0x001f_ffff);
        put_u32(&mut buf, 12, 256);
        put_u16(&mut buf, 16, vendor.len() as u16);
        put_u16(&mut buf, 18, 0xffff);
        buf[20] = 1;
        buf[21] = formats.len() as u8;
        buf[22] = order as u8;
        buf[23] = 0;
        buf[24] = 32;
        buf[25] = 32;
        buf[26] = 8;
        buf[27] = 255;

        buf.extend_from_slice(vendor.as_bytes());
        buf.resize(buf.len() + pad(vendor.len()), 0);
        for f in formats {
            buf.extend_from_slice(&[f.depth, f.bits_per_pixel, f.scanline_pad, 0, 0, 0, 0, 0]);
        }

        let screen = buf.len();
        buf.resize(screen + 40, 0);
        put_u32(&mut buf, screen, root);
        put_u16(&mut buf, screen + 20, 1920);
        put_u16(&mut buf, screen + 22, 1080);
        put_u32(&mut buf, screen + 32, visual);
        buf
    }

    #[test]
    fn test_request_layout() {
        let bytes = SetupRequest::default().encode();
        assert_eq!(bytes, [b'l', 0, 11, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let bytes = SetupRequest::new(ByteOrder::MSBFirst).encode();
        assert_eq!(bytes, [b'B', 0, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_request_parse_recovers_fields() {
        for order in [ByteOrder::LSBFirst, ByteOrder::MSBFirst] {
            let request = SetupRequest {
                byte_order: order,
                protocol_major_version: 11,
                protocol_minor_version: 3,
                auth_proto_name_len: 18,
                auth_proto_data_len: 16,
            };
            assert_eq!(SetupRequest::parse(&request.encode()), Ok(request));
        }
    }

    #[test]
    fn test_request_parse_rejects_unknown_marker() {
        let mut bytes = SetupRequest::default().encode();
        bytes[0] = b'x';
        assert_eq!(SetupRequest::parse(&bytes), Err(DecodeError::BadByteOrder(b'x')));
    }

    #[test]
    fn test_header_length_in_words() {
        let header = SetupResponseHeader::parse(&[1, 0, 11, 0, 0, 0, 10, 0], ByteOrder::LSBFirst);
        assert_eq!(header.status, SetupStatus::Success);
        assert_eq!(header.protocol_major_version, 11);
        assert_eq!(header.length, 10);
        assert_eq!(header.payload_len(), 40);

        let empty = SetupResponseHeader::parse(&[1, 0, 11, 0, 0, 0, 0, 0], ByteOrder::LSBFirst);
        assert_eq!(empty.payload_len(), 0);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(SetupStatus::from_u8(0), SetupStatus::Failed);
        assert_eq!(SetupStatus::from_u8(1), SetupStatus::Success);
        assert_eq!(SetupStatus::from_u8(2), SetupStatus::Authenticate);
        assert_eq!(SetupStatus::from_u8(7), SetupStatus::Unknown(7));
    }

    #[test]
    fn test_decode_minimal_payload() {
        let buf = payload(ByteOrder::LSBFirst, "", &[], 1, 2);
        let setup = SetupPayload::decode(&buf, ByteOrder::LSBFirst).unwrap();

        assert_eq!(setup.screens_offset, 32);
        assert_eq!(setup.screen.root, Window::new(1));
        assert_eq!(setup.screen.root_visual, VisualID::new(2));
        assert_eq!(setup.resource_id_base, 0x0040_0000);
        assert_eq!(setup.resource_id_mask, 0x001f_ffff);
        assert_eq!(setup.min_keycode, 8);
        assert_eq!(setup.max_keycode, 255);
    }

    #[test]
    fn test_decode_vendor_and_formats() {
        let formats = [
            Format { depth: 1, bits_per_pixel: 1, scanline_pad: 32 },
            Format { depth: 24, bits_per_pixel: 32, scanline_pad: 32 },
        ];
        let buf = payload(ByteOrder::LSBFirst, "The X.Org Foundation", &formats, 0x3ad, 0x21);
        let setup = SetupPayload::decode(&buf, ByteOrder::LSBFirst).unwrap();

        assert_eq!(setup.vendor, "The X.Org Foundation");
        assert_eq!(setup.pixmap_formats, formats);
        assert_eq!(setup.screens_offset, 32 + 20 + 16);
        assert_eq!(setup.screen.root, Window::new(0x3ad));
        assert_eq!(setup.screen.root_visual, VisualID::new(0x21));
        assert_eq!(setup.screen.width_in_pixels, 1920);
        assert_eq!(setup.screen.height_in_pixels, 1080);
    }

    #[test]
    fn test_vendor_padding_applied() {
        // 5-byte vendor occupies 8 bytes on the wire
        let buf = payload(ByteOrder::LSBFirst, "Xvnc!", &[], 7, 9);
        let setup = SetupPayload::decode(&buf, ByteOrder::LSBFirst).unwrap();

        assert_eq!(setup.screens_offset, 40);
        assert_eq!(setup.screen.root, Window::new(7));
        assert_eq!(setup.screen.root_visual, VisualID::new(9));
    }

    #[test]
    fn test_decode_msb_first() {
        let buf = payload(ByteOrder::MSBFirst, "abcd", &[], 0x0102_0304, 0x0a0b_0c0d);
        let setup = SetupPayload::decode(&buf, ByteOrder::MSBFirst).unwrap();

        assert_eq!(setup.vendor_len, 4);
        assert_eq!(setup.image_byte_order, 1);
        assert_eq!(setup.screen.root, Window::new(0x0102_0304));
        assert_eq!(setup.screen.root_visual, VisualID::new(0x0a0b_0c0d));
    }

    #[test]
    fn test_empty_payload_is_too_small() {
        assert_eq!(
            SetupPayload::decode(&[], ByteOrder::LSBFirst),
            Err(DecodeError::BufferTooSmall {
                what: "fixed setup fields",
                needed: 32,
                available: 0,
            })
        );
    }

    #[test]
    fn test_truncated_screen_is_rejected() {
        let mut buf = payload(ByteOrder::LSBFirst, "", &[], 1, 2);
        buf.truncate(32 + 35);
        assert_eq!(
            SetupPayload::decode(&buf, ByteOrder::LSBFirst),
            Err(DecodeError::BufferTooSmall {
                what: "first screen",
                needed: 68,
                available: 67,
            })
        );
    }

    #[test]
    fn test_oversized_format_count_is_rejected() {
        let mut buf = payload(ByteOrder::LSBFirst, "", &[], 1, 2);
        buf[21] = 200;
        let err = SetupPayload::decode(&buf, ByteOrder::LSBFirst).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BufferTooSmall {
                what: "first screen",
                needed: 32 + 1600 + 36,
                available: buf.len(),
            }
        );
    }

    #[test]
    fn test_zero_screen_count_still_decodes_root() {
        let mut buf = payload(ByteOrder::LSBFirst, "", &[], 1, 2);
        buf[20] = 0;
        let setup = SetupPayload::decode(&buf, ByteOrder::LSBFirst).unwrap();
        assert_eq!(setup.number_of_screens, 0);
        assert_eq!(setup.screen.root, Window::new(1));
        assert_eq!(setup.screen.root_visual, VisualID::new(2));
    }

    #[test]
    fn test_order_bytes_are_passed_through() {
        let mut buf = payload(ByteOrder::LSBFirst, "", &[], 1, 2);
        buf[22] = 2;
        buf[23] = 9;
        let setup = SetupPayload::decode(&buf, ByteOrder::LSBFirst).unwrap();
        assert_eq!(setup.image_byte_order, 2);
        assert_eq!(setup.bitmap_format_bit_order, 9);
        assert_eq!(setup.screen.root, Window::new(1));
    }
}
