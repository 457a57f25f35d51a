//! The fragmentation buffer and ALPDU construction (encapsulation).

use crate::bytes::ByteWriter;
use crate::config::Config;
use crate::crc::crc32;
use crate::error::TxError;
use crate::fragmentation::SeqNum3;
use crate::ppdu::LabelType;
use crate::ptype::{compressed_code, is_suppressible, CompressedPtype, ProtocolType};

/// Largest SDU payload this crate will encapsulate.
pub const MAX_SDU_LEN: usize = 4088;

const MAX_ALPDU_HEADER_LEN: usize = 3;
const MAX_ALPDU_TRAILER_LEN: usize = 4;

/// Offset, within an unstripped VLAN SDU payload, of its own 2-byte inner protocol-type field.
///
/// A VLAN SDU is a full Ethernet frame: 14-byte Ethernet header (dst/src MAC + the 0x8100
/// outer EtherType) followed by the 2-byte VLAN TCI, then the 2-byte inner protocol-type field
/// this constant points at. `14 + 2 = 16`.
///
/// The compressed/suppressed `VlanNoPtype` code (§4.1) means more than "omit the ALPDU-level
/// protocol-type field": whenever that code ends up representing the SDU (whether because its
/// field was omitted under suppression, or because it was written out explicitly as the 1-byte
/// compressed code), the VLAN frame's *own* inner EtherType field is additionally stripped from
/// the SDU bytes and must be reconstructed by the receiver from the IP version nibble (see
/// `crate::reassembly`'s VLAN fix-up). The source protocol leaves the exact SDU layout implicit;
/// this is the documented resolution (see DESIGN.md).
pub(crate) const VLAN_INNER_PTYPE_OFFSET: usize = 16;
/// Width, in bytes, of the VLAN inner protocol-type field stripped/reconstructed above.
pub(crate) const VLAN_INNER_PTYPE_LEN: usize = 2;

/// Capacity of a [`FragBuffer`]: the worst case is the largest SDU, plus the largest ALPDU header
/// (the 3-byte compressed-fallback form), plus the 4-byte CRC trailer.
pub const MAX_ALPDU_LEN: usize = MAX_ALPDU_HEADER_LEN + MAX_SDU_LEN + MAX_ALPDU_TRAILER_LEN;

/// A single SDU submitted to the transmitter: its payload and its uncompressed protocol type.
#[derive(Debug, Clone, Copy)]
pub struct Sdu<'a> {
    /// The SDU's uncompressed (16-bit EtherType) protocol type.
    pub protocol_type: ProtocolType,
    /// The SDU's payload. Must be at most [`MAX_SDU_LEN`] bytes.
    pub payload: &'a [u8],
}

impl<'a> Sdu<'a> {
    /// Creates a new `Sdu`.
    pub fn new(protocol_type: ProtocolType, payload: &'a [u8]) -> Self {
        Self {
            protocol_type,
            payload,
        }
    }
}

/// A zero-copy buffer holding one ALPDU (header, SDU and trailer) plus the bookkeeping needed to
/// emit it as a sequence of PPDUs.
///
/// The buffer is a single fixed-size array with the SDU always copied in starting at byte offset
/// [`MAX_ALPDU_HEADER_LEN`](constant@MAX_SDU_LEN); the ALPDU header is written right-justified
/// immediately before it, so headers shorter than the maximum leave the first few bytes of the
/// array unused rather than requiring a memmove. This is the "byte slice plus integer indices"
/// buffer the protocol's own design notes call for, prepending the header in place the way
/// `ByteWriter::split_off` allows working backwards from a reserved headroom.
pub struct FragBuffer {
    buf: [u8; MAX_ALPDU_LEN],
    alpdu_start: usize,
    sdu_end: usize,
    trailer_len: usize,
    cursor: usize,
    ptype_suppressed: bool,
    label_type: LabelType,
    initialised: bool,
    sdu_copied: bool,
}

impl FragBuffer {
    /// Creates a new, empty buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_ALPDU_LEN],
            alpdu_start: 0,
            sdu_end: 0,
            trailer_len: 0,
            cursor: 0,
            ptype_suppressed: false,
            label_type: LabelType::ImplicitProtocolType,
            initialised: false,
            sdu_copied: false,
        }
    }

    /// Resets the buffer to its initial, empty state, ready for a new ALPDU.
    pub fn reset(&mut self) {
        self.alpdu_start = 0;
        self.sdu_end = 0;
        self.trailer_len = 0;
        self.cursor = 0;
        self.ptype_suppressed = false;
        self.label_type = LabelType::ImplicitProtocolType;
        self.initialised = false;
        self.sdu_copied = false;
    }

    /// Whether an ALPDU has been built into this buffer and not yet fully emitted.
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn alpdu_end(&self) -> usize {
        self.sdu_end + self.trailer_len
    }

    /// Total ALPDU length including the trailer, if any was reserved.
    pub fn total_len(&self) -> usize {
        self.alpdu_end() - self.alpdu_start
    }

    /// ALPDU length excluding the trailer (header + SDU only) — this is what a COMP PPDU carries.
    pub fn len_without_trailer(&self) -> usize {
        self.sdu_end - self.alpdu_start
    }

    /// Whether no bytes of this ALPDU have been emitted yet.
    pub fn cursor_at_start(&self) -> bool {
        self.cursor == self.alpdu_start
    }

    /// Number of bytes (from the cursor to the end of the ALPDU, trailer included) left to emit.
    pub fn remaining(&self) -> usize {
        self.alpdu_end() - self.cursor
    }

    /// Whether the carried ALPDU has its protocol-type field suppressed.
    pub fn ptype_suppressed(&self) -> bool {
        self.ptype_suppressed
    }

    /// Whether the trailer reserved for this ALPDU is the 4-byte CRC-32 (`true`) or the 1-byte
    /// sequence number (`false`).
    pub fn uses_crc(&self) -> bool {
        self.trailer_len == 4
    }

    /// The PPDU label type to record in this ALPDU's COMP/START header.
    pub fn label_type(&self) -> LabelType {
        self.label_type
    }

    /// Slice covering the header and SDU, but not the trailer (used to emit a COMP PPDU).
    pub fn bytes_without_trailer(&self) -> &[u8] {
        &self.buf[self.alpdu_start..self.sdu_end]
    }

    /// Advances the cursor by `len` bytes and returns the slice that was skipped over, for the
    /// fragmentation engine to copy into a PPDU payload.
    pub fn take(&mut self, len: usize) -> &[u8] {
        let start = self.cursor;
        self.cursor += len;
        debug_assert!(self.cursor <= self.alpdu_end());
        &self.buf[start..self.cursor]
    }
}

impl Default for FragBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an ALPDU for `sdu` into `frag_buf`, per `config`.
///
/// Handles protocol-type omission, compression and passthrough (§4.1), and always reserves and
/// fills in the trailer (CRC-32 or sequence number) regardless of whether the ALPDU will end up
/// fitting in a single COMP PPDU — a COMP emission simply never includes those trailer bytes on
/// the wire. This keeps trailer computation (and sequence-number advancement) a pure function of
/// `encapsulate`, not of a burst-size decision made later by the fragmentation engine.
///
/// On failure (`SDU_TOO_BIG`), `frag_buf` is left untouched.
pub fn encapsulate(
    frag_buf: &mut FragBuffer,
    sdu: Sdu<'_>,
    config: &Config,
    seq_nb: &mut SeqNum3,
) -> Result<(), TxError> {
    if sdu.payload.len() > MAX_SDU_LEN {
        return Err(TxError::SduTooBig);
    }

    // The `VlanNoPtype` code means the SDU's own inner protocol-type field is missing, not just
    // that the ALPDU header omits it — whether that code ends up representing the SDU via
    // suppression (the header is absent) or via explicit 1-byte compression (the code is written
    // out). Stripping is only possible when the payload actually has the field to strip; if it's
    // too short, fall back to a representation that doesn't require stripping it.
    let is_vlan = sdu.protocol_type == ProtocolType::VLAN;
    let vlan_strippable = sdu.payload.len() >= VLAN_INNER_PTYPE_OFFSET + VLAN_INNER_PTYPE_LEN;

    let ptype_suppressed = config.allow_ptype_omission
        && is_suppressible(sdu.protocol_type, config.implicit_protocol_type)
        && (!is_vlan || vlan_strippable);

    let header_len = if ptype_suppressed {
        0
    } else if config.use_compressed_ptype {
        match compressed_code(sdu.protocol_type) {
            Some(CompressedPtype::VlanNoPtype) if !vlan_strippable => 2,
            Some(_) => 1,
            None => 3,
        }
    } else {
        2
    };

    let vlan_strip_active = is_vlan && header_len <= 1;
    let stripped_len = if vlan_strip_active {
        sdu.payload.len() - VLAN_INNER_PTYPE_LEN
    } else {
        sdu.payload.len()
    };

    let sdu_start = MAX_ALPDU_HEADER_LEN;
    let sdu_end = sdu_start + stripped_len;
    let alpdu_start = sdu_start - header_len;

    if vlan_strip_active {
        let (head, rest) = sdu.payload.split_at(VLAN_INNER_PTYPE_OFFSET);
        let tail = &rest[VLAN_INNER_PTYPE_LEN..];
        frag_buf.buf[sdu_start..sdu_start + VLAN_INNER_PTYPE_OFFSET].copy_from_slice(head);
        frag_buf.buf[sdu_start + VLAN_INNER_PTYPE_OFFSET..sdu_end].copy_from_slice(tail);
    } else {
        frag_buf.buf[sdu_start..sdu_end].copy_from_slice(sdu.payload);
    }

    if header_len > 0 {
        let mut writer = ByteWriter::new(&mut frag_buf.buf[alpdu_start..sdu_start]);
        match header_len {
            1 => {
                let code: u8 = compressed_code(sdu.protocol_type).unwrap().into();
                writer.write_u8(code)?;
            }
            2 => writer.write_u16_le(sdu.protocol_type.as_raw())?,
            3 => {
                writer.write_u8(0xff)?;
                writer.write_u16_le(sdu.protocol_type.as_raw())?;
            }
            _ => unreachable!(),
        }
    }

    let trailer_len = if config.allow_alpdu_crc { 4 } else { 1 };
    if config.allow_alpdu_crc {
        let crc = crc32(&frag_buf.buf[alpdu_start..sdu_end]);
        let mut writer = ByteWriter::new(&mut frag_buf.buf[sdu_end..sdu_end + 4]);
        writer.write_u32_le(crc)?;
    } else {
        frag_buf.buf[sdu_end] = seq_nb.to_u8();
        seq_nb.advance();
    }

    frag_buf.alpdu_start = alpdu_start;
    frag_buf.sdu_end = sdu_end;
    frag_buf.trailer_len = trailer_len;
    frag_buf.cursor = alpdu_start;
    frag_buf.ptype_suppressed = ptype_suppressed;
    frag_buf.label_type = if sdu.protocol_type == ProtocolType::L2S {
        LabelType::Signal
    } else {
        LabelType::ImplicitProtocolType
    };
    frag_buf.initialised = true;
    frag_buf.sdu_copied = true;

    Ok(())
}
