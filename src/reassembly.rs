//! Reassembly: the receiver-side per-fragment-id state machine, ALPDU trailer validation and
//! protocol-type reconstruction (§4.5).
//!
//! One [`ReassemblyContext`] exists per fragment-id on a [`crate::receiver::Receiver`]. It owns a
//! fixed-size buffer that accumulates the raw ALPDU bytes (header + SDU + trailer) across a
//! START PPDU and zero or more CONT/END PPDUs, mirroring the transmitter's [`crate::alpdu::FragBuffer`]
//! but built up instead of drained.

use crate::alpdu::{MAX_ALPDU_LEN, VLAN_INNER_PTYPE_LEN, VLAN_INNER_PTYPE_OFFSET};
use crate::bytes::ByteReader;
use crate::config::Config;
use crate::crc::crc32;
use crate::error::{Error, RxError};
use crate::fragmentation::SeqNum3;
use crate::ppdu::LabelType;
use crate::ptype::{decompress, CompressedPtype, ProtocolType};

/// Extra headroom reserved at the end of a reassembly buffer for the VLAN protocol-type
/// reconstruction, which expands a delivered SDU by [`VLAN_INNER_PTYPE_LEN`] bytes in place.
const RECONSTRUCT_SLACK: usize = VLAN_INNER_PTYPE_LEN;

/// Capacity of a [`ReassemblyContext`]'s buffer and of the scratch buffer used for COMP PPDUs:
/// the largest ALPDU (header + SDU + trailer), plus the VLAN reconstruction slack.
pub const MAX_REASSEMBLY_LEN: usize = MAX_ALPDU_LEN + RECONSTRUCT_SLACK;

/// A fully reassembled SDU, borrowed from the receiver's internal per-context or scratch buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct ReassembledSdu<'a> {
    /// The SDU's uncompressed protocol type, reconstructed if necessary.
    pub protocol_type: ProtocolType,
    /// The SDU payload.
    pub payload: &'a [u8],
}

/// Which ALPDU header variant (§4.1) a reassembled frame used, and what it resolves to.
enum HeaderKind {
    /// The protocol-type field was omitted; the implicit default applies.
    Suppressed,
    /// A 1-byte compressed code.
    Compressed1(CompressedPtype),
    /// A 2-byte uncompressed protocol type (no compression in use).
    Direct2(ProtocolType),
    /// The 3-byte compressed-fallback form (`0xff` + 2-byte uncompressed type).
    Fallback3(ProtocolType),
}

impl HeaderKind {
    fn len(&self) -> usize {
        match self {
            HeaderKind::Suppressed => 0,
            HeaderKind::Compressed1(_) => 1,
            HeaderKind::Direct2(_) => 2,
            HeaderKind::Fallback3(_) => 3,
        }
    }
}

fn decode_header(buf: &[u8], ptype_suppressed: bool, config: &Config) -> Result<HeaderKind, RxError> {
    if ptype_suppressed {
        return Ok(HeaderKind::Suppressed);
    }
    if config.use_compressed_ptype {
        let first = *buf.first().ok_or(RxError::Codec(Error::Eof))?;
        if first == 0xff {
            let rest = buf.get(1..3).ok_or(RxError::Codec(Error::Eof))?;
            let ptype = ProtocolType::from_raw(u16::from_le_bytes([rest[0], rest[1]]));
            Ok(HeaderKind::Fallback3(ptype))
        } else {
            Ok(HeaderKind::Compressed1(CompressedPtype::from(first)))
        }
    } else {
        let rest = buf.get(0..2).ok_or(RxError::Codec(Error::Eof))?;
        let ptype = ProtocolType::from_raw(u16::from_le_bytes([rest[0], rest[1]]));
        Ok(HeaderKind::Direct2(ptype))
    }
}

/// Parses the ALPDU header out of `buf[..header_sdu_len]`, reconstructs the VLAN protocol type
/// (and re-inserts its stripped field) if required, and returns the delivered SDU.
///
/// `buf` must have at least `header_sdu_len + VLAN_INNER_PTYPE_LEN` bytes of capacity so the VLAN
/// special case has room to expand the SDU in place.
fn finish(
    buf: &mut [u8],
    header_sdu_len: usize,
    ptype_suppressed: bool,
    config: &Config,
) -> Result<ReassembledSdu<'_>, RxError> {
    let kind = decode_header(&buf[..header_sdu_len], ptype_suppressed, config)?;
    let header_len = kind.len();

    match kind {
        HeaderKind::Direct2(ptype) | HeaderKind::Fallback3(ptype) => Ok(ReassembledSdu {
            protocol_type: ptype,
            payload: &buf[header_len..header_sdu_len],
        }),
        HeaderKind::Suppressed => {
            finish_compressed(buf, header_len, header_sdu_len, config.implicit_protocol_type)
        }
        HeaderKind::Compressed1(code) => finish_compressed(buf, header_len, header_sdu_len, code),
    }
}

fn finish_compressed(
    buf: &mut [u8],
    header_len: usize,
    header_sdu_len: usize,
    code: CompressedPtype,
) -> Result<ReassembledSdu<'_>, RxError> {
    if code == CompressedPtype::VlanNoPtype {
        let sdu_len = header_sdu_len - header_len;
        if sdu_len < VLAN_INNER_PTYPE_OFFSET + 1 {
            return Err(RxError::MalformedVlanReconstruction);
        }
        let nibble_pos = header_len + VLAN_INNER_PTYPE_OFFSET;
        let version = buf[nibble_pos] >> 4;
        let ptype = match version {
            4 => ProtocolType::IPV4,
            6 => ProtocolType::IPV6,
            _ => return Err(RxError::MalformedVlanReconstruction),
        };

        // Shift the tail right to make room for the field this compressed code stripped.
        buf.copy_within(nibble_pos..header_sdu_len, nibble_pos + VLAN_INNER_PTYPE_LEN);
        buf[nibble_pos..nibble_pos + VLAN_INNER_PTYPE_LEN]
            .copy_from_slice(&ptype.as_raw().to_le_bytes());

        let new_end = header_sdu_len + VLAN_INNER_PTYPE_LEN;
        Ok(ReassembledSdu {
            protocol_type: ProtocolType::VLAN,
            payload: &buf[header_len..new_end],
        })
    } else if code == CompressedPtype::Ip {
        let nibble = buf.get(header_len).map(|b| b >> 4);
        let ptype = decompress(code, nibble).ok_or(RxError::AmbiguousImplicitProtocolType)?;
        Ok(ReassembledSdu {
            protocol_type: ptype,
            payload: &buf[header_len..header_sdu_len],
        })
    } else {
        let ptype = decompress(code, None).ok_or(RxError::Codec(Error::InvalidValue))?;
        Ok(ReassembledSdu {
            protocol_type: ptype,
            payload: &buf[header_len..header_sdu_len],
        })
    }
}

/// Processes a COMP PPDU, which carries a complete ALPDU with no trailer and needs no context.
///
/// `scratch` is borrowed from the caller (the [`crate::receiver::Receiver`] keeps one such buffer)
/// since COMP delivery may need in-place room to grow by [`VLAN_INNER_PTYPE_LEN`] bytes.
pub fn process_comp<'b>(
    payload: &[u8],
    ptype_suppressed: bool,
    config: &Config,
    scratch: &'b mut [u8; MAX_REASSEMBLY_LEN],
) -> Result<ReassembledSdu<'b>, RxError> {
    if payload.len() > MAX_REASSEMBLY_LEN - RECONSTRUCT_SLACK {
        return Err(RxError::Codec(Error::InvalidLength));
    }
    scratch[..payload.len()].copy_from_slice(payload);
    finish(scratch, payload.len(), ptype_suppressed, config)
}

/// Per-fragment-id receiver state: the in-progress reassembly buffer plus the sequence-number
/// state that must persist across ALPDUs on the same fragment-id.
pub struct ReassemblyContext {
    buf: [u8; MAX_REASSEMBLY_LEN],
    declared_total: usize,
    received: usize,
    uses_crc: bool,
    ptype_suppressed: bool,
    #[allow(dead_code)] // recorded for symmetry with the transmitter side; not yet consumed.
    label_type: LabelType,
    in_progress: bool,
    seqnum_initialised: bool,
    expected_seqnum: SeqNum3,
}

impl ReassemblyContext {
    /// Creates a new, empty (FREE) context.
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_REASSEMBLY_LEN],
            declared_total: 0,
            received: 0,
            uses_crc: false,
            ptype_suppressed: false,
            label_type: LabelType::ImplicitProtocolType,
            in_progress: false,
            seqnum_initialised: false,
            expected_seqnum: SeqNum3::new(0),
        }
    }

    /// Whether this context is currently IN_PROGRESS (has accepted a START PPDU but not yet its
    /// END).
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Drops whatever partial ALPDU this context holds, returning it to FREE.
    ///
    /// The sequence-number state is untouched: §4.5's gap counting spans the lifetime of a
    /// fragment-id, not of a single ALPDU.
    pub fn force_release(&mut self) {
        self.in_progress = false;
        self.declared_total = 0;
        self.received = 0;
    }

    /// FREE + START PPDU: allocates the context.
    pub fn start(
        &mut self,
        total_len: usize,
        uses_crc: bool,
        ptype_suppressed: bool,
        label_type: LabelType,
        payload: &[u8],
    ) -> Result<(), RxError> {
        if total_len > MAX_REASSEMBLY_LEN - RECONSTRUCT_SLACK || payload.len() > total_len {
            return Err(RxError::Codec(Error::InvalidLength));
        }
        self.buf[..payload.len()].copy_from_slice(payload);
        self.declared_total = total_len;
        self.received = payload.len();
        self.uses_crc = uses_crc;
        self.ptype_suppressed = ptype_suppressed;
        self.label_type = label_type;
        self.in_progress = true;
        Ok(())
    }

    /// IN_PROGRESS + CONT PPDU: appends a middle fragment.
    pub fn append(&mut self, payload: &[u8]) -> Result<(), RxError> {
        if self.received + payload.len() > self.declared_total {
            self.force_release();
            return Err(RxError::TotalLengthExceeded);
        }
        self.buf[self.received..self.received + payload.len()].copy_from_slice(payload);
        self.received += payload.len();
        Ok(())
    }

    /// IN_PROGRESS + END PPDU: appends the last fragment (trailer included), validates the
    /// trailer, reconstructs the protocol type and releases the context either way.
    ///
    /// Returns the delivered SDU and the number of packets inferred lost from a sequence-number
    /// gap (always 0 in CRC mode), or an error if the ALPDU must be dropped.
    pub fn end<'c>(
        &'c mut self,
        payload: &[u8],
        config: &Config,
    ) -> Result<(ReassembledSdu<'c>, u32), RxError> {
        let total_after = self.received + payload.len();
        if total_after > self.declared_total {
            self.force_release();
            return Err(RxError::TotalLengthExceeded);
        }
        self.buf[self.received..total_after].copy_from_slice(payload);
        self.received = total_after;
        if self.received != self.declared_total {
            self.force_release();
            return Err(RxError::TotalLengthNotReached);
        }

        let (header_sdu_len, lost) = match self.validate_and_strip_trailer() {
            Ok(v) => v,
            Err(e) => {
                self.force_release();
                return Err(e);
            }
        };
        let ptype_suppressed = self.ptype_suppressed;
        self.force_release();

        let sdu = finish(&mut self.buf, header_sdu_len, ptype_suppressed, config)?;
        Ok((sdu, lost))
    }

    fn validate_and_strip_trailer(&mut self) -> Result<(usize, u32), RxError> {
        let trailer_len = if self.uses_crc { 4 } else { 1 };
        let header_sdu_len = self.received - trailer_len;

        if self.uses_crc {
            let mut reader = ByteReader::new(&self.buf[header_sdu_len..self.received]);
            let trailer_crc = reader.read_u32_le().map_err(RxError::Codec)?;
            let computed = crc32(&self.buf[..header_sdu_len]);
            if computed != trailer_crc {
                return Err(RxError::TrailerMismatch);
            }
            Ok((header_sdu_len, 0))
        } else {
            let received_seq = SeqNum3::new(self.buf[header_sdu_len] & 0x07);

            if !self.seqnum_initialised {
                self.seqnum_initialised = true;
                self.expected_seqnum = received_seq;
                self.expected_seqnum.advance();
                return Ok((header_sdu_len, 0));
            }

            let delta = received_seq.wrapping_sub(self.expected_seqnum);
            self.expected_seqnum = received_seq;
            self.expected_seqnum.advance();

            // The 3-bit field can't distinguish "N packets lost" from "N packets reordered
            // backwards" on its own; the safe reading splits the cycle in half (see
            // DESIGN.md): a small forward delta (1..=3) is a plausible loss count and is still
            // delivered, a larger one looks like reordering and is treated as ambiguous.
            match delta {
                0 => Ok((header_sdu_len, 0)),
                1..=3 => Ok((header_sdu_len, u32::from(delta))),
                _ => Err(RxError::TrailerMismatch),
            }
        }
    }
}

impl Default for ReassemblyContext {
    fn default() -> Self {
        Self::new()
    }
}
