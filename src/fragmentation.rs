//! Fragmentation: turning an ALPDU held in a [`FragBuffer`] into a sequence of PPDUs.

use crate::alpdu::FragBuffer;
use crate::bytes::{ByteWriter, ToBytes};
use crate::error::TxError;
use crate::ppdu::{
    CompHeader, ContEndHeader, StartHeader, CONT_END_HEADER_LEN, COMP_HEADER_LEN, START_HEADER_LEN,
};

/// A wrapping 3-bit (mod 8) ALPDU sequence number, used by the sequence-number trailer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeqNum3(u8);

impl SeqNum3 {
    /// Creates a sequence number from its raw value, masking off anything above the low 3 bits.
    pub const fn new(raw: u8) -> Self {
        Self(raw & 0x07)
    }

    /// Returns the raw 3-bit value (0..=7).
    pub fn to_u8(self) -> u8 {
        self.0
    }

    /// Advances to the next sequence number, wrapping `7 -> 0`.
    pub fn advance(&mut self) {
        self.0 = (self.0 + 1) & 0x07;
    }

    /// Computes `self - other`, wrapped into `0..=7`.
    ///
    /// Used by the receiver to count lost packets between an expected and a received sequence
    /// number.
    pub fn wrapping_sub(self, other: Self) -> u8 {
        self.0.wrapping_sub(other.0) & 0x07
    }
}

impl From<u8> for SeqNum3 {
    fn from(raw: u8) -> Self {
        Self::new(raw)
    }
}

/// Outcome of a successful [`emit_ppdu`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    /// A fragment was emitted; more remain (`usize` is the number of bytes written to `out`).
    More(usize),
    /// The final fragment (COMP or END) was emitted; the caller should release the context
    /// (`usize` is the number of bytes written to `out`).
    Done(usize),
}

impl EmitStatus {
    /// Number of bytes written to the output buffer, regardless of variant.
    pub fn bytes_written(self) -> usize {
        match self {
            EmitStatus::More(n) | EmitStatus::Done(n) => n,
        }
    }

    /// Whether this was the final fragment.
    pub fn is_done(self) -> bool {
        matches!(self, EmitStatus::Done(_))
    }
}

/// Emits one PPDU of at most `burst_size` bytes from the ALPDU held in `frag_buf`, writing it to
/// `out` (which must be at least `burst_size` bytes long).
///
/// `frag_id` is stamped into START/CONT/END headers. `frag_count` is the number of non-COMP
/// fragments emitted so far for this ALPDU; it is compared against `max_fragment_count` before
/// emitting another START or CONT fragment and incremented on success.
///
/// Returns [`TxError::ContextIdle`] if no ALPDU is pending, [`TxError::BurstTooSmall`] if
/// `burst_size` cannot fit even a minimal fragment, and [`TxError::TooManyFragments`] if emitting
/// another fragment would exceed `max_fragment_count`.
pub fn emit_ppdu(
    frag_buf: &mut FragBuffer,
    frag_id: u8,
    burst_size: usize,
    frag_count: &mut u32,
    max_fragment_count: u32,
    out: &mut [u8],
) -> Result<EmitStatus, TxError> {
    if !frag_buf.is_initialised() {
        return Err(TxError::ContextIdle);
    }

    if frag_buf.cursor_at_start() {
        let without_trailer = frag_buf.len_without_trailer();

        if burst_size >= without_trailer + COMP_HEADER_LEN {
            let header = CompHeader::new(
                frag_buf.label_type(),
                frag_buf.ptype_suppressed(),
                without_trailer as u16,
            )?;
            let mut writer = ByteWriter::new(out);
            header.to_bytes(&mut writer)?;
            let payload = frag_buf.take(without_trailer);
            writer.write_slice(payload)?;
            return Ok(EmitStatus::Done(COMP_HEADER_LEN + without_trailer));
        }

        if burst_size < START_HEADER_LEN + 1 {
            return Err(TxError::BurstTooSmall);
        }
        if *frag_count >= max_fragment_count {
            return Err(TxError::TooManyFragments);
        }

        let total = frag_buf.total_len();
        let max_payload = burst_size - START_HEADER_LEN;
        // Leave at least one byte of ALPDU for a later END fragment: a START is never the last
        // fragment of a multi-fragment ALPDU.
        let frag_len = core::cmp::min(max_payload, total.saturating_sub(1)).max(1);

        let header = StartHeader::new(
            frag_buf.label_type(),
            frag_buf.ptype_suppressed(),
            frag_len as u16,
            frag_id,
            total as u16,
            frag_buf.uses_crc(),
        )?;
        let mut writer = ByteWriter::new(out);
        header.to_bytes(&mut writer)?;
        let payload = frag_buf.take(frag_len);
        writer.write_slice(payload)?;
        *frag_count += 1;
        Ok(EmitStatus::More(START_HEADER_LEN + frag_len))
    } else {
        if burst_size < CONT_END_HEADER_LEN + 1 {
            return Err(TxError::BurstTooSmall);
        }

        let remaining = frag_buf.remaining();

        if remaining <= burst_size - CONT_END_HEADER_LEN {
            let header = ContEndHeader::new(true, frag_id, remaining as u16)?;
            let mut writer = ByteWriter::new(out);
            header.to_bytes(&mut writer)?;
            let payload = frag_buf.take(remaining);
            writer.write_slice(payload)?;
            Ok(EmitStatus::Done(CONT_END_HEADER_LEN + remaining))
        } else {
            if *frag_count >= max_fragment_count {
                return Err(TxError::TooManyFragments);
            }

            let frag_len = burst_size - CONT_END_HEADER_LEN;
            let header = ContEndHeader::new(false, frag_id, frag_len as u16)?;
            let mut writer = ByteWriter::new(out);
            header.to_bytes(&mut writer)?;
            let payload = frag_buf.take(frag_len);
            writer.write_slice(payload)?;
            *frag_count += 1;
            Ok(EmitStatus::More(CONT_END_HEADER_LEN + frag_len))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpdu::{encapsulate, Sdu};
    use crate::config::Config;
    use crate::ppdu::Pdu;
    use crate::ptype::{CompressedPtype, ProtocolType};

    fn make_buf(sdu_len: usize) -> (FragBuffer, Config) {
        let config = Config::new(
            false,
            false,
            false,
            true,
            false,
            CompressedPtype::Ipv4,
            0,
            0,
            0,
            u32::MAX,
        )
        .unwrap();
        let mut seq = SeqNum3::default();
        let mut buf = FragBuffer::new();
        let payload = vec![0u8; sdu_len];
        encapsulate(&mut buf, Sdu::new(ProtocolType::IPV4, &payload), &config, &mut seq).unwrap();
        (buf, config)
    }

    #[test]
    fn small_alpdu_fits_in_one_comp_ppdu() {
        let (mut buf, _config) = make_buf(10);
        let mut frag_count = 0;
        let mut out = [0u8; 64];
        let status = emit_ppdu(&mut buf, 0, 64, &mut frag_count, u32::MAX, &mut out).unwrap();
        assert!(status.is_done());

        let mut reader = crate::bytes::ByteReader::new(&out[..status.bytes_written()]);
        match Pdu::parse(&mut reader).unwrap().unwrap() {
            Pdu::Comp { payload, .. } => assert_eq!(payload.len(), 12),
            other => panic!("expected Comp, got {:?}", other),
        }
    }

    #[test]
    fn large_alpdu_fragments_into_start_cont_end() {
        let (mut buf, _config) = make_buf(20);
        let total = buf.total_len();
        let mut frag_count = 0;
        let mut out = [0u8; 16];

        let first = emit_ppdu(&mut buf, 2, 10, &mut frag_count, u32::MAX, &mut out).unwrap();
        assert!(!first.is_done());
        let mut reader = crate::bytes::ByteReader::new(&out[..first.bytes_written()]);
        let start_payload_len = match Pdu::parse(&mut reader).unwrap().unwrap() {
            Pdu::Start { header, payload } => {
                assert_eq!(header.frag_id(), 2);
                assert_eq!(header.total_len() as usize, total);
                payload.len()
            }
            other => panic!("expected Start, got {:?}", other),
        };

        let mut consumed = start_payload_len;
        let mut last_was_end = false;
        for _ in 0..10 {
            let status = emit_ppdu(&mut buf, 2, 10, &mut frag_count, u32::MAX, &mut out).unwrap();
            let written = status.bytes_written();
            let mut reader = crate::bytes::ByteReader::new(&out[..written]);
            match Pdu::parse(&mut reader).unwrap().unwrap() {
                Pdu::Cont { header, payload } => {
                    assert_eq!(header.frag_id(), 2);
                    consumed += payload.len();
                }
                Pdu::End { header, payload } => {
                    assert_eq!(header.frag_id(), 2);
                    consumed += payload.len();
                    last_was_end = true;
                }
                other => panic!("unexpected {:?}", other),
            }
            if status.is_done() {
                break;
            }
        }

        assert!(last_was_end);
        assert_eq!(consumed, total);
    }

    #[test]
    fn burst_too_small_for_cont() {
        let (mut buf, _config) = make_buf(20);
        let mut frag_count = 0;
        let mut out = [0u8; 16];
        emit_ppdu(&mut buf, 0, 10, &mut frag_count, u32::MAX, &mut out).unwrap();
        assert_eq!(
            emit_ppdu(&mut buf, 0, 2, &mut frag_count, u32::MAX, &mut out),
            Err(TxError::BurstTooSmall)
        );
    }

    #[test]
    fn tie_break_emits_end_when_remainder_fits_exactly() {
        let (mut buf, _config) = make_buf(8);
        // total = header(2, compressed) + 8 + trailer(1) = 11
        let total = buf.total_len();
        assert_eq!(total, 11);
        let mut frag_count = 0;
        let mut out = [0u8; 16];
        // First burst takes all but the last byte via START (burst 10 => frag_len = min(6, 10) = 6).
        let first = emit_ppdu(&mut buf, 1, 10, &mut frag_count, u32::MAX, &mut out).unwrap();
        assert!(!first.is_done());
        // Remaining is total-6=5; a burst of exactly 7 (5 + 2-byte header) should emit END.
        let second = emit_ppdu(&mut buf, 1, 7, &mut frag_count, u32::MAX, &mut out).unwrap();
        assert!(second.is_done());
    }

    #[test]
    fn idle_context_errors() {
        let mut buf = FragBuffer::new();
        let mut out = [0u8; 16];
        let mut frag_count = 0;
        assert_eq!(
            emit_ppdu(&mut buf, 0, 16, &mut frag_count, u32::MAX, &mut out),
            Err(TxError::ContextIdle)
        );
    }

    #[test]
    fn too_many_fragments_is_rejected() {
        let (mut buf, _config) = make_buf(20);
        let mut frag_count = 1;
        let mut out = [0u8; 16];
        assert_eq!(
            emit_ppdu(&mut buf, 0, 10, &mut frag_count, 1, &mut out),
            Err(TxError::TooManyFragments)
        );
    }
}
