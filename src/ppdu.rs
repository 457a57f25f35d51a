//! PPDU (Payload PDU) headers and the `Pdu` enum.
//!
//! Every PPDU header is a fixed-size bitfield packed big-endian (MSb-first) into its 16- or 32-bit
//! word: a newtype over an integer with bit-accessor methods, rather than a `#[repr(C)]` struct.

use crate::bytes::{ByteReader, ByteWriter, FromBytes, ToBytes};
use crate::error::Error;

/// Size in bytes of a COMP PPDU header.
pub const COMP_HEADER_LEN: usize = 2;
/// Size in bytes of a START PPDU header.
pub const START_HEADER_LEN: usize = 4;
/// Size in bytes of a CONT or END PPDU header.
pub const CONT_END_HEADER_LEN: usize = 2;

/// Largest value the COMP and START 11-bit PPDU length fields can hold.
pub const MAX_PPDU_LENGTH: u16 = 0x7ff;
/// Largest value the CONT/END 10-bit PPDU length field can hold.
///
/// One bit narrower than [`MAX_PPDU_LENGTH`]: the freed bit carries a fixed discriminator (see
/// `ContEndHeader::new`) so that a legal CONT/END header never begins with an all-zero byte, which
/// would otherwise be indistinguishable from FPDU padding.
pub const MAX_CONT_END_LENGTH: u16 = 0x3ff;
/// Largest value the 12-bit START total-ALPDU-length field can hold.
pub const MAX_TOTAL_ALPDU_LENGTH: u16 = 0xfff;
/// Largest fragment-id (3 bits).
pub const MAX_FRAG_ID: u8 = 7;

/// A validated fragment-id (0..=7), selecting one of the eight independent
/// fragmentation/reassembly contexts on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragId(u8);

impl FragId {
    /// Constructs a `FragId`, returning `None` if `raw` is greater than [`MAX_FRAG_ID`].
    pub const fn new(raw: u8) -> Option<Self> {
        if raw > MAX_FRAG_ID {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Returns the raw fragment-id value (0..=7).
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// The 2-bit PPDU label type carried by COMP and START headers.
///
/// Only two values are legal: the ordinary default label (used for every SDU type except L2
/// signalling) and the signal label (used for L2S, per the suppressibility table's "label type
/// 3"). Both are accepted by this implementation; see the Open Question recorded in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelType {
    /// Label identifies the SDU by the configured implicit protocol type.
    ImplicitProtocolType,
    /// Label identifies an RLE-internal (L2S) signal.
    Signal,
}

impl LabelType {
    fn to_raw(self) -> u16 {
        match self {
            LabelType::ImplicitProtocolType => 0,
            LabelType::Signal => 3,
        }
    }

    fn from_raw(raw: u16) -> Self {
        match raw {
            3 => LabelType::Signal,
            _ => LabelType::ImplicitProtocolType,
        }
    }
}

/// COMP PPDU header: a single PPDU carrying a complete, unfragmented ALPDU.
///
/// ```text
///  0       1         2  3   4            15
///  +-------+---------+--+---+-------------+
///  | S=1   | E=1     |LT|PTS| length (11)  |
///  +-------+---------+--+---+-------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompHeader(u16);

impl CompHeader {
    /// Creates a new COMP header. `length` is the ALPDU length and must fit in 11 bits.
    pub fn new(label_type: LabelType, ptype_suppressed: bool, length: u16) -> Result<Self, Error> {
        if length > MAX_PPDU_LENGTH {
            return Err(Error::InvalidLength);
        }
        let mut raw = 0b11u16 << 14;
        raw |= label_type.to_raw() << 12;
        raw |= (ptype_suppressed as u16) << 11;
        raw |= length;
        Ok(Self(raw))
    }

    /// Label type recorded in this header.
    pub fn label_type(&self) -> LabelType {
        LabelType::from_raw((self.0 >> 12) & 0b11)
    }

    /// Whether the carried ALPDU has its protocol-type field suppressed.
    pub fn ptype_suppressed(&self) -> bool {
        (self.0 >> 11) & 1 != 0
    }

    /// Length of the ALPDU carried by this PPDU.
    pub fn length(&self) -> u16 {
        self.0 & MAX_PPDU_LENGTH
    }
}

impl ToBytes for CompHeader {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_be(self.0)
    }
}

impl<'a> FromBytes<'a> for CompHeader {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let raw = bytes.read_u16_be()?;
        if raw >> 14 != 0b11 {
            return Err(Error::InvalidValue);
        }
        Ok(Self(raw))
    }
}

/// START PPDU header: the first fragment of a multi-fragment ALPDU.
///
/// ```text
///  0  1  2  3   4            15   16 17 18   19                       30  31
///  +--+--+--+---+-------------+---+-----------+----------------------+----+
///  |S=1|E=0|LT|PTS|fragLen(11)|FID(3)|totalLen (12)                  |CRC |
///  +--+--+--+---+-------------+---+-----------+----------------------+----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartHeader(u32);

impl StartHeader {
    /// Creates a new START header.
    ///
    /// `frag_len` is the length of *this* fragment's payload (must fit in 11 bits), `total_len`
    /// is the full ALPDU length (must fit in 12 bits), `frag_id` must be 0..=7.
    pub fn new(
        label_type: LabelType,
        ptype_suppressed: bool,
        frag_len: u16,
        frag_id: u8,
        total_len: u16,
        use_crc: bool,
    ) -> Result<Self, Error> {
        if frag_len > MAX_PPDU_LENGTH || total_len > MAX_TOTAL_ALPDU_LENGTH || frag_id > MAX_FRAG_ID
        {
            return Err(Error::InvalidLength);
        }
        let mut raw = 0b10u32 << 30;
        raw |= (label_type.to_raw() as u32) << 28;
        raw |= (ptype_suppressed as u32) << 27;
        raw |= (frag_len as u32) << 16;
        raw |= (frag_id as u32) << 13;
        raw |= (total_len as u32) << 1;
        raw |= use_crc as u32;
        Ok(Self(raw))
    }

    /// Label type recorded in this header.
    pub fn label_type(&self) -> LabelType {
        LabelType::from_raw((self.0 >> 28) & 0b11)
    }

    /// Whether the carried ALPDU has its protocol-type field suppressed.
    pub fn ptype_suppressed(&self) -> bool {
        (self.0 >> 27) & 1 != 0
    }

    /// Length of this fragment's payload.
    pub fn frag_len(&self) -> u16 {
        ((self.0 >> 16) & u32::from(MAX_PPDU_LENGTH)) as u16
    }

    /// Fragment-id (0..=7) this PPDU belongs to.
    pub fn frag_id(&self) -> u8 {
        ((self.0 >> 13) & 0b111) as u8
    }

    /// Total length of the ALPDU being fragmented.
    pub fn total_len(&self) -> u16 {
        ((self.0 >> 1) & u32::from(MAX_TOTAL_ALPDU_LENGTH)) as u16
    }

    /// Whether the ALPDU trailer is a 4-byte CRC (`true`) or a 1-byte sequence number (`false`).
    pub fn use_crc(&self) -> bool {
        self.0 & 1 != 0
    }
}

impl ToBytes for StartHeader {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u32_be(self.0)
    }
}

impl<'a> FromBytes<'a> for StartHeader {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let raw = bytes.read_u32_be()?;
        if raw >> 30 != 0b10 {
            return Err(Error::InvalidValue);
        }
        Ok(Self(raw))
    }
}

/// CONT (continuation) or END (last fragment) PPDU header.
///
/// ```text
///  0  1  2  3      6  7            15
///  +--+--+--+------+--+-------------+
///  |S=0|E |1 |FID(3)|  length (10)   |
///  +--+--+--+------+--+-------------+
/// ```
///
/// Bit 13 is a fixed `1` marker, not part of any field. Every other PPDU kind is distinguished
/// from padding by its own leading bits (COMP/START both set `S=1`); CONT/END set `S=0`, and with
/// `E=0` (CONT) and `frag_id=0` and a short enough length, every other bit in the first byte would
/// otherwise also be `0`, making a legitimate CONT header indistinguishable from the zero byte that
/// marks FPDU padding (see `Pdu::parse`). The marker bit costs one bit of the length field (11 to
/// 10) to stay byte-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContEndHeader(u16);

impl ContEndHeader {
    /// Creates a new CONT/END header. `end` selects END (`true`) or CONT (`false`).
    pub fn new(end: bool, frag_id: u8, length: u16) -> Result<Self, Error> {
        if length > MAX_CONT_END_LENGTH || frag_id > MAX_FRAG_ID {
            return Err(Error::InvalidLength);
        }
        let mut raw = (end as u16) << 14;
        raw |= 1 << 13;
        raw |= (frag_id as u16) << 10;
        raw |= length;
        Ok(Self(raw))
    }

    /// Whether this is the last fragment of the ALPDU (END, as opposed to CONT).
    pub fn is_end(&self) -> bool {
        (self.0 >> 14) & 1 != 0
    }

    /// Fragment-id (0..=7) this PPDU belongs to.
    pub fn frag_id(&self) -> u8 {
        ((self.0 >> 10) & 0b111) as u8
    }

    /// Length of this fragment's payload (includes the trailer for END PPDUs).
    pub fn length(&self) -> u16 {
        self.0 & MAX_CONT_END_LENGTH
    }
}

impl ToBytes for ContEndHeader {
    fn to_bytes(&self, writer: &mut ByteWriter<'_>) -> Result<(), Error> {
        writer.write_u16_be(self.0)
    }
}

impl<'a> FromBytes<'a> for ContEndHeader {
    fn from_bytes(bytes: &mut ByteReader<'a>) -> Result<Self, Error> {
        let raw = bytes.read_u16_be()?;
        if (raw >> 15) & 1 != 0 {
            return Err(Error::InvalidValue);
        }
        if (raw >> 13) & 1 == 0 {
            return Err(Error::InvalidValue);
        }
        Ok(Self(raw))
    }
}

/// A parsed PPDU: header plus the payload bytes it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pdu<'a> {
    /// Complete ALPDU in a single PPDU.
    Comp { header: CompHeader, payload: &'a [u8] },
    /// First fragment of a multi-fragment ALPDU.
    Start { header: StartHeader, payload: &'a [u8] },
    /// Middle fragment.
    Cont { header: ContEndHeader, payload: &'a [u8] },
    /// Last fragment (payload includes the trailer).
    End { header: ContEndHeader, payload: &'a [u8] },
}

impl<'a> Pdu<'a> {
    /// Parses one PPDU from the front of `reader`.
    ///
    /// Returns `Ok(None)` if `reader` is empty or positioned at a padding byte. FPDU padding
    /// starts with a zero byte in a PPDU-header position; every legal PPDU header is built so its
    /// first byte is never all-zero (COMP and START always set their leading `S` bit; CONT/END set
    /// a fixed marker bit alongside their `S=0`, see `ContEndHeader`), so a zero first byte is
    /// unambiguously padding.
    pub fn parse(reader: &mut ByteReader<'a>) -> Result<Option<Self>, Error> {
        if reader.is_empty() {
            return Ok(None);
        }
        let first_byte = reader.as_raw_bytes()[0];
        if first_byte == 0x00 {
            return Ok(None);
        }

        let start = first_byte & 0x80 != 0;
        let end = first_byte & 0x40 != 0;

        Ok(Some(match (start, end) {
            (true, true) => {
                let header = CompHeader::from_bytes(reader)?;
                let payload = reader.read_slice(usize::from(header.length()))?;
                Pdu::Comp { header, payload }
            }
            (true, false) => {
                let header = StartHeader::from_bytes(reader)?;
                let payload = reader.read_slice(usize::from(header.frag_len()))?;
                Pdu::Start { header, payload }
            }
            (false, false) => {
                let header = ContEndHeader::from_bytes(reader)?;
                let payload = reader.read_slice(usize::from(header.length()))?;
                Pdu::Cont { header, payload }
            }
            (false, true) => {
                let header = ContEndHeader::from_bytes(reader)?;
                let payload = reader.read_slice(usize::from(header.length()))?;
                Pdu::End { header, payload }
            }
        }))
    }

    /// Fragment-id this PPDU belongs to (`None` for COMP, which has no fragment-id of its own).
    pub fn frag_id(&self) -> Option<u8> {
        match self {
            Pdu::Comp { .. } => None,
            Pdu::Start { header, .. } => Some(header.frag_id()),
            Pdu::Cont { header, .. } | Pdu::End { header, .. } => Some(header.frag_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comp_header_roundtrip() {
        let header = CompHeader::new(LabelType::ImplicitProtocolType, true, 123).unwrap();
        assert_eq!(header.label_type(), LabelType::ImplicitProtocolType);
        assert!(header.ptype_suppressed());
        assert_eq!(header.length(), 123);

        let mut buf = [0u8; COMP_HEADER_LEN];
        header.to_bytes(&mut ByteWriter::new(&mut buf)).unwrap();
        assert_eq!(buf[0] >> 6, 0b11);

        let parsed = CompHeader::from_bytes(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn start_header_roundtrip() {
        let header = StartHeader::new(LabelType::Signal, false, 500, 5, 4000, true).unwrap();
        assert_eq!(header.label_type(), LabelType::Signal);
        assert!(!header.ptype_suppressed());
        assert_eq!(header.frag_len(), 500);
        assert_eq!(header.frag_id(), 5);
        assert_eq!(header.total_len(), 4000);
        assert!(header.use_crc());

        let mut buf = [0u8; START_HEADER_LEN];
        header.to_bytes(&mut ByteWriter::new(&mut buf)).unwrap();
        let parsed = StartHeader::from_bytes(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn cont_end_header_roundtrip() {
        let end = ContEndHeader::new(true, 3, 42).unwrap();
        assert!(end.is_end());
        assert_eq!(end.frag_id(), 3);
        assert_eq!(end.length(), 42);

        let cont = ContEndHeader::new(false, 3, 42).unwrap();
        assert!(!cont.is_end());

        let mut buf = [0u8; CONT_END_HEADER_LEN];
        cont.to_bytes(&mut ByteWriter::new(&mut buf)).unwrap();
        let parsed = ContEndHeader::from_bytes(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(parsed, cont);
    }

    #[test]
    fn rejects_fields_out_of_range() {
        assert_eq!(
            CompHeader::new(LabelType::ImplicitProtocolType, false, 0x800),
            Err(Error::InvalidLength)
        );
        assert_eq!(
            ContEndHeader::new(false, 8, 0),
            Err(Error::InvalidLength)
        );
        assert_eq!(
            ContEndHeader::new(false, 0, MAX_CONT_END_LENGTH + 1),
            Err(Error::InvalidLength)
        );
    }

    #[test]
    fn cont_header_first_byte_is_never_zero() {
        // frag_id=0 and a length under 256 would leave every bit outside the marker at zero; the
        // marker bit must still make the first byte non-zero so it isn't mistaken for padding.
        for length in [0u16, 1, 255] {
            let header = ContEndHeader::new(false, 0, length).unwrap();
            let mut buf = [0u8; CONT_END_HEADER_LEN];
            header.to_bytes(&mut ByteWriter::new(&mut buf)).unwrap();
            assert_ne!(buf[0], 0x00, "length={}", length);
        }

        // A full PPDU (header + payload) for this exact shape parses as Cont, not padding.
        let header = ContEndHeader::new(false, 0, 3).unwrap();
        let mut pdu_buf = [0u8; CONT_END_HEADER_LEN + 3];
        {
            let mut writer = ByteWriter::new(&mut pdu_buf);
            header.to_bytes(&mut writer).unwrap();
            writer.write_slice(&[0, 0, 0]).unwrap();
        }
        let mut reader = ByteReader::new(&pdu_buf);
        match Pdu::parse(&mut reader).unwrap().unwrap() {
            Pdu::Cont { header, .. } => assert_eq!(header.frag_id(), 0),
            other => panic!("expected Cont, got {:?}", other),
        }
    }

    #[test]
    fn frag_id_rejects_out_of_range() {
        assert_eq!(FragId::new(7).map(FragId::get), Some(7));
        assert_eq!(FragId::new(8), None);
    }

    #[test]
    fn parse_detects_padding() {
        let buf = [0u8; 4];
        let mut reader = ByteReader::new(&buf);
        assert_eq!(Pdu::parse(&mut reader).unwrap(), None);
    }

    #[test]
    fn parse_dispatches_on_flag_bits() {
        let header = CompHeader::new(LabelType::ImplicitProtocolType, false, 3).unwrap();
        let mut buf = [0u8; COMP_HEADER_LEN + 3];
        {
            let mut writer = ByteWriter::new(&mut buf);
            header.to_bytes(&mut writer).unwrap();
            writer.write_slice(&[1, 2, 3]).unwrap();
        }
        let mut reader = ByteReader::new(&buf);
        match Pdu::parse(&mut reader).unwrap().unwrap() {
            Pdu::Comp { payload, .. } => assert_eq!(payload, &[1, 2, 3]),
            other => panic!("expected Comp, got {:?}", other),
        }
        assert!(reader.is_empty());
    }
}
