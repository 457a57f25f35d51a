//! FPDU packing and unpacking: concatenating PPDUs into a fixed-size frame and scanning one back
//! into a stream of PPDU byte slices.

use crate::bytes::ByteReader;
use crate::error::Error;
use crate::ppdu::Pdu;

/// Result of [`pack_fpdu`]: how much of the FPDU carries real data versus padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackReport {
    /// Bytes occupied by the payload label (if any) and PPDUs.
    pub bytes_written: usize,
    /// Zero-padding bytes appended after the last PPDU to fill the fixed FPDU size.
    pub padding_bytes: usize,
}

/// Writes `label` at the start of `fpdu`, returning the offset PPDU packing should continue from.
///
/// The payload-label field's contents are link-configuration-specific and opaque to this crate;
/// callers pass whatever bytes their configuration's `implicit_payload_label_size` calls for (an
/// empty slice if the size is 0).
pub fn write_payload_label(fpdu: &mut [u8], label: &[u8]) -> Result<usize, Error> {
    if fpdu.len() < label.len() {
        return Err(Error::Eof);
    }
    fpdu[..label.len()].copy_from_slice(label);
    Ok(label.len())
}

/// Zero-fills `fpdu[written..]`, completing a packed FPDU. Returns the number of padding bytes.
///
/// Padding is detected at the receiver by a zero byte in a PPDU-header position (see
/// [`unpack_fpdu`]); nothing in the *sender's* packing needs that distinction; it always zeros the
/// remainder.
pub fn pad_fpdu(fpdu: &mut [u8], written: usize) -> usize {
    for byte in &mut fpdu[written..] {
        *byte = 0;
    }
    fpdu.len() - written
}

/// A lazy iterator over the PPDUs in an FPDU, skipping the payload-label prefix and stopping at
/// the first padding byte (or FPDU end).
///
/// Each yielded slice is validated only for header consistency (the length field fits in the
/// remaining buffer); trailer/reassembly-level validation happens in [`crate::reassembly`].
pub struct UnpackIter<'a> {
    reader: ByteReader<'a>,
    done: bool,
}

/// Begins unpacking `fpdu`, skipping `label_len` bytes of payload-label prefix.
pub fn unpack_fpdu(fpdu: &[u8], label_len: usize) -> Result<UnpackIter<'_>, Error> {
    if fpdu.len() < label_len {
        return Err(Error::Eof);
    }
    Ok(UnpackIter {
        reader: ByteReader::new(&fpdu[label_len..]),
        done: false,
    })
}

impl<'a> Iterator for UnpackIter<'a> {
    type Item = Result<Pdu<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match Pdu::parse(&mut self.reader) {
            Ok(Some(pdu)) => Some(Ok(pdu)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::{ByteWriter, ToBytes};
    use crate::ppdu::{CompHeader, LabelType};

    #[test]
    fn pack_then_unpack_roundtrips_single_ppdu() {
        let header = CompHeader::new(LabelType::ImplicitProtocolType, false, 3).unwrap();
        let mut fpdu = [0u8; 16];
        let mut written = write_payload_label(&mut fpdu, &[]).unwrap();
        {
            let mut writer = ByteWriter::new(&mut fpdu[written..]);
            header.to_bytes(&mut writer).unwrap();
            writer.write_slice(&[1, 2, 3]).unwrap();
        }
        written += 2 + 3;
        let padding = pad_fpdu(&mut fpdu, written);
        assert_eq!(padding, 16 - written);

        let mut iter = unpack_fpdu(&fpdu, 0).unwrap();
        let pdu = iter.next().unwrap().unwrap();
        match pdu {
            Pdu::Comp { payload, .. } => assert_eq!(payload, &[1, 2, 3]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(iter.next().is_none());
    }

    #[test]
    fn unpack_skips_payload_label() {
        let header = CompHeader::new(LabelType::ImplicitProtocolType, false, 1).unwrap();
        let mut fpdu = [0u8; 8];
        let label = [0xAB, 0xCD];
        let mut written = write_payload_label(&mut fpdu, &label).unwrap();
        {
            let mut writer = ByteWriter::new(&mut fpdu[written..]);
            header.to_bytes(&mut writer).unwrap();
            writer.write_slice(&[0x42]).unwrap();
        }
        written += 2 + 1;
        pad_fpdu(&mut fpdu, written);

        let mut iter = unpack_fpdu(&fpdu, 2).unwrap();
        match iter.next().unwrap().unwrap() {
            Pdu::Comp { payload, .. } => assert_eq!(payload, &[0x42]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unpack_empty_fpdu_yields_nothing() {
        let fpdu = [0u8; 16];
        let mut iter = unpack_fpdu(&fpdu, 0).unwrap();
        assert!(iter.next().is_none());
    }
}
