//! The protocol-type table: mapping between 16-bit uncompressed EtherType values and the 8-bit
//! RLE compressed codes, and the rules for when a protocol type can be omitted entirely.

use core::fmt;

/// An uncompressed, 16-bit protocol type (an EtherType value, in the sense used by Ethernet,
/// VLAN and ARP).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolType(u16);

impl ProtocolType {
    /// RLE Level-2 Signalling.
    pub const L2S: Self = Self(0x0082);
    /// IEEE 802.1Q VLAN tag.
    pub const VLAN: Self = Self(0x8100);
    /// IEEE 802.1ad Q-in-Q (provider bridging).
    pub const QINQ: Self = Self(0x88a8);
    /// Legacy (pre-standard) Q-in-Q.
    pub const LEGACY_QINQ: Self = Self(0x9100);
    /// IPv4.
    pub const IPV4: Self = Self(0x0800);
    /// IPv6.
    pub const IPV6: Self = Self(0x86dd);
    /// ARP.
    pub const ARP: Self = Self(0x0806);

    /// Creates a `ProtocolType` from its raw 16-bit EtherType value.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw 16-bit EtherType value.
    pub const fn as_raw(&self) -> u16 {
        self.0
    }
}

impl fmt::Debug for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

enum_with_unknown! {
    /// An 8-bit compressed protocol-type code, standing in for a 16-bit [`ProtocolType`].
    ///
    /// Codes not defined by the suppressibility/compression table (including `0x31`, which is
    /// explicitly reserved as invalid) decode to [`CompressedPtype::Unknown`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum CompressedPtype(u8) {
        /// IPv4 (`0x0800`).
        Ipv4 = 0x0d,
        /// ARP (`0x0806`).
        Arp = 0x0e,
        /// VLAN (`0x8100`) with its protocol-type field omitted; see the VLAN reconstruction rule
        /// in [`crate::reassembly`].
        VlanNoPtype = 0x0f,
        /// IPv6 (`0x86dd`).
        Ipv6 = 0x11,
        /// IEEE 802.1ad Q-in-Q (`0x88a8`).
        QinQ = 0x19,
        /// Legacy Q-in-Q (`0x9100`).
        LegacyQinQ = 0x1a,
        /// "IPv4 or IPv6, decide from the first nibble of the payload."
        Ip = 0x30,
    }
}

impl CompressedPtype {
    /// Whether this code is one of the table's defined values (as opposed to [`Unknown`], which
    /// includes the explicitly-reserved `0x31`).
    ///
    /// [`Unknown`]: #variant.Unknown
    pub fn is_defined(&self) -> bool {
        !matches!(self, CompressedPtype::Unknown(_))
    }
}

/// Returns whether `ptype` may be omitted entirely from the ALPDU header, given that
/// `implicit_protocol_type` is the configuration's implicit default.
///
/// This implements the suppressibility table of §4.1. The VLAN (`0x8100`) vs. implicit code
/// `0x30` ("IP") combination is underspecified by the source protocol; this implementation treats
/// it as *not* suppressible, the safe reading recorded in DESIGN.md.
pub fn is_suppressible(ptype: ProtocolType, implicit: CompressedPtype) -> bool {
    match ptype {
        ProtocolType::L2S => true,
        ProtocolType::VLAN => implicit == CompressedPtype::VlanNoPtype,
        ProtocolType::QINQ => implicit == CompressedPtype::QinQ,
        ProtocolType::LEGACY_QINQ => implicit == CompressedPtype::LegacyQinQ,
        ProtocolType::IPV4 => implicit == CompressedPtype::Ipv4 || implicit == CompressedPtype::Ip,
        ProtocolType::IPV6 => implicit == CompressedPtype::Ipv6 || implicit == CompressedPtype::Ip,
        ProtocolType::ARP => implicit == CompressedPtype::Arp,
        _ => false,
    }
}

/// Returns the compressed code standing in for `ptype`, or `None` if `ptype` has no entry in the
/// compression table (the caller must then fall back to the 0xff-prefixed uncompressed encoding).
pub fn compressed_code(ptype: ProtocolType) -> Option<CompressedPtype> {
    match ptype {
        ProtocolType::IPV4 => Some(CompressedPtype::Ipv4),
        ProtocolType::IPV6 => Some(CompressedPtype::Ipv6),
        ProtocolType::ARP => Some(CompressedPtype::Arp),
        ProtocolType::VLAN => Some(CompressedPtype::VlanNoPtype),
        ProtocolType::QINQ => Some(CompressedPtype::QinQ),
        ProtocolType::LEGACY_QINQ => Some(CompressedPtype::LegacyQinQ),
        _ => None,
    }
}

/// Reconstructs a [`ProtocolType`] from a compressed code and (for the `Ip` code) the first
/// nibble of the SDU payload, which distinguishes IPv4 from IPv6.
///
/// [`CompressedPtype::VlanNoPtype`] resolves to plain [`ProtocolType::VLAN`] here: this function
/// covers the ordinary explicit-compression case, where the SDU bytes are untouched. The
/// suppressed case, where the VLAN protocol-type field was additionally stripped from the SDU
/// itself, is a distinct special case handled in `crate::reassembly` and must be checked by the
/// caller *before* reaching for this function.
///
/// Returns `None` if the code cannot be resolved to a concrete protocol type on its own — this is
/// the case for [`CompressedPtype::Unknown`], and for `Ip` with an unrecognised version nibble.
pub fn decompress(code: CompressedPtype, ip_version_nibble: Option<u8>) -> Option<ProtocolType> {
    match code {
        CompressedPtype::Ipv4 => Some(ProtocolType::IPV4),
        CompressedPtype::Ipv6 => Some(ProtocolType::IPV6),
        CompressedPtype::Arp => Some(ProtocolType::ARP),
        CompressedPtype::VlanNoPtype => Some(ProtocolType::VLAN),
        CompressedPtype::QinQ => Some(ProtocolType::QINQ),
        CompressedPtype::LegacyQinQ => Some(ProtocolType::LEGACY_QINQ),
        CompressedPtype::Ip => match ip_version_nibble {
            Some(4) => Some(ProtocolType::IPV4),
            Some(6) => Some(ProtocolType::IPV6),
            _ => None,
        },
        CompressedPtype::Unknown(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_suppressible_under_ipv4_or_ip() {
        assert!(is_suppressible(ProtocolType::IPV4, CompressedPtype::Ipv4));
        assert!(is_suppressible(ProtocolType::IPV4, CompressedPtype::Ip));
        assert!(!is_suppressible(ProtocolType::IPV4, CompressedPtype::Ipv6));
    }

    #[test]
    fn l2s_always_suppressible() {
        assert!(is_suppressible(ProtocolType::L2S, CompressedPtype::Ip));
        assert!(is_suppressible(ProtocolType::L2S, CompressedPtype::Arp));
    }

    #[test]
    fn vlan_not_suppressible_under_generic_ip_code() {
        // Open question, resolved conservatively: VLAN under implicit code 0x30 is not
        // suppressible.
        assert!(!is_suppressible(ProtocolType::VLAN, CompressedPtype::Ip));
        assert!(is_suppressible(
            ProtocolType::VLAN,
            CompressedPtype::VlanNoPtype
        ));
    }

    #[test]
    fn unknown_code_is_not_defined() {
        assert!(!CompressedPtype::from(0x31).is_defined());
        assert!(!CompressedPtype::from(0x99).is_defined());
        assert!(CompressedPtype::from(0x0d).is_defined());
    }

    #[test]
    fn compress_then_decompress_roundtrips() {
        for ptype in [
            ProtocolType::IPV4,
            ProtocolType::IPV6,
            ProtocolType::ARP,
            ProtocolType::QINQ,
            ProtocolType::LEGACY_QINQ,
        ] {
            let code = compressed_code(ptype).unwrap();
            assert_eq!(decompress(code, None), Some(ptype));
        }
    }

    #[test]
    fn generic_ip_code_decompresses_via_nibble() {
        assert_eq!(decompress(CompressedPtype::Ip, Some(4)), Some(ProtocolType::IPV4));
        assert_eq!(decompress(CompressedPtype::Ip, Some(6)), Some(ProtocolType::IPV6));
        assert_eq!(decompress(CompressedPtype::Ip, Some(5)), None);
    }
}
