//! Link configuration, shared by a transmitter and receiver pair.

use crate::error::{ConfigError, HeaderSizeError};
use crate::ptype::CompressedPtype;

/// Largest value a label-size field (`implicit_ppdu_label_size`,
/// `implicit_payload_label_size`, `type_0_alpdu_label_size`) may hold.
pub const MAX_LABEL_SIZE: u8 = 15;

/// Fixed header overhead, in bytes, of a Logon FPDU (independent of configuration).
pub const LOGON_FPDU_HEADER_SIZE: u8 = 6;
/// Fixed header overhead, in bytes, of a Control FPDU.
pub const CONTROL_FPDU_HEADER_SIZE: u8 = 3;
/// Fixed header overhead, in bytes, of a Traffic-Control FPDU.
pub const TRAFFIC_CONTROL_FPDU_HEADER_SIZE: u8 = 5;

/// Which kind of FPDU a header-size query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpduType {
    /// Carries logon signalling; fixed 6-byte overhead.
    Logon,
    /// Carries link-control signalling; fixed 3-byte overhead.
    Control,
    /// Carries traffic-control signalling; fixed 5-byte overhead.
    TrafficControl,
    /// Carries user traffic PPDUs; overhead depends on each SDU's runtime protocol type and is
    /// not deterministic from configuration alone.
    Traffic,
}

/// Shared transmitter/receiver configuration for one RLE link.
///
/// Every field is public so related crates can assemble one from whatever configuration source
/// they already have (a parsed logon message, a static table, ...), but [`Config::new`] is the
/// intended constructor: it runs the validation in [`Config::validate`] up front. Code that
/// receives a `Config` from outside (rather than constructing it via `new`) should not assume it
/// is valid — `Transmitter::new`/`Receiver::new` call `validate` themselves for this reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Omit the ALPDU protocol-type field entirely when the SDU's protocol type is suppressible
    /// under `implicit_protocol_type`.
    pub allow_ptype_omission: bool,
    /// Emit a compressed (1- or 3-byte) protocol-type field instead of the 2-byte uncompressed
    /// form when the type is not omitted.
    pub use_compressed_ptype: bool,
    /// Use a 4-byte CRC-32 ALPDU trailer for multi-fragment ALPDUs.
    pub allow_alpdu_crc: bool,
    /// Use a 1-byte sequence-number ALPDU trailer for multi-fragment ALPDUs.
    pub allow_alpdu_sequence_number: bool,
    /// Reserved; must be `false`.
    pub use_explicit_payload_header_map: bool,
    /// Compressed protocol-type code used as the implicit default for `allow_ptype_omission`.
    pub implicit_protocol_type: CompressedPtype,
    /// Size, in bytes (0..=15), of the PPDU label field.
    pub implicit_ppdu_label_size: u8,
    /// Size, in bytes (0..=15), of the payload label field.
    pub implicit_payload_label_size: u8,
    /// Size, in bytes (0..=15), of the type-0 ALPDU label field.
    pub type_0_alpdu_label_size: u8,
    /// Cap on the number of fragments a single ALPDU may be split into (the `RLE_MAX_SEQ_NO`
    /// analogue). Defaults to `u32::MAX` when constructed with [`Config::new`] if not otherwise
    /// specified by the caller building the struct directly.
    pub max_fragment_count: u32,
}

impl Config {
    /// Validates and constructs a `Config`.
    ///
    /// Rejects label sizes over 15, an `implicit_protocol_type` that isn't one of the table's
    /// defined codes, a reserved `use_explicit_payload_header_map`, and configurations that allow
    /// neither CRC nor sequence-number trailers.
    pub fn new(
        allow_ptype_omission: bool,
        use_compressed_ptype: bool,
        allow_alpdu_crc: bool,
        allow_alpdu_sequence_number: bool,
        use_explicit_payload_header_map: bool,
        implicit_protocol_type: CompressedPtype,
        implicit_ppdu_label_size: u8,
        implicit_payload_label_size: u8,
        type_0_alpdu_label_size: u8,
        max_fragment_count: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            allow_ptype_omission,
            use_compressed_ptype,
            allow_alpdu_crc,
            allow_alpdu_sequence_number,
            use_explicit_payload_header_map,
            implicit_protocol_type,
            implicit_ppdu_label_size,
            implicit_payload_label_size,
            type_0_alpdu_label_size,
            max_fragment_count,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks the invariants enforced by [`Config::new`].
    ///
    /// A `Config`'s fields are all public, so nothing stops a caller from hand-assembling an
    /// invalid one with a struct literal; [`Transmitter::new`](crate::transmitter::Transmitter::new)
    /// and [`Receiver::new`](crate::receiver::Receiver::new) call this themselves rather than
    /// trusting that every `Config` reaching them came from `Config::new`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.implicit_ppdu_label_size > MAX_LABEL_SIZE
            || self.implicit_payload_label_size > MAX_LABEL_SIZE
            || self.type_0_alpdu_label_size > MAX_LABEL_SIZE
        {
            return Err(ConfigError::LabelSizeTooLarge);
        }

        if self.use_explicit_payload_header_map {
            return Err(ConfigError::ExplicitPayloadHeaderMapUnsupported);
        }

        if !self.implicit_protocol_type.is_defined() {
            return Err(ConfigError::InvalidImplicitProtocolType);
        }

        if !self.allow_alpdu_crc && !self.allow_alpdu_sequence_number {
            return Err(ConfigError::NoTrailerModeSelected);
        }

        Ok(())
    }
}

/// Returns the fixed per-FPDU header overhead for `fpdu_type` under `config`.
///
/// Logon, Control and Traffic-Control overheads are fixed regardless of configuration. Traffic
/// FPDU overhead depends on each SDU's runtime protocol type (whether its ALPDU header ends up
/// being 0, 1, 2 or 3 bytes) and can't be answered here; callers must derive it per-SDU instead.
pub fn get_header_size(config: &Config, fpdu_type: FpduType) -> Result<u8, HeaderSizeError> {
    if !config.implicit_protocol_type.is_defined() {
        return Err(HeaderSizeError::InvalidConfig);
    }

    match fpdu_type {
        FpduType::Logon => Ok(LOGON_FPDU_HEADER_SIZE),
        FpduType::Control => Ok(CONTROL_FPDU_HEADER_SIZE),
        FpduType::TrafficControl => Ok(TRAFFIC_CONTROL_FPDU_HEADER_SIZE),
        FpduType::Traffic => Err(HeaderSizeError::NonDeterministic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::new(
            false,
            false,
            true,
            false,
            false,
            CompressedPtype::Ipv4,
            0,
            0,
            0,
            u32::MAX,
        )
        .unwrap()
    }

    #[test]
    fn rejects_oversized_label() {
        assert_eq!(
            Config::new(
                false,
                false,
                true,
                false,
                false,
                CompressedPtype::Ipv4,
                16,
                0,
                0,
                u32::MAX,
            ),
            Err(ConfigError::LabelSizeTooLarge)
        );
    }

    #[test]
    fn rejects_invalid_implicit_protocol_type() {
        assert_eq!(
            Config::new(
                true,
                false,
                true,
                false,
                false,
                CompressedPtype::from(0x31),
                0,
                0,
                0,
                u32::MAX,
            ),
            Err(ConfigError::InvalidImplicitProtocolType)
        );
    }

    #[test]
    fn rejects_no_trailer_mode() {
        assert_eq!(
            Config::new(
                false,
                false,
                false,
                false,
                false,
                CompressedPtype::Ipv4,
                0,
                0,
                0,
                u32::MAX,
            ),
            Err(ConfigError::NoTrailerModeSelected)
        );
    }

    #[test]
    fn rejects_reserved_explicit_payload_header_map() {
        assert_eq!(
            Config::new(
                false,
                false,
                true,
                false,
                true,
                CompressedPtype::Ipv4,
                0,
                0,
                0,
                u32::MAX,
            ),
            Err(ConfigError::ExplicitPayloadHeaderMapUnsupported)
        );
    }

    #[test]
    fn header_size_fixed_overheads() {
        let config = valid_config();
        assert_eq!(get_header_size(&config, FpduType::Logon), Ok(6));
        assert_eq!(get_header_size(&config, FpduType::Control), Ok(3));
        assert_eq!(get_header_size(&config, FpduType::TrafficControl), Ok(5));
        assert_eq!(
            get_header_size(&config, FpduType::Traffic),
            Err(HeaderSizeError::NonDeterministic)
        );
    }
}
