use core::fmt;

/// Low-level errors from the byte codec layer (`bytes`, `ppdu`, `alpdu`).
///
/// Higher-level operations (`Transmitter::encapsulate`, `Receiver::decapsulate`, ...) wrap this in
/// their own richer error types (`TxError`, `RxError`, ...) rather than exposing it directly.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// Packet specified an invalid length value or was too short.
    ///
    /// This indicates a protocol violation, so the offending PDU should be dropped.
    InvalidLength,

    /// Invalid value supplied for field.
    InvalidValue,

    /// Unexpectedly reached EOF while reading or writing data.
    ///
    /// This is returned when the application tries to fit too much data into a
    /// PDU or other fixed-size buffer, and also when reaching EOF prematurely
    /// while reading data from a buffer.
    Eof,

    /// Parsing didn't consume the entire buffer.
    IncompleteParse,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::InvalidLength => "invalid length value specified",
            Error::InvalidValue => "invalid value for field",
            Error::Eof => "end of buffer",
            Error::IncompleteParse => "excess data in buffer",
        })
    }
}

/// Errors returned by [`crate::config::Config::new`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum ConfigError {
    /// One of the label-size fields exceeds the 4-bit (0..=15) range.
    LabelSizeTooLarge,
    /// `implicit_protocol_type` is not one of the table's defined codes (this also rejects the
    /// explicitly-reserved `0x31`).
    InvalidImplicitProtocolType,
    /// Neither `allow_alpdu_crc` nor `allow_alpdu_sequence_number` is set; at least one trailer
    /// mode must be available.
    NoTrailerModeSelected,
    /// `use_explicit_payload_header_map` was set; this field is reserved and must be `false`.
    ExplicitPayloadHeaderMapUnsupported,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigError::LabelSizeTooLarge => "label size field exceeds 15",
            ConfigError::InvalidImplicitProtocolType => {
                "implicit_protocol_type is not a defined compressed code"
            }
            ConfigError::NoTrailerModeSelected => {
                "at least one of allow_alpdu_crc or allow_alpdu_sequence_number must be set"
            }
            ConfigError::ExplicitPayloadHeaderMapUnsupported => {
                "use_explicit_payload_header_map is reserved and must be false"
            }
        })
    }
}

/// Errors returned by transmitter operations (`Transmitter::encapsulate`, `emit_ppdu`,
/// `pack_fpdu`).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum TxError {
    /// The SDU's payload exceeds the maximum of 4088 bytes.
    SduTooBig,
    /// The requested fragment-id's context is already holding an unfinished ALPDU.
    ContextBusy,
    /// No ALPDU is pending in the requested context (nothing to emit).
    ContextIdle,
    /// The burst size is too small to carry even a minimal fragment.
    BurstTooSmall,
    /// Emitting another fragment would exceed the configured `max_fragment_count`.
    TooManyFragments,
    /// A low-level codec error occurred while writing the PDU.
    Codec(Error),
}

impl From<Error> for TxError {
    fn from(e: Error) -> Self {
        TxError::Codec(e)
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::SduTooBig => f.write_str("SDU exceeds the maximum of 4088 bytes"),
            TxError::ContextBusy => f.write_str("fragment-id context is already in use"),
            TxError::ContextIdle => f.write_str("no ALPDU pending in this context"),
            TxError::BurstTooSmall => f.write_str("burst size too small to carry a fragment"),
            TxError::TooManyFragments => {
                f.write_str("emission would exceed the configured fragment count")
            }
            TxError::Codec(e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Errors returned by receiver operations (`Receiver::decapsulate`, reassembly).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum RxError {
    /// A CONT or END PPDU arrived for a fragment-id with no context in progress.
    InvalidTransition,
    /// A START PPDU arrived for a fragment-id that already has a context in progress; the old
    /// context is dropped and counted as lost.
    ContextNotFree,
    /// A CONT/END PPDU would push `bytes_received` past the declared total length.
    TotalLengthExceeded,
    /// The END PPDU arrived before `bytes_received` reached the declared total length.
    TotalLengthNotReached,
    /// The trailer (sequence number or CRC) failed validation.
    TrailerMismatch,
    /// The VLAN protocol-type reconstruction special case found a malformed frame.
    MalformedVlanReconstruction,
    /// `implicit_protocol_type` is the generic `Ip` code and the SDU payload's leading nibble is
    /// neither 4 nor 6, so the protocol type cannot be resolved.
    AmbiguousImplicitProtocolType,
    /// A low-level codec error occurred while parsing the PDU.
    Codec(Error),
}

impl From<Error> for RxError {
    fn from(e: Error) -> Self {
        RxError::Codec(e)
    }
}

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RxError::InvalidTransition => f.write_str("CONT/END PPDU with no context in progress"),
            RxError::ContextNotFree => f.write_str("START PPDU for a context already in progress"),
            RxError::TotalLengthExceeded => {
                f.write_str("fragment would exceed the declared total length")
            }
            RxError::TotalLengthNotReached => {
                f.write_str("END PPDU arrived before the declared total length was reached")
            }
            RxError::TrailerMismatch => f.write_str("ALPDU trailer validation failed"),
            RxError::MalformedVlanReconstruction => {
                f.write_str("malformed frame during VLAN protocol-type reconstruction")
            }
            RxError::AmbiguousImplicitProtocolType => {
                f.write_str("implicit protocol type 0x30 could not be resolved from payload")
            }
            RxError::Codec(e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Errors returned by [`crate::config::get_header_size`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum HeaderSizeError {
    /// The Traffic FPDU's header size depends on the runtime protocol type of each SDU and cannot
    /// be answered from the configuration alone.
    NonDeterministic,
    /// The configuration itself is invalid.
    InvalidConfig,
}

impl fmt::Display for HeaderSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderSizeError::NonDeterministic => {
                "Traffic FPDU header size is not deterministic from configuration alone"
            }
            HeaderSizeError::InvalidConfig => "configuration is invalid",
        })
    }
}

#[cfg(feature = "std")]
mod std_impl {
    use super::*;
    use std::error::Error as StdError;

    impl StdError for Error {}
    impl StdError for ConfigError {}
    impl StdError for TxError {}
    impl StdError for RxError {}
    impl StdError for HeaderSizeError {}
}
