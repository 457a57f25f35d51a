//! An implementation of the Return Link Encapsulation (RLE) protocol.
//!
//! RLE sits between a satellite-link MAC and the network layer: it encapsulates variable-length
//! SDUs (Ethernet frames, IP packets, ...) into ALPDUs, fragments ALPDUs too large to fit a single
//! burst into a chain of PPDUs, and packs PPDUs from up to eight concurrent fragment-id contexts
//! into fixed-size FPDUs.
//!
//! # Using the stack
//!
//! This crate is runtime and hardware-agnostic. It does not talk to a satellite modem directly;
//! instead, a [`Transmitter`] turns submitted SDUs into FPDU byte buffers and a [`Receiver`] turns
//! FPDU byte buffers back into SDUs. Moving those buffers on and off the physical link is the
//! host's job.
//!
//! [`Transmitter`]: transmitter::Transmitter
//! [`Receiver`]: receiver::Receiver

#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[macro_use]
mod utils;
#[macro_use]
mod log;

pub mod alpdu;
pub mod bytes;
pub mod config;
mod crc;
mod error;
pub mod fpdu;
pub mod fragmentation;
pub mod ppdu;
pub mod ptype;
pub mod reassembly;
pub mod receiver;
pub mod stats;
pub mod transmitter;

pub use self::error::{ConfigError, Error, HeaderSizeError, RxError, TxError};

/// Number of independent fragmentation/reassembly contexts ("fragment-ids") a link provides, per
/// the protocol's 3-bit fragment-id field.
pub const NUM_FRAGMENT_IDS: usize = 8;
