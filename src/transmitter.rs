//! The transmitter façade: eight fragment-id contexts, the shared free-context bitmap, and
//! aggregate/per-context statistics.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::alpdu::{encapsulate as encapsulate_alpdu, FragBuffer, Sdu};
use crate::config::Config;
use crate::error::{ConfigError, TxError};
use crate::fpdu::{pad_fpdu, PackReport};
use crate::fragmentation::{emit_ppdu, SeqNum3};
use crate::ppdu::FragId;
use crate::stats::Counters;
use crate::NUM_FRAGMENT_IDS;

struct TxContext {
    buf: FragBuffer,
    seq_nb: SeqNum3,
    frag_count: u32,
    counters: Counters,
}

impl TxContext {
    const fn new() -> Self {
        Self {
            buf: FragBuffer::new(),
            seq_nb: SeqNum3::new(0),
            frag_count: 0,
            counters: Counters::new(),
        }
    }
}

/// The RLE transmitter: owns eight fragment-id contexts and turns submitted SDUs into FPDUs.
///
/// Per §5, the only state shared across callers is the free-context bitmap (modeled here as an
/// [`AtomicU8`], see the design note in DESIGN.md); a given fragment-id must not be driven
/// concurrently by more than one caller once it has been taken.
pub struct Transmitter {
    contexts: [TxContext; NUM_FRAGMENT_IDS],
    free_mask: AtomicU8,
    config: Config,
    counters: Counters,
}

const ALL_FREE: u8 = 0xff;

impl Transmitter {
    /// Creates a transmitter for `config`, validating it first.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            contexts: [
                TxContext::new(),
                TxContext::new(),
                TxContext::new(),
                TxContext::new(),
                TxContext::new(),
                TxContext::new(),
                TxContext::new(),
                TxContext::new(),
            ],
            free_mask: AtomicU8::new(ALL_FREE),
            config,
            counters: Counters::new(),
        })
    }

    /// Returns the configuration this transmitter was constructed with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Aggregate counters across all fragment-ids.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Counters for a single fragment-id.
    pub fn context_counters(&self, frag_id: FragId) -> &Counters {
        &self.contexts[usize::from(frag_id.get())].counters
    }

    /// Whether fragment-id `frag_id` currently holds an unfinished ALPDU.
    pub fn is_busy(&self, frag_id: FragId) -> bool {
        self.free_mask.load(Ordering::Acquire) & (1 << frag_id.get()) == 0
    }

    fn try_take(&self, frag_id: FragId) -> bool {
        let bit = 1u8 << frag_id.get();
        self.free_mask
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |mask| {
                if mask & bit != 0 {
                    Some(mask & !bit)
                } else {
                    None
                }
            })
            .is_ok()
    }

    fn release(&self, frag_id: FragId) {
        self.free_mask.fetch_or(1 << frag_id.get(), Ordering::AcqRel);
    }

    /// Encapsulates `sdu` into the fragment-id `frag_id` context, building its ALPDU in place.
    ///
    /// Fails with [`TxError::ContextBusy`] if that fragment-id is already holding an unfinished
    /// ALPDU, or [`TxError::SduTooBig`] if `sdu`'s payload exceeds [`crate::alpdu::MAX_SDU_LEN`].
    /// On either failure, no state changes: the fragment-id is released again if it had been
    /// taken.
    pub fn encapsulate(&mut self, sdu: Sdu<'_>, frag_id: FragId) -> Result<(), TxError> {
        if !self.try_take(frag_id) {
            return Err(TxError::ContextBusy);
        }

        let idx = usize::from(frag_id.get());
        let ctx = &mut self.contexts[idx];
        match encapsulate_alpdu(&mut ctx.buf, sdu, &self.config, &mut ctx.seq_nb) {
            Ok(()) => {
                ctx.frag_count = 0;
                let len = sdu.payload.len() as u64;
                ctx.counters.packets_in += 1;
                ctx.counters.bytes_in += len;
                self.counters.packets_in += 1;
                self.counters.bytes_in += len;
                trace!("encapsulated {} bytes on fragment-id {}", len, frag_id.get());
                Ok(())
            }
            Err(e) => {
                self.release(frag_id);
                Err(e)
            }
        }
    }

    /// Fills `fpdu` with PPDUs drawn from every busy fragment-id, round-robin, padding the
    /// remainder with zero bytes.
    ///
    /// Fragment-ids whose current burst allocation is too small to carry another fragment are
    /// skipped for this call (not an error: they simply contribute nothing to this FPDU and try
    /// again on the next one). A fragment-id that finishes its ALPDU (COMP or END) is released.
    /// Any other per-ALPDU error drops that ALPDU, releases its fragment-id and is counted, but
    /// does not abort packing the rest of the FPDU.
    pub fn pack_fpdu(&mut self, fpdu: &mut [u8]) -> Result<PackReport, TxError> {
        let label_len = usize::from(self.config.implicit_payload_label_size);
        if fpdu.len() < label_len {
            return Err(TxError::BurstTooSmall);
        }
        for byte in &mut fpdu[..label_len] {
            *byte = 0;
        }
        let mut offset = label_len;

        loop {
            let mut progressed = false;
            for raw in 0..NUM_FRAGMENT_IDS as u8 {
                // `raw` always stays below `NUM_FRAGMENT_IDS`, which is also `MAX_FRAG_ID + 1`.
                let frag_id = FragId::new(raw).unwrap();
                let ctx = &mut self.contexts[usize::from(raw)];
                if !ctx.buf.is_initialised() {
                    continue;
                }

                let space = fpdu.len() - offset;
                match emit_ppdu(
                    &mut ctx.buf,
                    raw,
                    space,
                    &mut ctx.frag_count,
                    self.config.max_fragment_count,
                    &mut fpdu[offset..],
                ) {
                    Ok(status) => {
                        let written = status.bytes_written();
                        offset += written;
                        ctx.counters.packets_out += 1;
                        ctx.counters.bytes_out += written as u64;
                        progressed = true;

                        if status.is_done() {
                            let total = ctx.buf.total_len() as u64;
                            ctx.counters.packets_ok += 1;
                            ctx.counters.bytes_ok += total;
                            ctx.buf.reset();
                            self.release(frag_id);
                            debug!("fragment-id {} released after final PPDU", raw);
                        }
                    }
                    Err(TxError::BurstTooSmall) => {}
                    Err(e) => {
                        warn!("dropping ALPDU on fragment-id {}: {}", raw, e);
                        let total = ctx.buf.total_len() as u64;
                        ctx.counters.packets_dropped += 1;
                        ctx.counters.bytes_dropped += total;
                        ctx.buf.reset();
                        self.release(frag_id);
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        let padding_bytes = pad_fpdu(fpdu, offset);
        Ok(PackReport {
            bytes_written: offset,
            padding_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptype::{CompressedPtype, ProtocolType};

    fn frag_id(raw: u8) -> FragId {
        FragId::new(raw).unwrap()
    }

    fn config() -> Config {
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
    fn encapsulate_then_pack_releases_context() {
        let mut tx = Transmitter::new(config()).unwrap();
        tx.encapsulate(Sdu::new(ProtocolType::IPV4, &[1, 2, 3]), frag_id(0))
            .unwrap();
        assert!(tx.is_busy(frag_id(0)));

        let mut fpdu = [0u8; 64];
        let report = tx.pack_fpdu(&mut fpdu).unwrap();
        assert!(report.bytes_written > 0);
        assert!(!tx.is_busy(frag_id(0)));
        assert_eq!(tx.context_counters(frag_id(0)).packets_ok, 1);
    }

    #[test]
    fn busy_context_rejects_second_encapsulate() {
        let mut tx = Transmitter::new(config()).unwrap();
        tx.encapsulate(Sdu::new(ProtocolType::IPV4, &[1, 2, 3]), frag_id(3))
            .unwrap();
        assert_eq!(
            tx.encapsulate(Sdu::new(ProtocolType::IPV4, &[4, 5, 6]), frag_id(3)),
            Err(TxError::ContextBusy)
        );
    }

    #[test]
    fn oversized_sdu_leaves_context_free() {
        let mut tx = Transmitter::new(config()).unwrap();
        let huge = vec![0u8; crate::alpdu::MAX_SDU_LEN + 1];
        assert_eq!(
            tx.encapsulate(Sdu::new(ProtocolType::IPV4, &huge), frag_id(2)),
            Err(TxError::SduTooBig)
        );
        assert!(!tx.is_busy(frag_id(2)));
    }

    #[test]
    fn multiple_fragment_ids_pack_into_one_fpdu() {
        let mut tx = Transmitter::new(config()).unwrap();
        tx.encapsulate(Sdu::new(ProtocolType::IPV4, &[1; 5]), frag_id(0))
            .unwrap();
        tx.encapsulate(Sdu::new(ProtocolType::IPV4, &[2; 5]), frag_id(1))
            .unwrap();

        let mut fpdu = [0u8; 64];
        tx.pack_fpdu(&mut fpdu).unwrap();
        assert!(!tx.is_busy(frag_id(0)));
        assert!(!tx.is_busy(frag_id(1)));
    }
}
