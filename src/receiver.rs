//! The receiver façade: eight reassembly contexts, aggregate/per-context statistics, and FPDU
//! unpacking.

use crate::config::Config;
use crate::error::ConfigError;
use crate::fpdu::unpack_fpdu;
use crate::ppdu::{FragId, Pdu};
use crate::reassembly::{process_comp, ReassembledSdu, ReassemblyContext, MAX_REASSEMBLY_LEN};
use crate::stats::Counters;
use crate::NUM_FRAGMENT_IDS;

struct RxContext {
    reassembly: ReassemblyContext,
    counters: Counters,
}

impl RxContext {
    const fn new() -> Self {
        Self {
            reassembly: ReassemblyContext::new(),
            counters: Counters::new(),
        }
    }
}

/// The RLE receiver: owns eight reassembly contexts and turns FPDUs back into SDUs.
///
/// A `Receiver` is single-threaded (§5): unlike [`crate::transmitter::Transmitter`], nothing about
/// it is shared state, since only one caller ever drives a given receiver instance. A host that
/// needs parallel receivers (eg. one per worker thread) simply constructs one `Receiver` per
/// worker.
pub struct Receiver {
    contexts: [RxContext; NUM_FRAGMENT_IDS],
    config: Config,
    scratch: [u8; MAX_REASSEMBLY_LEN],
    counters: Counters,
}

impl Receiver {
    /// Creates a receiver for `config`, validating it first.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            contexts: [
                RxContext::new(),
                RxContext::new(),
                RxContext::new(),
                RxContext::new(),
                RxContext::new(),
                RxContext::new(),
                RxContext::new(),
                RxContext::new(),
            ],
            config,
            scratch: [0; MAX_REASSEMBLY_LEN],
            counters: Counters::new(),
        })
    }

    /// Returns the configuration this receiver was constructed with.
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

    /// Whether fragment-id `frag_id` currently has a reassembly in progress.
    pub fn is_in_progress(&self, frag_id: FragId) -> bool {
        self.contexts[usize::from(frag_id.get())].reassembly.is_in_progress()
    }

    /// Unpacks `fpdu` and feeds every reassembled SDU to `sink`, in the order PPDUs complete
    /// their ALPDU (COMP PPDUs deliver immediately; fragmented ALPDUs deliver on their END).
    ///
    /// Malformed PPDU headers, protocol violations and trailer mismatches drop the offending
    /// ALPDU and update counters; they never abort unpacking the rest of the FPDU.
    pub fn decapsulate(&mut self, fpdu: &[u8], mut sink: impl FnMut(ReassembledSdu<'_>)) {
        let label_len = usize::from(self.config.implicit_payload_label_size);
        let iter = match unpack_fpdu(fpdu, label_len) {
            Ok(iter) => iter,
            Err(_) => {
                warn!("FPDU shorter than its own payload-label field");
                return;
            }
        };

        for pdu in iter {
            match pdu {
                Ok(pdu) => self.process_pdu(pdu, &mut sink),
                Err(_) => {
                    self.counters.packets_dropped += 1;
                    warn!("malformed PPDU header in FPDU");
                }
            }
        }
    }

    fn process_pdu(&mut self, pdu: Pdu<'_>, sink: &mut impl FnMut(ReassembledSdu<'_>)) {
        let config = self.config;
        self.counters.packets_in += 1;

        match pdu {
            Pdu::Comp { header, payload } => {
                self.counters.bytes_in += payload.len() as u64;
                match process_comp(payload, header.ptype_suppressed(), &config, &mut self.scratch)
                {
                    Ok(sdu) => {
                        self.counters.packets_ok += 1;
                        self.counters.packets_out += 1;
                        self.counters.bytes_ok += sdu.payload.len() as u64;
                        trace!("reassembled {} byte SDU from COMP PPDU", sdu.payload.len());
                        sink(sdu);
                    }
                    Err(e) => {
                        self.counters.packets_dropped += 1;
                        warn!("dropping COMP PPDU: {}", e);
                    }
                }
            }

            Pdu::Start { header, payload } => {
                let idx = usize::from(header.frag_id());
                self.counters.bytes_in += payload.len() as u64;
                let ctx = &mut self.contexts[idx];

                if ctx.reassembly.is_in_progress() {
                    ctx.reassembly.force_release();
                    ctx.counters.packets_lost += 1;
                    self.counters.packets_lost += 1;
                    debug!(
                        "fragment-id {} got a START while still in progress; dropping old context",
                        idx
                    );
                }

                match ctx.reassembly.start(
                    usize::from(header.total_len()),
                    header.use_crc(),
                    header.ptype_suppressed(),
                    header.label_type(),
                    payload,
                ) {
                    Ok(()) => debug!("fragment-id {} allocated by START PPDU", idx),
                    Err(e) => {
                        ctx.counters.packets_dropped += 1;
                        self.counters.packets_dropped += 1;
                        warn!("dropping START PPDU on fragment-id {}: {}", idx, e);
                    }
                }
            }

            Pdu::Cont { header, payload } => {
                let idx = usize::from(header.frag_id());
                self.counters.bytes_in += payload.len() as u64;
                let ctx = &mut self.contexts[idx];

                if !ctx.reassembly.is_in_progress() {
                    ctx.counters.packets_dropped += 1;
                    self.counters.packets_dropped += 1;
                    warn!("CONT PPDU with no context in progress on fragment-id {}", idx);
                    return;
                }

                if let Err(e) = ctx.reassembly.append(payload) {
                    ctx.counters.packets_dropped += 1;
                    self.counters.packets_dropped += 1;
                    warn!("dropping ALPDU on fragment-id {}: {}", idx, e);
                }
            }

            Pdu::End { header, payload } => {
                let idx = usize::from(header.frag_id());
                self.counters.bytes_in += payload.len() as u64;
                let ctx = &mut self.contexts[idx];

                if !ctx.reassembly.is_in_progress() {
                    ctx.counters.packets_dropped += 1;
                    self.counters.packets_dropped += 1;
                    warn!("END PPDU with no context in progress on fragment-id {}", idx);
                    return;
                }

                match ctx.reassembly.end(payload, &config) {
                    Ok((sdu, lost)) => {
                        ctx.counters.packets_ok += 1;
                        ctx.counters.packets_lost += u64::from(lost);
                        ctx.counters.bytes_ok += sdu.payload.len() as u64;
                        self.counters.packets_ok += 1;
                        self.counters.packets_out += 1;
                        self.counters.packets_lost += u64::from(lost);
                        self.counters.bytes_ok += sdu.payload.len() as u64;
                        trace!(
                            "reassembled {} byte SDU on fragment-id {} ({} lost)",
                            sdu.payload.len(),
                            idx,
                            lost
                        );
                        sink(sdu);
                    }
                    Err(e) => {
                        ctx.counters.packets_dropped += 1;
                        self.counters.packets_dropped += 1;
                        warn!("dropping ALPDU on fragment-id {}: {}", idx, e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpdu::{encapsulate, Sdu};
    use crate::fragmentation::{emit_ppdu, SeqNum3};
    use crate::ptype::{CompressedPtype, ProtocolType};

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
    fn decapsulate_delivers_comp_sdu() {
        let config = config();
        let mut seq = SeqNum3::default();
        let mut buf = crate::alpdu::FragBuffer::new();
        encapsulate(&mut buf, Sdu::new(ProtocolType::IPV4, &[9, 9, 9]), &config, &mut seq).unwrap();

        let mut frag_count = 0;
        let mut fpdu = [0u8; 32];
        emit_ppdu(&mut buf, 0, 32, &mut frag_count, u32::MAX, &mut fpdu).unwrap();

        let mut rx = Receiver::new(config).unwrap();
        let mut delivered = vec![];
        rx.decapsulate(&fpdu, |sdu| delivered.push(sdu.payload.to_vec()));
        assert_eq!(delivered, vec![vec![9, 9, 9]]);
        assert_eq!(rx.counters().packets_ok, 1);
    }

    #[test]
    fn cont_without_start_is_dropped() {
        use crate::bytes::{ByteWriter, ToBytes};
        use crate::ppdu::ContEndHeader;

        let config = config();
        let mut rx = Receiver::new(config).unwrap();
        // A CONT header (S=0,E=0) with frag_id=0, length=1, one payload byte.
        let header = ContEndHeader::new(false, 0, 1).unwrap();
        let mut fpdu = [0u8; 8];
        {
            let mut writer = ByteWriter::new(&mut fpdu);
            header.to_bytes(&mut writer).unwrap();
            writer.write_slice(&[0xAB]).unwrap();
        }
        let mut delivered = 0;
        rx.decapsulate(&fpdu, |_| delivered += 1);
        assert_eq!(delivered, 0);
        assert_eq!(rx.counters().packets_dropped, 1);
    }
}
