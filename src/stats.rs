//! Statistics counters, kept per fragment-id context and aggregated per transmitter/receiver.

/// Packet and byte counters for one context, or aggregated across all contexts of a transmitter
/// or receiver.
///
/// Widened to `u64` rather than the `u32` a C implementation would use for these fields: a
/// long-lived satellite link should not wrap its byte counters over the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// SDUs submitted for encapsulation (tx) or PPDUs/ALPDUs seen (rx).
    pub packets_in: u64,
    /// PPDUs emitted onto the wire (tx) or SDUs delivered upward (rx).
    pub packets_out: u64,
    /// SDUs successfully encapsulated and fully emitted (tx), or successfully reassembled and
    /// delivered (rx).
    pub packets_ok: u64,
    /// SDUs dropped due to an error (oversized SDU, protocol violation, trailer mismatch, ...).
    pub packets_dropped: u64,
    /// Fragments inferred lost from a sequence-number gap (rx only).
    pub packets_lost: u64,
    /// Bytes submitted (tx) or received (rx).
    pub bytes_in: u64,
    /// Bytes emitted onto the wire (tx) or delivered upward (rx).
    pub bytes_out: u64,
    /// Bytes belonging to successfully completed SDUs.
    pub bytes_ok: u64,
    /// Bytes belonging to dropped SDUs.
    pub bytes_dropped: u64,
}

impl Counters {
    /// Returns a zeroed counter set.
    pub const fn new() -> Self {
        Self {
            packets_in: 0,
            packets_out: 0,
            packets_ok: 0,
            packets_dropped: 0,
            packets_lost: 0,
            bytes_in: 0,
            bytes_out: 0,
            bytes_ok: 0,
            bytes_dropped: 0,
        }
    }

    /// Adds `other`'s counts into `self`, field by field, saturating rather than wrapping.
    ///
    /// Used by the transmitter/receiver façades to fold each context's counters into an aggregate.
    pub fn accumulate(&mut self, other: &Counters) {
        self.packets_in = self.packets_in.saturating_add(other.packets_in);
        self.packets_out = self.packets_out.saturating_add(other.packets_out);
        self.packets_ok = self.packets_ok.saturating_add(other.packets_ok);
        self.packets_dropped = self.packets_dropped.saturating_add(other.packets_dropped);
        self.packets_lost = self.packets_lost.saturating_add(other.packets_lost);
        self.bytes_in = self.bytes_in.saturating_add(other.bytes_in);
        self.bytes_out = self.bytes_out.saturating_add(other.bytes_out);
        self.bytes_ok = self.bytes_ok.saturating_add(other.bytes_ok);
        self.bytes_dropped = self.bytes_dropped.saturating_add(other.bytes_dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_sums_fields() {
        let mut total = Counters::new();
        let a = Counters {
            packets_ok: 3,
            bytes_ok: 300,
            ..Counters::new()
        };
        let b = Counters {
            packets_ok: 2,
            bytes_ok: 150,
            packets_lost: 1,
            ..Counters::new()
        };
        total.accumulate(&a);
        total.accumulate(&b);
        assert_eq!(total.packets_ok, 5);
        assert_eq!(total.bytes_ok, 450);
        assert_eq!(total.packets_lost, 1);
    }
}
