use bxcan::{filter::Mask32, Fifo, Frame, Id, StandardId};
use fugit::HertzU32;

use crate::error::Error;

/// bxCAN bit timing, expressed in time quanta.
///
/// The nominal bit is `1 (sync) + seg1 + seg2` quanta long, each quantum being
/// `prescaler` peripheral clock cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitTiming {
    pub prescaler: u16,
    pub sjw: u8,
    pub seg1: u8,
    pub seg2: u8,
}

impl BitTiming {
    /// Prescaler 16, SJW 1 tq, BS1 10 tq, BS2 1 tq.
    pub const HARNESS: BitTiming = BitTiming {
        prescaler: 16,
        sjw: 1,
        seg1: 10,
        seg2: 1,
    };

    /// Checks every field against the ranges of the BTR register.
    pub fn validate(&self) -> Result<(), Error> {
        let in_range = (1..=1024).contains(&self.prescaler)
            && (1..=4).contains(&self.sjw)
            && (1..=16).contains(&self.seg1)
            && (1..=8).contains(&self.seg2);

        if in_range {
            Ok(())
        } else {
            Err(Error::InvalidTiming)
        }
    }

    /// Encodes the timing as a `CAN_BTR` register value.
    ///
    /// Every field is stored minus one. Call [`validate()`][Self::validate()]
    /// first, out of range values are truncated to their register width.
    pub fn btr(&self) -> u32 {
        let brp = (self.prescaler as u32).saturating_sub(1) & 0x3ff;
        let ts1 = (self.seg1 as u32).saturating_sub(1) & 0xf;
        let ts2 = (self.seg2 as u32).saturating_sub(1) & 0x7;
        let sjw = (self.sjw as u32).saturating_sub(1) & 0x3;

        brp | (ts1 << 16) | (ts2 << 20) | (sjw << 24)
    }

    /// Number of time quanta in one bit.
    pub fn quanta_per_bit(&self) -> u32 {
        1 + self.seg1 as u32 + self.seg2 as u32
    }

    /// Resulting bit rate for a given APB1 clock.
    pub fn bitrate(&self, pclk: HertzU32) -> HertzU32 {
        let divider = self.prescaler as u32 * self.quanta_per_bit();
        HertzU32::from_raw(pclk.raw().checked_div(divider).unwrap_or(0))
    }

    /// Sample point in per mille of the bit time.
    pub fn sample_point_permille(&self) -> u32 {
        (1 + self.seg1 as u32) * 1000 / self.quanta_per_bit()
    }
}

/// Operating mode, selected once at init.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Loopback,
    Silent,
    SilentLoopback,
}

impl Mode {
    pub fn loopback(&self) -> bool {
        matches!(self, Mode::Loopback | Mode::SilentLoopback)
    }

    pub fn silent(&self) -> bool {
        matches!(self, Mode::Silent | Mode::SilentLoopback)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusConfig {
    pub timing: BitTiming,
    pub mode: Mode,
    pub automatic_retransmit: bool,
    /// How many times `start()` polls the peripheral before giving up.
    pub start_attempts: u32,
}

impl BusConfig {
    /// Configuration used by the harness firmware.
    pub const HARNESS: BusConfig = BusConfig {
        timing: BitTiming::HARNESS,
        mode: Mode::Normal,
        automatic_retransmit: false,
        start_attempts: 100_000,
    };
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::HARNESS
    }
}

/// Identifier + mask rule for a 32-bit filter bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mask {
    /// Zero mask: every identifier matches.
    AcceptAll,
    /// Standard-identifier data frames whose id matches `id` on the bits set in `mask`.
    StandardId { id: StandardId, mask: StandardId },
}

impl Mask {
    /// Whether a frame delivered by the bus would pass this rule.
    pub fn matches(&self, frame: &Frame) -> bool {
        match self {
            Mask::AcceptAll => true,
            Mask::StandardId { id, mask } => match frame.id() {
                Id::Standard(rx) if frame.is_data_frame() => {
                    (rx.as_raw() ^ id.as_raw()) & mask.as_raw() == 0
                }
                _ => false,
            },
        }
    }

    pub fn as_mask32(&self) -> Mask32 {
        match *self {
            Mask::AcceptAll => Mask32::accept_all(),
            Mask::StandardId { id, mask } => Mask32::frames_with_std_id(id, mask),
        }
    }
}

/// A single acceptance filter bank, identifier+mask mode, 32-bit scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterConfig {
    pub bank: u8,
    pub fifo: Fifo,
    pub mask: Mask,
}

impl FilterConfig {
    /// Bank 0, FIFO 0, mask 0.
    pub const ACCEPT_ALL: FilterConfig = FilterConfig {
        bank: 0,
        fifo: Fifo::Fifo0,
        mask: Mask::AcceptAll,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use bxcan::{Data, ExtendedId};
    use fugit::RateExtU32;

    #[test]
    fn harness_timing_encodes_to_btr() {
        assert_eq!(BitTiming::HARNESS.validate(), Ok(()));
        assert_eq!(BitTiming::HARNESS.btr(), 0x0009_000f);
    }

    #[test]
    fn harness_timing_bitrate() {
        let timing = BitTiming::HARNESS;
        assert_eq!(timing.quanta_per_bit(), 12);
        assert_eq!(timing.bitrate(48.MHz()), HertzU32::from_raw(250_000));
        assert_eq!(timing.sample_point_permille(), 916);
    }

    #[test]
    fn out_of_range_timing_is_rejected() {
        for timing in [
            BitTiming { prescaler: 0, ..BitTiming::HARNESS },
            BitTiming { prescaler: 1025, ..BitTiming::HARNESS },
            BitTiming { sjw: 5, ..BitTiming::HARNESS },
            BitTiming { seg1: 17, ..BitTiming::HARNESS },
            BitTiming { seg2: 0, ..BitTiming::HARNESS },
        ] {
            assert_eq!(timing.validate(), Err(Error::InvalidTiming), "{:?}", timing);
        }
    }

    #[test]
    fn modes() {
        assert!(!Mode::Normal.loopback() && !Mode::Normal.silent());
        assert!(Mode::Loopback.loopback() && !Mode::Loopback.silent());
        assert!(!Mode::Silent.loopback() && Mode::Silent.silent());
        assert!(Mode::SilentLoopback.loopback() && Mode::SilentLoopback.silent());
    }

    #[test]
    fn accept_all_matches_everything() {
        let frames = [
            Frame::new_data(StandardId::ZERO, Data::empty()),
            Frame::new_data(StandardId::MAX, [0xff; 8]),
            Frame::new_data(ExtendedId::MAX, [1, 2, 3]),
            Frame::new_remote(StandardId::new(0x123).unwrap(), 4),
        ];
        for frame in &frames {
            assert!(FilterConfig::ACCEPT_ALL.mask.matches(frame));
        }
    }

    #[test]
    fn std_id_mask_only_matches_selected_bits() {
        let mask = Mask::StandardId {
            id: StandardId::new(0x200).unwrap(),
            mask: StandardId::new(0x7f0).unwrap(),
        };

        assert!(mask.matches(&Frame::new_data(StandardId::new(0x20a).unwrap(), [0])));
        assert!(!mask.matches(&Frame::new_data(StandardId::new(0x210).unwrap(), [0])));
        assert!(!mask.matches(&Frame::new_data(ExtendedId::new(0x200).unwrap(), [0])));
        assert!(!mask.matches(&Frame::new_remote(StandardId::new(0x200).unwrap(), 0)));
    }
}
