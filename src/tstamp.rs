//! Rational timestamps on the musical timeline.
//!
//! A [`Tstamp`] counts whole beats plus a remainder in `[0, BEAT)` parts.
//! `BEAT` is highly composite so that common subdivisions (triplets,
//! quintuplets, 1/64 rows) are exact. All arithmetic keeps the remainder
//! normalized; the beat count carries the sign.

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of timestamp parts in one beat.
pub const BEAT: i32 = 882_161_280;

/// A point or distance on the beat timeline.
///
/// Invariant: `0 <= rem < BEAT` after every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Tstamp {
    beats: i64,
    rem: i32,
}

impl Tstamp {
    /// Create a timestamp from whole beats and a remainder.
    ///
    /// The remainder must already be normalized.
    pub fn new(beats: i64, rem: i32) -> Self {
        debug_assert!((0..BEAT).contains(&rem));
        Self { beats, rem }
    }

    /// The zero timestamp.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A timestamp of whole beats.
    pub fn from_beats(beats: i64) -> Self {
        Self { beats, rem: 0 }
    }

    pub fn beats(&self) -> i64 {
        self.beats
    }

    pub fn rem(&self) -> i32 {
        self.rem
    }

    pub fn is_zero(&self) -> bool {
        self.beats == 0 && self.rem == 0
    }

    /// The smaller of two timestamps.
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Convert to a frame count at the given tempo and audio rate.
    ///
    /// Only meaningful for non-negative timestamps.
    pub fn to_frames(&self, tempo: f64, rate: u32) -> f64 {
        debug_assert!(self.beats >= 0);
        debug_assert!(tempo > 0.0);
        debug_assert!(rate > 0);

        (self.beats as f64 + f64::from(self.rem) / f64::from(BEAT)) * 60.0 * f64::from(rate)
            / tempo
    }

    /// Convert a frame count to beat time at the given tempo and audio rate.
    pub fn from_frames(frames: f64, tempo: f64, rate: u32) -> Self {
        debug_assert!(frames >= 0.0);
        debug_assert!(tempo > 0.0);
        debug_assert!(rate > 0);

        let val = frames * tempo / f64::from(rate) / 60.0;
        let beats = val.floor() as i64;
        let mut rem = ((val - beats as f64) * f64::from(BEAT)) as i32;
        // Floating-point rounding may land exactly on the next beat.
        if rem >= BEAT {
            rem = BEAT - 1;
        }
        Self::new(beats, rem)
    }

    fn normalized(beats: i64, rem: i64) -> Self {
        // Inputs are normalized, so one carry step suffices.
        let beat = i64::from(BEAT);
        debug_assert!(rem > -beat && rem < 2 * beat);
        if rem >= beat {
            Self::new(beats + 1, (rem - beat) as i32)
        } else if rem < 0 {
            Self::new(beats - 1, (rem + beat) as i32)
        } else {
            Self::new(beats, rem as i32)
        }
    }
}

impl PartialOrd for Tstamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tstamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.beats
            .cmp(&other.beats)
            .then(self.rem.cmp(&other.rem))
    }
}

impl Add for Tstamp {
    type Output = Tstamp;

    fn add(self, rhs: Tstamp) -> Tstamp {
        Tstamp::normalized(
            self.beats + rhs.beats,
            i64::from(self.rem) + i64::from(rhs.rem),
        )
    }
}

impl Sub for Tstamp {
    type Output = Tstamp;

    fn sub(self, rhs: Tstamp) -> Tstamp {
        Tstamp::normalized(
            self.beats - rhs.beats,
            i64::from(self.rem) - i64::from(rhs.rem),
        )
    }
}

impl AddAssign for Tstamp {
    fn add_assign(&mut self, rhs: Tstamp) {
        *self = *self + rhs;
    }
}

impl SubAssign for Tstamp {
    fn sub_assign(&mut self, rhs: Tstamp) {
        *self = *self - rhs;
    }
}

impl Neg for Tstamp {
    type Output = Tstamp;

    fn neg(self) -> Tstamp {
        Tstamp::zero() - self
    }
}

impl fmt::Display for Tstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.beats, self.rem)
    }
}

// On the wire a timestamp is the two-element list `[beats, rem]`.

impl Serialize for Tstamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.beats)?;
        seq.serialize_element(&self.rem)?;
        seq.end()
    }
}

struct TstampVisitor;

impl<'de> Visitor<'de> for TstampVisitor {
    type Value = Tstamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [beats, rem] pair")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Tstamp, A::Error> {
        let beats: i64 = seq
            .next_element()?
            .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
        let rem: i32 = seq
            .next_element()?
            .ok_or_else(|| serde::de::Error::invalid_length(1, &self))?;
        if !(0..BEAT).contains(&rem) {
            return Err(serde::de::Error::custom("timestamp remainder out of range"));
        }
        Ok(Tstamp::new(beats, rem))
    }
}

impl<'de> Deserialize<'de> for Tstamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(TstampVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_carries_remainder() {
        let a = Tstamp::new(1, BEAT - 1);
        let b = Tstamp::new(0, 2);
        let sum = a + b;
        assert_eq!(sum, Tstamp::new(2, 1));
    }

    #[test]
    fn test_sub_borrows_remainder() {
        let a = Tstamp::new(2, 1);
        let b = Tstamp::new(0, 2);
        assert_eq!(a - b, Tstamp::new(1, BEAT - 1));
    }

    #[test]
    fn test_add_then_sub_is_identity() {
        let cases = [
            (Tstamp::zero(), Tstamp::new(0, 1)),
            (Tstamp::new(3, 100), Tstamp::new(5, BEAT - 1)),
            (Tstamp::new(-2, BEAT / 2), Tstamp::new(7, BEAT / 3)),
        ];
        for (a, b) in cases {
            assert_eq!((a + b) - b, a);
            assert_eq!((a - b) + b, a);
        }
    }

    #[test]
    fn test_negative_results_keep_rem_normalized() {
        let a = Tstamp::new(0, 1);
        let b = Tstamp::new(1, 0);
        let diff = a - b;
        assert_eq!(diff.beats(), -1);
        assert_eq!(diff.rem(), 1);
        assert!(diff < Tstamp::zero());
    }

    #[test]
    fn test_ordering() {
        assert!(Tstamp::new(1, 0) < Tstamp::new(1, 1));
        assert!(Tstamp::new(0, BEAT - 1) < Tstamp::new(1, 0));
        assert_eq!(
            Tstamp::new(2, 5).min(Tstamp::new(2, 4)),
            Tstamp::new(2, 4)
        );
    }

    #[test]
    fn test_frame_conversion_at_120_bpm() {
        // One beat at 120 BPM and 48000 Hz is half a second.
        let one_beat = Tstamp::from_beats(1);
        let frames = one_beat.to_frames(120.0, 48000);
        assert!((frames - 24000.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_round_trip_within_one_frame() {
        let tempos = [60.0, 120.0, 148.5];
        let rates = [44100, 48000];
        let stamps = [
            Tstamp::zero(),
            Tstamp::new(0, BEAT / 3),
            Tstamp::new(4, BEAT / 7),
            Tstamp::new(100, BEAT - 1),
        ];
        for tempo in tempos {
            for rate in rates {
                for ts in stamps {
                    let frames = ts.to_frames(tempo, rate);
                    let back = Tstamp::from_frames(frames, tempo, rate);
                    let diff = if back > ts { back - ts } else { ts - back };
                    let one_frame = Tstamp::from_frames(1.0, tempo, rate);
                    assert!(
                        diff <= one_frame,
                        "round trip drifted more than one frame: {} -> {}",
                        ts,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_serde_list_form() {
        let ts = Tstamp::new(3, 12345);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "[3,12345]");
        let back: Tstamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_serde_rejects_denormalized() {
        let res: Result<Tstamp, _> = serde_json::from_str("[0,882161280]");
        assert!(res.is_err());
    }
}
