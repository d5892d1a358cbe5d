//! Quadrature decoding with glitch rejection and detent accumulation.

use embassy_time::{Duration, Instant};

use super::{EncoderRawState, InputEvent};

/// Signed step of the transition `from -> to`.
///
/// The clockwise Gray sequence is `00 -> 01 -> 11 -> 10 -> 00`. Its four
/// transitions give +1, the reverse four give -1, and the remaining eight
/// (no change, or both channels flipping at once) give 0.
pub const fn decode_step(from: EncoderRawState, to: EncoderRawState) -> i8 {
    match (from.bits() << 2) | to.bits() {
        0b0001 | 0b0111 | 0b1110 | 0b1000 => 1,
        0b0010 | 0b1011 | 0b1101 | 0b0100 => -1,
        _ => 0,
    }
}

/// Turns raw channel states sampled at edge-interrupt time into detent events.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    prev: EncoderRawState,
    accumulator: i8,
    last_accept: Option<Instant>,
    glitch_reject: Duration,
    steps_per_detent: i8,
}

impl QuadratureDecoder {
    /// `steps_per_detent` below 1 is treated as 1.
    pub const fn new(initial: EncoderRawState, glitch_reject: Duration, steps_per_detent: i8) -> Self {
        Self {
            prev: initial,
            accumulator: 0,
            last_accept: None,
            glitch_reject,
            steps_per_detent: if steps_per_detent < 1 {
                1
            } else {
                steps_per_detent
            },
        }
    }

    /// Forget any partial rotation and take `state` as the resting position.
    pub fn reset(&mut self, state: EncoderRawState) {
        self.prev = state;
        self.accumulator = 0;
        self.last_accept = None;
    }

    /// Net transitions since the last detent.
    pub fn accumulator(&self) -> i8 {
        self.accumulator
    }

    /// Handle one edge on either channel.
    pub fn on_edge(&mut self, state: EncoderRawState, now: Instant) -> Option<InputEvent> {
        if let Some(last) = self.last_accept {
            if now.saturating_duration_since(last) < self.glitch_reject {
                return None;
            }
        }
        self.last_accept = Some(now);

        let step = decode_step(self.prev, state);
        // The raw level moved even when the pairing is invalid
        self.prev = state;
        if step == 0 {
            return None;
        }

        self.accumulator += step;
        if self.accumulator >= self.steps_per_detent {
            self.accumulator = 0;
            Some(InputEvent::RotateCw)
        } else if self.accumulator <= -self.steps_per_detent {
            self.accumulator = 0;
            Some(InputEvent::RotateCcw)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CW: [u8; 4] = [0b00, 0b01, 0b11, 0b10];

    fn state(bits: u8) -> EncoderRawState {
        EncoderRawState::from_bits(bits)
    }

    fn decoder() -> QuadratureDecoder {
        QuadratureDecoder::new(state(0b00), Duration::from_millis(1), 2)
    }

    #[test]
    fn test_full_transition_table() {
        let mut counts = [0usize; 3];
        for from in 0..4 {
            for to in 0..4 {
                let step = decode_step(state(from), state(to));
                counts[(step + 1) as usize] += 1;

                let from_pos = CW.iter().position(|s| *s == from).unwrap();
                let to_pos = CW.iter().position(|s| *s == to).unwrap();
                let expected = match (to_pos + 4 - from_pos) % 4 {
                    1 => 1,
                    3 => -1,
                    _ => 0,
                };
                assert_eq!(step, expected, "{from:02b} -> {to:02b}");
            }
        }
        assert_eq!(counts, [4, 8, 4]);
    }

    #[test]
    fn test_detent_after_exactly_n_transitions() {
        let mut decoder = decoder();
        let mut now = Instant::from_millis(10);
        assert_eq!(decoder.on_edge(state(0b01), now), None);
        assert_eq!(decoder.accumulator(), 1);
        now += Duration::from_millis(5);
        assert_eq!(decoder.on_edge(state(0b11), now), Some(InputEvent::RotateCw));
        assert_eq!(decoder.accumulator(), 0);

        now += Duration::from_millis(5);
        assert_eq!(decoder.on_edge(state(0b01), now), None);
        now += Duration::from_millis(5);
        assert_eq!(decoder.on_edge(state(0b00), now), Some(InputEvent::RotateCcw));
    }

    #[test]
    fn test_invalid_transition_does_not_reset_accumulator() {
        let mut decoder = decoder();
        let mut now = Instant::from_millis(10);
        decoder.on_edge(state(0b01), now);
        assert_eq!(decoder.accumulator(), 1);

        // 01 -> 10 flips both channels: ignored, but the level is tracked
        now += Duration::from_millis(5);
        assert_eq!(decoder.on_edge(state(0b10), now), None);
        assert_eq!(decoder.accumulator(), 1);

        // 10 -> 00 is a clockwise step from the tracked level
        now += Duration::from_millis(5);
        assert_eq!(decoder.on_edge(state(0b00), now), Some(InputEvent::RotateCw));
    }

    #[test]
    fn test_glitch_edges_are_discarded_entirely() {
        let mut decoder = decoder();
        let now = Instant::from_millis(10);
        decoder.on_edge(state(0b01), now);

        // Bounce 300 µs later: no state update at all
        let bounce = now + Duration::from_micros(300);
        assert_eq!(decoder.on_edge(state(0b11), bounce), None);
        assert_eq!(decoder.accumulator(), 1);

        // The real edge after the window still sees 01 as the previous state
        let later = now + Duration::from_millis(2);
        assert_eq!(decoder.on_edge(state(0b11), later), Some(InputEvent::RotateCw));
    }

    #[test]
    fn test_reset_drops_partial_rotation() {
        let mut decoder = decoder();
        decoder.on_edge(state(0b01), Instant::from_millis(10));
        decoder.reset(state(0b11));
        assert_eq!(decoder.accumulator(), 0);
        assert_eq!(
            decoder.on_edge(state(0b10), Instant::from_millis(10)),
            None
        );
        assert_eq!(decoder.accumulator(), 1);
    }

    #[test]
    fn test_non_positive_detent_size_means_single_step() {
        for steps in [0, -3, i8::MIN] {
            let mut decoder = QuadratureDecoder::new(state(0b00), Duration::from_millis(1), steps);
            assert_eq!(
                decoder.on_edge(state(0b01), Instant::from_millis(10)),
                Some(InputEvent::RotateCw)
            );
            assert_eq!(
                decoder.on_edge(state(0b00), Instant::from_millis(20)),
                Some(InputEvent::RotateCcw)
            );
            assert_eq!(decoder.accumulator(), 0);
        }
    }
}
