use rand::{rngs::StdRng, Rng};

// Logical simulation space. Rendering maps this onto the terminal grid;
// the physics never sees cell coordinates.
pub(crate) const SIM_W: f32 = 160.0;
pub(crate) const SIM_H: f32 = 144.0;
pub(crate) const CENTER_X: f32 = SIM_W / 2.0;
pub(crate) const WHEEL_Y: f32 = 120.0;

pub(crate) const LAYER_COUNT: usize = 45;
pub(crate) const FULL_WIDTH_LAYERS: usize = 20;
pub(crate) const TAPER_LAYERS: usize = 12;
pub(crate) const ACTIVE_LAYERS: usize = 28;
pub(crate) const BASE_WIDTH: f32 = 60.0;

pub(crate) const HAND_EDGE: f32 = 5.0;
pub(crate) const HAND_GAP: f32 = 1.0;
pub(crate) const HAND_MIN_Y: f32 = 25.0;
pub(crate) const HAND_SPEED: f32 = 2.5; // sim units per tick while a key is held
pub(crate) const HAND_REACH: f32 = 7.0;
pub(crate) const PUSH: f32 = 0.55;

pub(crate) const MAX_STRESS: f32 = 80.0;
pub(crate) const WHEEL_SPIN_RATE: f32 = 0.18;
pub(crate) const STRESS_SEGMENTS: usize = 20;
pub(crate) const TICK_MS: u64 = 33;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ClayLayer {
    pub(crate) width: f32,
    pub(crate) center_x: f32,
    /// Set at reset, read only for the HUD ring count. Shapes nothing.
    pub(crate) active: bool,
}

impl ClayLayer {
    pub(crate) fn left_edge(&self) -> f32 {
        self.center_x - self.width * 0.5
    }
    pub(crate) fn right_edge(&self) -> f32 {
        self.center_x + self.width * 0.5
    }
}

/// Height profile of a fresh lump: full width near the wheel, tapering
/// linearly to nothing over the next band of layers.
pub(crate) fn taper_factor(i: usize) -> f32 {
    if i < FULL_WIDTH_LAYERS {
        1.0
    } else if i < FULL_WIDTH_LAYERS + TAPER_LAYERS {
        1.0 - (i - FULL_WIDTH_LAYERS) as f32 / TAPER_LAYERS as f32
    } else {
        0.0
    }
}

pub(crate) fn layer_y(i: usize) -> f32 {
    WHEEL_Y - i as f32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Hand {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct HandState {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Hands {
    pub(crate) left: HandState,
    pub(crate) right: HandState,
}

impl Hands {
    pub(crate) fn at_rest() -> Self {
        Self {
            left: HandState {
                x: CENTER_X - 45.0,
                y: WHEEL_Y - 15.0,
            },
            right: HandState {
                x: CENTER_X + 45.0,
                y: WHEEL_Y - 15.0,
            },
        }
    }

    pub(crate) fn nudge(&mut self, hand: Hand, dx: f32, dy: f32) {
        let h = match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        };
        h.x += dx;
        h.y += dy;
        self.clamp(hand);
    }

    // Hands stay over the wheel, inside the working band, and never cross;
    // the hand that moved yields when they would meet.
    fn clamp(&mut self, moved: Hand) {
        self.left.x = self.left.x.clamp(HAND_EDGE, SIM_W - HAND_EDGE);
        self.right.x = self.right.x.clamp(HAND_EDGE, SIM_W - HAND_EDGE);
        self.left.y = self.left.y.clamp(HAND_MIN_Y, WHEEL_Y);
        self.right.y = self.right.y.clamp(HAND_MIN_Y, WHEEL_Y);
        if self.left.x > self.right.x - HAND_GAP {
            match moved {
                Hand::Left => self.left.x = self.right.x - HAND_GAP,
                Hand::Right => self.right.x = self.left.x + HAND_GAP,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CollapseCause {
    CrossedCenter,
    StressOverflow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Ready,
    Spinning,
    Collapsed(CollapseCause),
}

#[derive(Clone, Debug)]
pub(crate) struct WheelState {
    pub(crate) layers: Vec<ClayLayer>,
    pub(crate) hands: Hands,
    pub(crate) phase: Phase,
    pub(crate) stress: f32,
    pub(crate) symmetry_bonus: f32,
    pub(crate) wheel_rotation: f32,
    pub(crate) ticks: u64,
}

impl WheelState {
    pub(crate) fn new(rng: &mut StdRng) -> Self {
        Self {
            layers: fresh_clay(rng),
            hands: Hands::at_rest(),
            phase: Phase::Ready,
            stress: 0.0,
            symmetry_bonus: 1.0,
            wheel_rotation: 0.0,
            ticks: 0,
        }
    }

    pub(crate) fn reset(&mut self, rng: &mut StdRng) {
        *self = WheelState::new(rng);
    }

    pub(crate) fn is_spinning(&self) -> bool {
        self.phase == Phase::Spinning
    }

    pub(crate) fn is_collapsed(&self) -> bool {
        matches!(self.phase, Phase::Collapsed(_))
    }

    pub(crate) fn is_critical(&self) -> bool {
        self.stress > MAX_STRESS * 0.8
    }

    pub(crate) fn status_text(&self) -> &'static str {
        match self.phase {
            Phase::Ready => "READY",
            Phase::Spinning => "SPINNING",
            Phase::Collapsed(CollapseCause::CrossedCenter) => "CROSSED CENTER! RUINED",
            Phase::Collapsed(CollapseCause::StressOverflow) => "COLLAPSED!",
        }
    }

    pub(crate) fn stress_gauge(&self) -> String {
        let fill = ((self.stress / MAX_STRESS) * STRESS_SEGMENTS as f32 + 0.5) as usize;
        let fill = fill.min(STRESS_SEGMENTS);
        let mut s = String::with_capacity(STRESS_SEGMENTS + 2);
        s.push('[');
        for i in 0..STRESS_SEGMENTS {
            s.push(if i < fill { '█' } else { '░' });
        }
        s.push(']');
        s
    }

    pub(crate) fn active_ring_count(&self) -> usize {
        self.layers.iter().filter(|l| l.active).count()
    }
}

fn fresh_clay(rng: &mut StdRng) -> Vec<ClayLayer> {
    let mut layers = Vec::with_capacity(LAYER_COUNT);
    for i in 0..LAYER_COUNT {
        let f = taper_factor(i);
        // jitter inside the taper so fully tapered layers stay at zero
        let width = ((BASE_WIDTH + rng.gen_range(-1.5..=1.5)) * f).max(0.0);
        let center_x = CENTER_X + rng.gen_range(-0.6..=0.6) * f;
        layers.push(ClayLayer {
            width,
            center_x,
            active: i < ACTIVE_LAYERS,
        });
    }
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xC0FFEE)
    }

    #[test]
    fn fresh_clay_tapers_and_stays_nonnegative() {
        let mut rng = rng();
        let st = WheelState::new(&mut rng);
        assert_eq!(st.layers.len(), LAYER_COUNT);
        for (i, l) in st.layers.iter().enumerate() {
            assert!(l.width >= 0.0, "layer {i} has negative width");
            if i >= FULL_WIDTH_LAYERS + TAPER_LAYERS {
                assert_eq!(l.width, 0.0, "layer {i} should be tapered away");
                assert_eq!(l.center_x, CENTER_X);
            }
            assert_eq!(l.active, i < ACTIVE_LAYERS);
        }
    }

    #[test]
    fn taper_profile() {
        for i in 0..FULL_WIDTH_LAYERS {
            assert_eq!(taper_factor(i), 1.0);
        }
        assert!(taper_factor(FULL_WIDTH_LAYERS) < 1.0);
        for i in FULL_WIDTH_LAYERS + TAPER_LAYERS..LAYER_COUNT {
            assert_eq!(taper_factor(i), 0.0);
        }
    }

    #[test]
    fn fresh_state_is_ready() {
        let mut rng = rng();
        let st = WheelState::new(&mut rng);
        assert_eq!(st.phase, Phase::Ready);
        assert_eq!(st.stress, 0.0);
        assert_eq!(st.symmetry_bonus, 1.0);
        assert_eq!(st.hands.left.x, CENTER_X - 45.0);
        assert_eq!(st.hands.right.x, CENTER_X + 45.0);
        assert_eq!(st.hands.left.y, WHEEL_Y - 15.0);
        assert_eq!(st.active_ring_count(), ACTIVE_LAYERS);
    }

    #[test]
    fn hands_never_cross_or_leave_the_wheel() {
        let mut rng = rng();
        let mut hands = Hands::at_rest();
        for step in 0..2000 {
            let hand = if step % 2 == 0 { Hand::Left } else { Hand::Right };
            let dx = rng.gen_range(-40.0..40.0);
            let dy = rng.gen_range(-40.0..40.0);
            hands.nudge(hand, dx, dy);

            assert!(hands.left.x <= hands.right.x - HAND_GAP + 1e-4);
            assert!(hands.left.x >= HAND_EDGE);
            assert!(hands.right.x <= SIM_W - HAND_EDGE);
            assert!((HAND_MIN_Y..=WHEEL_Y).contains(&hands.left.y));
            assert!((HAND_MIN_Y..=WHEEL_Y).contains(&hands.right.y));
        }
    }

    #[test]
    fn stress_gauge_fill() {
        let mut rng = rng();
        let mut st = WheelState::new(&mut rng);
        assert_eq!(st.stress_gauge(), format!("[{}]", "░".repeat(STRESS_SEGMENTS)));
        st.stress = MAX_STRESS;
        assert_eq!(st.stress_gauge(), format!("[{}]", "█".repeat(STRESS_SEGMENTS)));
        assert!(st.is_critical());
        st.stress = MAX_STRESS * 0.5;
        assert!(!st.is_critical());
    }
}
