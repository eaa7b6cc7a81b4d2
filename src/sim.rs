use crate::input::Dir;
use crate::model::{
    layer_y, CollapseCause, Hand, Phase, WheelState, CENTER_X, HAND_REACH, MAX_STRESS, PUSH,
    WHEEL_SPIN_RATE,
};
use rand::rngs::StdRng;

#[derive(Clone, Copy, Debug)]
pub(crate) enum PlayerAction {
    ToggleSpin,
    Reset,
    DragHand { hand: Hand, dx: f32, dy: f32 },
    Hold(Hand, Dir),
    CycleColor,
    Quit,
}

impl WheelState {
    /// `Hold`, `CycleColor` and `Quit` are the app loop's business and
    /// fall through here unchanged.
    pub(crate) fn apply(&mut self, action: PlayerAction, rng: &mut StdRng) {
        match action {
            PlayerAction::ToggleSpin => match self.phase {
                // once the piece is down, the same key throws fresh clay
                Phase::Collapsed(_) => self.reset(rng),
                Phase::Spinning => self.phase = Phase::Ready,
                Phase::Ready => self.phase = Phase::Spinning,
            },
            PlayerAction::Reset => self.reset(rng),
            PlayerAction::DragHand { hand, dx, dy } => self.hands.nudge(hand, dx, dy),
            PlayerAction::Hold(..) | PlayerAction::CycleColor | PlayerAction::Quit => {}
        }
    }

    pub(crate) fn tick(&mut self) {
        if self.phase != Phase::Spinning {
            return;
        }

        // A hand past the centerline shears the piece straight off the
        // wheel, whatever the stress level.
        if self.hands.left.x > CENTER_X + 1.0 || self.hands.right.x < CENTER_X - 1.0 {
            self.phase = Phase::Collapsed(CollapseCause::CrossedCenter);
            return;
        }

        self.ticks += 1;
        self.wheel_rotation += WHEEL_SPIN_RATE;

        let avg_base_width =
            self.layers.iter().take(8).map(|l| l.width).sum::<f32>() / 8.0;

        let left = self.hands.left;
        let right = self.hands.right;

        let mut instability = 0.0f32;
        let mut total_drift = 0.0f32;
        let mut total_off_center = 0.0f32;
        let mut highest = 0usize;
        let mut prev_center = CENTER_X;

        for i in 0..self.layers.len() {
            let ly = layer_y(i);
            let layer = &mut self.layers[i];

            // Hand contact: inside the vertical reach band and pressed to
            // (or past) the rim on that hand's side. Contact thins the
            // ring and pushes it toward center.
            if (left.y - ly).abs() < HAND_REACH && left.x >= layer.left_edge() {
                layer.width = (layer.width - PUSH * 0.45).max(0.0);
                layer.center_x += PUSH * 0.4;
            }
            if (right.y - ly).abs() < HAND_REACH && right.x <= layer.right_edge() {
                layer.width = (layer.width - PUSH * 0.45).max(0.0);
                layer.center_x -= PUSH * 0.4;
            }

            if layer.width > 3.0 {
                highest = i;
            }

            if i > 0 {
                let drift = (layer.center_x - prev_center).abs();
                total_drift += drift;
                instability += drift * 3.0;
            }
            let off = (layer.center_x - CENTER_X).abs();
            total_off_center += off;
            instability += off;

            // top-heavy bulge with nothing under it
            if i > 15 && layer.width > avg_base_width * 2.0 {
                instability += (layer.width - avg_base_width * 2.0) * 10.0;
            }

            prev_center = layer.center_x;
        }

        let denom = highest.max(1) as f32;
        let smoothness = total_drift / denom;
        let centeredness = total_off_center / denom;

        let current_symmetry =
            (1.0 / (smoothness * 0.3 + centeredness * 0.15 + 0.05)).min(6.0);
        self.symmetry_bonus = self.symmetry_bonus * 0.9 + current_symmetry * 0.1;

        // an evenly thrown piece tolerates more instability and sheds
        // stress faster
        let dynamic_threshold = 400.0 * (self.symmetry_bonus * 0.6);
        if instability > dynamic_threshold {
            self.stress += (instability - dynamic_threshold) * 0.0025;
        } else {
            self.stress = (self.stress - 0.25 * self.symmetry_bonus).max(0.0);
        }

        if self.stress > MAX_STRESS {
            self.stress = MAX_STRESS;
            self.phase = Phase::Collapsed(CollapseCause::StressOverflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{taper_factor, HandState, BASE_WIDTH, WHEEL_Y};
    use rand::SeedableRng;

    fn fresh() -> (WheelState, StdRng) {
        let mut rng = StdRng::seed_from_u64(7);
        let st = WheelState::new(&mut rng);
        (st, rng)
    }

    /// Perfectly smooth, perfectly centered stack.
    fn uniform_clay(st: &mut WheelState) {
        for (i, l) in st.layers.iter_mut().enumerate() {
            l.width = BASE_WIDTH * taper_factor(i);
            l.center_x = CENTER_X;
        }
    }

    /// Alternating offsets: enormous inter-layer drift.
    fn sawtooth_clay(st: &mut WheelState) {
        uniform_clay(st);
        for (i, l) in st.layers.iter_mut().enumerate() {
            l.center_x = if i % 2 == 0 {
                CENTER_X - 10.0
            } else {
                CENTER_X + 10.0
            };
        }
    }

    #[test]
    fn idle_spin_builds_no_stress() {
        let (mut st, mut rng) = fresh();
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        assert!(st.is_spinning());

        let before: Vec<(f32, f32)> =
            st.layers.iter().map(|l| (l.width, l.center_x)).collect();
        for _ in 0..1000 {
            st.tick();
        }

        assert!(!st.is_collapsed());
        assert!(st.stress < 1.0, "stress {} after idle spin", st.stress);
        // hands at rest never touch the clay
        let after: Vec<(f32, f32)> =
            st.layers.iter().map(|l| (l.width, l.center_x)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn left_hand_across_center_ruins_next_tick() {
        let (mut st, mut rng) = fresh();
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        st.hands.nudge(Hand::Left, 47.0, 0.0); // lands at CENTER_X + 2
        assert!((st.hands.left.x - (CENTER_X + 2.0)).abs() < 1e-3);

        st.tick();
        assert_eq!(st.phase, Phase::Collapsed(CollapseCause::CrossedCenter));
        assert!(!st.is_spinning());
        assert_eq!(st.status_text(), "CROSSED CENTER! RUINED");
    }

    #[test]
    fn right_hand_across_center_ruins_next_tick() {
        let (mut st, mut rng) = fresh();
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        st.hands.nudge(Hand::Right, -47.0, 0.0);
        assert!(st.hands.right.x < CENTER_X - 1.0);

        st.tick();
        assert_eq!(st.phase, Phase::Collapsed(CollapseCause::CrossedCenter));
    }

    #[test]
    fn collapse_freezes_physics() {
        let (mut st, mut rng) = fresh();
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        st.hands.nudge(Hand::Left, 47.0, 0.0);
        st.tick();
        assert!(st.is_collapsed());

        let stress = st.stress;
        let bonus = st.symmetry_bonus;
        let rotation = st.wheel_rotation;
        let layers: Vec<(f32, f32)> =
            st.layers.iter().map(|l| (l.width, l.center_x)).collect();

        for _ in 0..100 {
            st.tick();
        }

        assert_eq!(st.stress, stress);
        assert_eq!(st.symmetry_bonus, bonus);
        assert_eq!(st.wheel_rotation, rotation);
        let layers_after: Vec<(f32, f32)> =
            st.layers.iter().map(|l| (l.width, l.center_x)).collect();
        assert_eq!(layers, layers_after);
    }

    #[test]
    fn stress_overflow_collapses_at_the_bound() {
        let (mut st, mut rng) = fresh();
        sawtooth_clay(&mut st);
        st.apply(PlayerAction::ToggleSpin, &mut rng);

        let mut ticks = 0;
        while !st.is_collapsed() {
            st.tick();
            assert!(st.stress <= MAX_STRESS, "stress overshot the cap");
            ticks += 1;
            assert!(ticks < 1000, "sawtooth stack never collapsed");
        }
        assert_eq!(st.phase, Phase::Collapsed(CollapseCause::StressOverflow));
        assert_eq!(st.stress, MAX_STRESS);
        assert_eq!(st.status_text(), "COLLAPSED!");
    }

    #[test]
    fn symmetry_bonus_converges_to_cap_on_perfect_clay() {
        let (mut st, mut rng) = fresh();
        uniform_clay(&mut st);
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        for _ in 0..60 {
            st.tick();
        }
        assert!((st.symmetry_bonus - 6.0).abs() < 0.05);
    }

    #[test]
    fn symmetry_bonus_converges_geometrically() {
        let (mut st, mut rng) = fresh();
        uniform_clay(&mut st);
        st.apply(PlayerAction::ToggleSpin, &mut rng);

        for _ in 0..10 {
            st.tick();
        }
        let e10 = 6.0 - st.symmetry_bonus;
        for _ in 0..10 {
            st.tick();
        }
        let e20 = 6.0 - st.symmetry_bonus;

        // EMA with decay 0.9: error shrinks by 0.9 per tick
        assert!((e20 / e10 - 0.9f32.powi(10)).abs() < 1e-3);
    }

    #[test]
    fn pressed_hand_thins_and_centers_nearby_layers() {
        let (mut st, mut rng) = fresh();
        uniform_clay(&mut st);
        // pressed well into the rim, reaching layers 4..=16
        st.hands.left = HandState {
            x: 60.0,
            y: WHEEL_Y - 10.0,
        };
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        st.tick();

        let touched = st.layers[10];
        assert!((touched.width - (BASE_WIDTH - PUSH * 0.45)).abs() < 1e-4);
        assert!((touched.center_x - (CENTER_X + PUSH * 0.4)).abs() < 1e-4);

        // outside the reach band
        assert_eq!(st.layers[0].width, BASE_WIDTH);
        assert_eq!(st.layers[0].center_x, CENTER_X);
        assert_eq!(st.layers[30].center_x, CENTER_X);
    }

    #[test]
    fn spin_toggle_pauses_without_losing_stress() {
        let (mut st, mut rng) = fresh();
        sawtooth_clay(&mut st);
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        for _ in 0..3 {
            st.tick();
        }
        let stress = st.stress;
        assert!(stress > 0.0);

        st.apply(PlayerAction::ToggleSpin, &mut rng);
        assert_eq!(st.phase, Phase::Ready);
        for _ in 0..50 {
            st.tick();
        }
        assert_eq!(st.stress, stress);

        st.apply(PlayerAction::ToggleSpin, &mut rng);
        assert!(st.is_spinning());
    }

    #[test]
    fn spin_key_resets_after_collapse() {
        let (mut st, mut rng) = fresh();
        st.apply(PlayerAction::ToggleSpin, &mut rng);
        st.hands.nudge(Hand::Left, 47.0, 0.0);
        st.tick();
        assert!(st.is_collapsed());

        st.apply(PlayerAction::ToggleSpin, &mut rng);
        assert_eq!(st.phase, Phase::Ready);
        assert_eq!(st.stress, 0.0);
        assert_eq!(st.hands, crate::model::Hands::at_rest());
        assert!(st.layers.iter().all(|l| l.width >= 0.0));
    }

    #[test]
    fn drag_respects_hand_clamps() {
        let (mut st, mut rng) = fresh();
        st.apply(
            PlayerAction::DragHand {
                hand: Hand::Left,
                dx: 500.0,
                dy: 500.0,
            },
            &mut rng,
        );
        assert!(st.hands.left.x <= st.hands.right.x - 1.0 + 1e-4);
        assert_eq!(st.hands.left.y, WHEEL_Y);
    }
}
