use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_key, HeldKeys, InputEvent, PointerMap};
use crate::model::{Hand, WheelState, TICK_MS};
use crate::render::{draw_center_box, draw_frame, SimView, Terminal, CLAY_COLORS};
use crate::sim::PlayerAction;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    rng: StdRng,
    state: WheelState,
    term: Terminal,
    held: HeldKeys,
    pointers: PointerMap,
    view: SimView,
    color_index: usize,
    should_quit: bool,
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        let mut settings = load_settings(&paths.settings_path);
        if settings.seed == 0 {
            settings.seed = Settings::default().seed;
        }

        let mut rng = StdRng::seed_from_u64(settings.seed);
        let state = WheelState::new(&mut rng);

        let term = Terminal::begin()?;
        let view = SimView::fit(term.cols, term.rows);

        Ok(Self {
            settings,
            paths,
            rng,
            state,
            term,
            held: HeldKeys::new(Instant::now()),
            pointers: PointerMap::new(),
            view,
            color_index: 0,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let tick_step = Duration::from_millis(TICK_MS);

        let mut last_frame = Instant::now();
        let mut sim_accum = Duration::ZERO;

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.view = SimView::fit(self.term.cols, self.term.rows);
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                self.handle_event(ev);
            }

            let now = Instant::now();
            sim_accum = sim_accum.saturating_add(now.saturating_duration_since(last_frame));
            last_frame = now;
            // don't spiral after a stall
            if sim_accum > Duration::from_millis(250) {
                sim_accum = Duration::from_millis(250);
            }

            while sim_accum >= tick_step {
                let (vx, vy) = self.held.velocity(Hand::Left, now);
                if vx != 0.0 || vy != 0.0 {
                    self.state.hands.nudge(Hand::Left, vx, vy);
                }
                let (vx, vy) = self.held.velocity(Hand::Right, now);
                if vx != 0.0 || vy != 0.0 {
                    self.state.hands.nudge(Hand::Right, vx, vy);
                }
                self.state.tick();
                sim_accum = sim_accum.saturating_sub(tick_step);
            }

            self.render_frame()?;
            spin_sleep(frame_dt, Instant::now());
        }

        Ok(())
    }

    fn handle_event(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key(code) => {
                if let Some(action) = map_key(code) {
                    match action {
                        PlayerAction::Quit => self.should_quit = true,
                        PlayerAction::CycleColor => {
                            self.color_index = self.color_index.wrapping_add(1);
                        }
                        PlayerAction::Hold(hand, dir) => {
                            self.held.press(hand, dir, Instant::now());
                        }
                        other => self.state.apply(other, &mut self.rng),
                    }
                }
            }
            InputEvent::PointerDown { id, col, row } => {
                let (x, y) = self.view.to_sim(col, row);
                self.pointers.down(id, x, y);
            }
            InputEvent::PointerDrag { id, col, row } => {
                let (x, y) = self.view.to_sim(col, row);
                if let Some((hand, dx, dy)) = self.pointers.drag(id, x, y) {
                    self.state
                        .apply(PlayerAction::DragHand { hand, dx, dy }, &mut self.rng);
                }
            }
            InputEvent::PointerUp { id } => self.pointers.up(id),
        }
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let clay = CLAY_COLORS[self.color_index % CLAY_COLORS.len()];
        draw_frame(
            &mut self.term.cur,
            &self.state,
            &self.view,
            clay,
            self.settings.enable_color,
        );

        if self.state.is_collapsed() {
            draw_center_box(
                &mut self.term.cur,
                self.state.status_text(),
                "The piece is ruined.\nSpace or R throws fresh clay.\nQ quits.",
            );
        }

        self.term.present(true)?;
        Ok(())
    }
}

pub(crate) fn run() -> anyhow::Result<()> {
    let mut app = App::init()?;
    let res = app.run();
    // restore the terminal on every exit path before reporting errors
    let cleanup = app.term.end();
    save_settings_atomic(&app.paths.settings_path, &app.settings)?;
    res.and(cleanup)
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
