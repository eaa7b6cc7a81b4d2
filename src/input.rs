use crate::model::{Hand, CENTER_X, HAND_SPEED};
use crate::sim::PlayerAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use std::collections::HashMap;
use std::time::{Duration, Instant};

// Terminals deliver no key-up, so a "held" key is a deadline refreshed by
// each press/repeat event.
const HOLD_PULSE_MS: u64 = 150;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InputEvent {
    Key(KeyCode),
    PointerDown { id: u32, col: u16, row: u16 },
    PointerDrag { id: u32, col: u16, row: u16 },
    PointerUp { id: u32 },
}

pub(crate) fn collect_input_nonblocking(
    max_frame_time: Duration,
) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        let ev = match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
                Some(InputEvent::Key(k.code))
            }
            Event::Mouse(m) => match m.kind {
                MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::PointerDown {
                    id: 0,
                    col: m.column,
                    row: m.row,
                }),
                MouseEventKind::Drag(MouseButton::Left) => Some(InputEvent::PointerDrag {
                    id: 0,
                    col: m.column,
                    row: m.row,
                }),
                MouseEventKind::Up(MouseButton::Left) => Some(InputEvent::PointerUp { id: 0 }),
                _ => None,
            },
            _ => None,
        };
        if let Some(ev) = ev {
            out.push(ev);
            if out.len() >= 32 {
                break;
            }
        }
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Up,
    Down,
    Left,
    Right,
}

pub(crate) fn map_key(code: KeyCode) -> Option<PlayerAction> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(PlayerAction::Quit),
        KeyCode::Char(' ') => Some(PlayerAction::ToggleSpin),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(PlayerAction::Reset),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(PlayerAction::CycleColor),

        KeyCode::Char('w') | KeyCode::Char('W') => Some(PlayerAction::Hold(Hand::Left, Dir::Up)),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(PlayerAction::Hold(Hand::Left, Dir::Down)),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(PlayerAction::Hold(Hand::Left, Dir::Left)),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(PlayerAction::Hold(Hand::Left, Dir::Right)),

        KeyCode::Up => Some(PlayerAction::Hold(Hand::Right, Dir::Up)),
        KeyCode::Down => Some(PlayerAction::Hold(Hand::Right, Dir::Down)),
        KeyCode::Left => Some(PlayerAction::Hold(Hand::Right, Dir::Left)),
        KeyCode::Right => Some(PlayerAction::Hold(Hand::Right, Dir::Right)),

        _ => None,
    }
}

pub(crate) struct HeldKeys {
    deadlines: [[Instant; 4]; 2], // [hand][dir]
}

impl HeldKeys {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            deadlines: [[now; 4]; 2],
        }
    }

    pub(crate) fn press(&mut self, hand: Hand, dir: Dir, now: Instant) {
        self.deadlines[hand_idx(hand)][dir_idx(dir)] =
            now + Duration::from_millis(HOLD_PULSE_MS);
    }

    /// Per-tick velocity for one hand from whatever directions are live.
    pub(crate) fn velocity(&self, hand: Hand, now: Instant) -> (f32, f32) {
        let d = &self.deadlines[hand_idx(hand)];
        let mut vx = 0.0;
        let mut vy = 0.0;
        if now <= d[dir_idx(Dir::Left)] {
            vx -= HAND_SPEED;
        }
        if now <= d[dir_idx(Dir::Right)] {
            vx += HAND_SPEED;
        }
        if now <= d[dir_idx(Dir::Up)] {
            vy -= HAND_SPEED;
        }
        if now <= d[dir_idx(Dir::Down)] {
            vy += HAND_SPEED;
        }
        (vx, vy)
    }
}

fn hand_idx(hand: Hand) -> usize {
    match hand {
        Hand::Left => 0,
        Hand::Right => 1,
    }
}

fn dir_idx(dir: Dir) -> usize {
    match dir {
        Dir::Up => 0,
        Dir::Down => 1,
        Dir::Left => 2,
        Dir::Right => 3,
    }
}

struct Touch {
    hand: Hand,
    x: f32,
    y: f32,
}

/// Pointer-id to hand assignment. A pointer is claimed by the left or
/// right hand on press, by which half of the sim space it lands in, and
/// owns that hand until release. Ids come from the host input system; the
/// terminal mouse is id 0, but nothing here assumes a single pointer.
pub(crate) struct PointerMap {
    touches: HashMap<u32, Touch>,
}

impl PointerMap {
    pub(crate) fn new() -> Self {
        Self {
            touches: HashMap::new(),
        }
    }

    pub(crate) fn down(&mut self, id: u32, x: f32, y: f32) {
        let hand = if x < CENTER_X { Hand::Left } else { Hand::Right };
        self.touches.insert(id, Touch { hand, x, y });
    }

    /// Movement delta in sim units since the last event for this pointer,
    /// or None for a pointer we never saw go down.
    pub(crate) fn drag(&mut self, id: u32, x: f32, y: f32) -> Option<(Hand, f32, f32)> {
        let t = self.touches.get_mut(&id)?;
        let delta = (t.hand, x - t.x, y - t.y);
        t.x = x;
        t.y = y;
        Some(delta)
    }

    pub(crate) fn up(&mut self, id: u32) {
        self.touches.remove(&id);
    }
}
