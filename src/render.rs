use crate::model::{
    layer_y, WheelState, CENTER_X, SIM_H, SIM_W, WHEEL_Y,
};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

pub(crate) const HUD_ROWS: u16 = 3;

pub(crate) const CLAY_COLORS: &[Color] = &[
    Color::DarkYellow,
    Color::Yellow,
    Color::DarkRed,
    Color::Grey,
    Color::DarkGreen,
    Color::Cyan,
    Color::Magenta,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let prev = CellBuffer::new(cols, rows);
        let cur = CellBuffer::new(cols, rows);

        Ok(Self {
            out,
            cols,
            rows,
            prev,
            cur,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/// Maps the fixed 160×144 sim space onto the cell grid below the HUD.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SimView {
    pub(crate) y0: i32,
    pub(crate) sx: f32,
    pub(crate) sy: f32,
}

impl SimView {
    pub(crate) fn fit(cols: u16, rows: u16) -> Self {
        let w = cols.max(1) as f32;
        let h = rows.saturating_sub(HUD_ROWS).max(1) as f32;
        Self {
            y0: HUD_ROWS as i32,
            sx: w / SIM_W,
            sy: h / SIM_H,
        }
    }

    pub(crate) fn to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        ((x * self.sx) as i32, self.y0 + (y * self.sy) as i32)
    }

    pub(crate) fn to_sim(&self, col: u16, row: u16) -> (f32, f32) {
        (
            (col as f32 + 0.5) / self.sx,
            ((row as i32 - self.y0) as f32 + 0.5) / self.sy,
        )
    }
}

fn put(buf: &mut CellBuffer, x: i32, y: i32, ch: char, fg: Color) {
    if x >= 0 && y >= 0 && x < buf.w as i32 && y < buf.h as i32 {
        buf.set(
            x as u16,
            y as u16,
            Cell {
                ch,
                fg,
                bg: Color::Black,
            },
        );
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
            },
        );
    }
}

fn tint(c: Color, enable_color: bool) -> Color {
    if enable_color {
        c
    } else {
        Color::White
    }
}

pub(crate) fn draw_frame(
    buf: &mut CellBuffer,
    st: &WheelState,
    view: &SimView,
    clay: Color,
    enable_color: bool,
) {
    buf.clear(Color::Black);
    draw_wheel(buf, st, view, enable_color);
    draw_clay(buf, st, view, tint(clay, enable_color));
    draw_hands(buf, st, view, enable_color);
    draw_hud(buf, st, enable_color);
}

fn draw_wheel(buf: &mut CellBuffer, st: &WheelState, view: &SimView, enable_color: bool) {
    let fg = tint(Color::DarkGrey, enable_color);
    let (x0, y) = view.to_cell(CENTER_X - 55.0, WHEEL_Y + 1.0);
    let (x1, _) = view.to_cell(CENTER_X + 55.0, WHEEL_Y + 1.0);
    for x in x0..=x1 {
        put(buf, x, y, '=', fg);
    }
    // spin marker riding the rim
    let mx = CENTER_X + st.wheel_rotation.cos() * 50.0;
    let (mc, _) = view.to_cell(mx, WHEEL_Y + 1.0);
    put(buf, mc, y, 'o', tint(Color::White, enable_color));
}

fn draw_clay(buf: &mut CellBuffer, st: &WheelState, view: &SimView, clay: Color) {
    for (i, layer) in st.layers.iter().enumerate() {
        if layer.width < 0.5 {
            continue;
        }
        let off = (layer.center_x - CENTER_X).abs();
        let wobble = if st.is_spinning() {
            (st.wheel_rotation * 2.0 + i as f32 * 0.35).sin() * off * 0.3
                / (st.symmetry_bonus + 0.5)
        } else {
            0.0
        };
        let y = layer_y(i);
        let (x0, yc) = view.to_cell(layer.left_edge() + wobble, y);
        let (x1, _) = view.to_cell(layer.right_edge() + wobble, y);
        for x in x0..=x1 {
            put(buf, x, yc, '█', clay);
        }
    }
}

fn draw_hands(buf: &mut CellBuffer, st: &WheelState, view: &SimView, enable_color: bool) {
    let fg = tint(Color::Cyan, enable_color);
    let (lx, ly) = view.to_cell(st.hands.left.x, st.hands.left.y);
    put(buf, lx, ly - 1, '│', fg);
    put(buf, lx, ly, '>', fg);
    put(buf, lx, ly + 1, '│', fg);

    let (rx, ry) = view.to_cell(st.hands.right.x, st.hands.right.y);
    put(buf, rx, ry - 1, '│', fg);
    put(buf, rx, ry, '<', fg);
    put(buf, rx, ry + 1, '│', fg);
}

fn draw_hud(buf: &mut CellBuffer, st: &WheelState, enable_color: bool) {
    let fg = Color::White;

    let title = format!(
        "kickwheel | {} | sym {:>4.2} | rings {}/{} | {:>5.1}s",
        st.status_text(),
        st.symmetry_bonus,
        st.active_ring_count(),
        st.layers.len(),
        st.ticks as f32 * crate::model::TICK_MS as f32 / 1000.0,
    );
    draw_text(buf, 1, 0, &title, fg);

    let gauge_fg = if st.is_critical() {
        tint(Color::Red, enable_color)
    } else {
        fg
    };
    let gauge = format!("stress {} {:>5.1}", st.stress_gauge(), st.stress);
    draw_text(buf, 1, 1, &gauge, gauge_fg);

    let help = "[wasd] left hand  [arrows] right hand  [space] spin  [drag] shape  [r] reset  [c] color  [q] quit";
    draw_text(buf, 1, buf.h.saturating_sub(1), help, fg);
}

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let w = buf.w;
    let h = buf.h;

    let bw = std::cmp::min(46, w.saturating_sub(4));
    let bh = std::cmp::min(9, h.saturating_sub(4));
    if bw < 4 || bh < 4 {
        return;
    }

    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let ch = if y == y0 || y == y0 + bh - 1 {
                '─'
            } else if x == x0 || x == x0 + bw - 1 {
                '│'
            } else {
                ' '
            };
            buf.set(
                x,
                y,
                Cell {
                    ch,
                    fg: Color::White,
                    bg: Color::Black,
                },
            );
        }
    }
    buf.set(x0, y0, Cell { ch: '┌', fg: Color::White, bg: Color::Black });
    buf.set(x0 + bw - 1, y0, Cell { ch: '┐', fg: Color::White, bg: Color::Black });
    buf.set(x0, y0 + bh - 1, Cell { ch: '└', fg: Color::White, bg: Color::Black });
    buf.set(x0 + bw - 1, y0 + bh - 1, Cell { ch: '┘', fg: Color::White, bg: Color::Black });

    draw_text(buf, x0 + 2, y0 + 1, title, Color::Red);

    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, Color::White);
        yy += 1;
    }
}
