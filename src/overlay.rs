// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

use crossterm::style::Color;

use crate::color::{ColorMode, Rgb};
use crate::frame::{Cell, Frame};
use crate::scheduler::FpsSink;

/// How often the displayed number is refreshed from the sink.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

const MARGIN_RIGHT: u16 = 2;
const MARGIN_TOP: u16 = 1;
const PAD_X: u16 = 1;

const BORDER: Rgb = Rgb::new(22, 163, 74);
const TEXT: Rgb = Rgb::new(240, 255, 240);
const FILL: Rgb = Rgb::new(0, 0, 0);

/// Bordered frame-rate readout in the top right corner.
pub struct FpsCounter {
    sink: FpsSink,
    shown: u32,
    last_poll: Option<Instant>,
}

impl FpsCounter {
    pub fn new(sink: FpsSink) -> Self {
        Self {
            sink,
            shown: 0,
            last_poll: None,
        }
    }

    pub fn shown(&self) -> u32 {
        self.shown
    }

    /// Re-reads the sink if the poll interval has passed.
    pub fn poll(&mut self, now: Instant) {
        let due = self
            .last_poll
            .map_or(true, |t| now.saturating_duration_since(t) >= POLL_INTERVAL);
        if !due {
            return;
        }
        self.last_poll = Some(now);
        let fps = self.sink.latest().unwrap_or(0.0);
        self.shown = if fps.is_finite() && fps > 0.0 {
            fps.round().min(u32::MAX as f64) as u32
        } else {
            0
        };
    }

    pub fn draw(&self, frame: &mut Frame, mode: ColorMode) {
        let text: Vec<char> = self.shown.to_string().chars().collect();
        let box_w = text.len() as u16 + 2 * PAD_X + 2;
        let box_h: u16 = 3;
        if frame.width < box_w + MARGIN_RIGHT || frame.height < box_h + MARGIN_TOP {
            return;
        }

        let start_col = frame.width - MARGIN_RIGHT - box_w;
        let start_line = MARGIN_TOP;
        let border_fg = BORDER.to_term(mode);
        let text_fg = TEXT.to_term(mode);
        let bg: Option<Color> = FILL.to_term(mode);

        for y in 0..box_h {
            for x in 0..box_w {
                let is_top = y == 0;
                let is_bottom = y + 1 == box_h;
                let is_left = x == 0;
                let is_right = x + 1 == box_w;

                let (ch, fg, bold) = if (is_top || is_bottom) && (is_left || is_right) {
                    ('+', border_fg, false)
                } else if is_top || is_bottom {
                    ('-', border_fg, false)
                } else if is_left || is_right {
                    ('|', border_fg, false)
                } else {
                    let ix = (x - 1) as usize;
                    let ch = ix
                        .checked_sub(PAD_X as usize)
                        .and_then(|i| text.get(i).copied())
                        .unwrap_or(' ');
                    (ch, if ch == ' ' { None } else { text_fg }, ch != ' ')
                };

                frame.set(
                    start_col + x,
                    start_line + y,
                    Cell { ch, fg, bg, bold },
                );
            }
        }
    }
}
