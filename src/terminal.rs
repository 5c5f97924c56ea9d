// Copyright (c) 2026 rezky_nightky

use std::io::{stdout, Result, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event},
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, ExecutableCommand, QueueableCommand,
};

use crate::frame::{Cell, Frame};
use crate::scheduler::FrameHost;

/// Raw-mode alternate-screen session. Restores the terminal on drop.
pub struct Terminal {
    stdout: Stdout,
    shown: Option<Frame>,
    run_buf: String,
    pen: Pen,
}

/// Attributes last emitted to the terminal.
#[derive(Default)]
struct Pen {
    fg: Option<Color>,
    bg: Option<Color>,
    bold: bool,
    pos: Option<(u16, u16)>,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        let init_res: Result<()> = (|| {
            out.execute(terminal::EnterAlternateScreen)?;
            out.execute(cursor::Hide)?;
            let _ = out.execute(terminal::DisableLineWrap);
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(ResetColor)?;
            out.execute(terminal::Clear(terminal::ClearType::All))?;
            out.flush()?;
            Ok(())
        })();
        if let Err(e) = init_res {
            restore_terminal_best_effort();
            return Err(e);
        }
        log::info!("terminal session started");
        Ok(Self {
            stdout: out,
            shown: None,
            run_buf: String::with_capacity(64),
            pen: Pen::default(),
        })
    }

    pub fn size(&self) -> Result<(u16, u16)> {
        terminal::size()
    }

    fn apply_style(&mut self, cell: &Cell) -> Result<()> {
        if cell.fg != self.pen.fg {
            self.stdout
                .queue(SetForegroundColor(cell.fg.unwrap_or(Color::Reset)))?;
            self.pen.fg = cell.fg;
        }
        if cell.bg != self.pen.bg {
            self.stdout
                .queue(SetBackgroundColor(cell.bg.unwrap_or(Color::Reset)))?;
            self.pen.bg = cell.bg;
        }
        if cell.bold != self.pen.bold {
            self.stdout.queue(SetAttribute(if cell.bold {
                Attribute::Bold
            } else {
                Attribute::NormalIntensity
            }))?;
            self.pen.bold = cell.bold;
        }
        Ok(())
    }

    fn finish(&mut self, frame: &mut Frame) -> Result<()> {
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.flush()?;
        self.pen = Pen::default();
        frame.clear_dirty();
        Ok(())
    }

    /// Writes the changed part of `frame`, or all of it after a resize.
    pub fn draw(&mut self, frame: &mut Frame) -> Result<()> {
        let same_size = self
            .shown
            .as_ref()
            .is_some_and(|s| s.width == frame.width && s.height == frame.height);
        let total = frame.width as usize * frame.height as usize;
        let dirty_is_large = total > 0 && frame.dirty_indices().len() >= total / 3;

        if !same_size || frame.is_dirty_all() || dirty_is_large {
            self.draw_full(frame, !same_size)?;
        } else {
            self.draw_dirty(frame)?;
        }
        self.finish(frame)
    }

    fn draw_full(&mut self, frame: &Frame, clear: bool) -> Result<()> {
        if clear {
            self.stdout
                .queue(terminal::Clear(terminal::ClearType::All))?;
        }
        for y in 0..frame.height {
            self.stdout.queue(cursor::MoveTo(0, y))?;
            for x in 0..frame.width {
                let idx = y as usize * frame.width as usize + x as usize;
                let cell = frame.cell_at_index(idx);
                if cell == Cell::CONTINUATION {
                    continue;
                }
                self.apply_style(&cell)?;
                self.stdout.queue(Print(cell.ch))?;
            }
        }
        self.shown = Some(frame.clone());
        Ok(())
    }

    fn draw_dirty(&mut self, frame: &Frame) -> Result<()> {
        let Some(mut shown) = self.shown.take() else {
            return Ok(());
        };

        let width = frame.width as usize;
        let mut dirty = frame.dirty_indices().to_vec();
        dirty.sort_unstable();

        let mut i = 0usize;
        while i < dirty.len() {
            let idx0 = dirty[i];
            let cell0 = frame.cell_at_index(idx0);
            if shown.cell_at_index(idx0) == cell0 {
                i += 1;
                continue;
            }

            let x0 = (idx0 % width) as u16;
            let y0 = (idx0 / width) as u16;
            shown.set(x0, y0, cell0);

            // Extend the run over adjacent cells sharing the same style.
            self.run_buf.clear();
            if cell0 != Cell::CONTINUATION {
                self.run_buf.push(cell0.ch);
            }
            let mut run_len: u16 = 1;
            let mut last_idx = idx0;
            let mut j = i + 1;
            while j < dirty.len() {
                let idx1 = dirty[j];
                if idx1 != last_idx + 1 || idx1 / width != idx0 / width {
                    break;
                }
                let cell1 = frame.cell_at_index(idx1);
                if shown.cell_at_index(idx1) == cell1 {
                    break;
                }
                if cell1 != Cell::CONTINUATION
                    && (cell1.fg != cell0.fg || cell1.bg != cell0.bg || cell1.bold != cell0.bold)
                {
                    break;
                }
                if cell1 != Cell::CONTINUATION {
                    self.run_buf.push(cell1.ch);
                }
                shown.set((idx1 % width) as u16, y0, cell1);
                run_len = run_len.saturating_add(1);
                last_idx = idx1;
                j += 1;
            }

            if !self.run_buf.is_empty() {
                if self.pen.pos != Some((x0, y0)) {
                    self.stdout.queue(cursor::MoveTo(x0, y0))?;
                }
                self.apply_style(&cell0)?;
                self.stdout.queue(Print(self.run_buf.as_str()))?;
                let next_x = x0.saturating_add(run_len);
                self.pen.pos = (next_x < frame.width).then_some((next_x, y0));
            }

            i = j;
        }

        shown.clear_dirty();
        self.shown = Some(shown);
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        restore_terminal_best_effort();
        log::info!("terminal session ended");
    }
}

pub fn restore_terminal_best_effort() {
    let mut out = stdout();
    let _ = out.execute(SetAttribute(Attribute::Reset));
    let _ = out.execute(ResetColor);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::EnableLineWrap);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}

/// Input gathered by a frame host since the last frame.
pub trait EventSource {
    fn take_events(&mut self) -> Vec<Event>;
}

/// Frame host backed by the real clock that collects terminal events while
/// waiting for the next frame.
#[derive(Default)]
pub struct TerminalHost {
    events: Vec<Event>,
}

impl EventSource for TerminalHost {
    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl FrameHost for TerminalHost {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wait(&mut self, timeout: Duration) -> Result<()> {
        if event::poll(timeout)? {
            self.events.push(event::read()?);
            while event::poll(Duration::ZERO)? {
                self.events.push(event::read()?);
            }
        }
        Ok(())
    }
}
