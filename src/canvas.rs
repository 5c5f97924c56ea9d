// Copyright (c) 2026 rezky_nightky

use crate::color::{blend, ColorMode, Rgb};
use crate::config::CellSize;
use crate::frame::{is_wide, Cell, Frame};
use crate::surface::{DrawTarget, GlyphPaint, Surface, SurfaceError, Viewport};

/// Color of a canvas nothing has been drawn on yet.
pub const CANVAS_BACKGROUND: Rgb = Rgb::new(9, 9, 11);

/// Blur radius at which a glow tints its own cell at full strength.
const GLOW_FULL_BLUR: f32 = 48.0;

/// Minimum brightness gap between ink and background for a glyph to show.
const INK_THRESHOLD: f32 = 18.0;

const BOLD_LUMA: f32 = 200.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pixel {
    glyph: char,
    ink: [f32; 3],
    glow: [f32; 3],
}

impl Pixel {
    fn blank() -> Self {
        let bg = CANVAS_BACKGROUND.to_linear();
        Self {
            glyph: ' ',
            ink: bg,
            glow: bg,
        }
    }
}

/// A raster over the terminal grid. Each character cell is a block of
/// `cell.width x cell.height` virtual pixels holding one glyph, the glyph's
/// ink color and a background tint accumulated from glows.
pub struct Canvas {
    cols: u16,
    rows: u16,
    cell: CellSize,
    mirrored: bool,
    pixels: Vec<Pixel>,
}

impl Canvas {
    pub fn new(cols: u16, rows: u16, cell: CellSize, mirrored: bool) -> Self {
        Self {
            cols,
            rows,
            cell,
            mirrored,
            pixels: vec![Pixel::blank(); cols as usize * rows as usize],
        }
    }

    /// Resizes to a new grid; everything drawn so far is lost.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.pixels.clear();
        self.pixels
            .resize(cols as usize * rows as usize, Pixel::blank());
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Grid cell a glyph with its baseline at `(x, y)` lands in.
    fn cell_of(&self, x: f32, y: f32, font_size: f32) -> Option<(u16, u16)> {
        let width = self.viewport().width;
        let px = if self.mirrored { width - x } else { x };
        let py = y - font_size * 0.5;
        if !(px.is_finite() && py.is_finite()) || px < 0.0 || py < 0.0 {
            return None;
        }
        let col = (px / self.cell.width).floor();
        let row = (py / self.cell.height).floor();
        if col >= self.cols as f32 || row >= self.rows as f32 {
            return None;
        }
        Some((col as u16, row as u16))
    }

    fn index(&self, col: u16, row: u16) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    fn glow(&mut self, col: u16, row: u16, paint: &GlyphPaint) {
        let strength = paint.alpha.clamp(0.0, 1.0) * (paint.blur / GLOW_FULL_BLUR).min(1.0);
        if strength <= 0.0 {
            return;
        }
        let shadow = paint.shadow.to_linear();
        let rx = (paint.blur / self.cell.width).round() as i32;
        let ry = (paint.blur / self.cell.height).round() as i32;
        for dy in -ry..=ry {
            for dx in -rx..=rx {
                let c = col as i32 + dx;
                let r = row as i32 + dy;
                if c < 0 || r < 0 || c >= self.cols as i32 || r >= self.rows as i32 {
                    continue;
                }
                let falloff = 1.0 / (1 + dx.abs().max(dy.abs())) as f32;
                let i = self.index(c as u16, r as u16);
                blend(&mut self.pixels[i].glow, shadow, strength * falloff);
            }
        }
    }

    /// Glyph currently stored at a grid cell, visible or not.
    pub fn glyph_at(&self, col: u16, row: u16) -> Option<char> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(self.pixels[self.index(col, row)].glyph)
    }

    /// Writes the canvas into `frame`, which must have the same grid size.
    pub fn present(&self, frame: &mut Frame, mode: ColorMode) {
        for row in 0..self.rows.min(frame.height) {
            let mut continuation = false;
            for col in 0..self.cols.min(frame.width) {
                if continuation {
                    continuation = false;
                    frame.set(col, row, Cell::CONTINUATION);
                    continue;
                }

                let px = self.pixels[self.index(col, row)];
                let ink = Rgb::from_linear(px.ink);
                let bg = Rgb::from_linear(px.glow);
                let mut visible = px.glyph != ' ' && ink.luma() - bg.luma() >= INK_THRESHOLD;
                if visible && is_wide(px.glyph) {
                    if col + 1 < self.cols.min(frame.width) {
                        continuation = true;
                    } else {
                        visible = false;
                    }
                }

                let cell = if visible {
                    Cell {
                        ch: px.glyph,
                        fg: ink.to_term(mode),
                        bg: bg.to_term(mode),
                        bold: ink.luma() >= BOLD_LUMA,
                    }
                } else {
                    Cell {
                        ch: ' ',
                        fg: None,
                        bg: bg.to_term(mode),
                        bold: false,
                    }
                };
                frame.set(col, row, cell);
            }
        }
    }
}

impl Surface for Canvas {
    fn viewport(&self) -> Viewport {
        Viewport::new(
            self.cols as f32 * self.cell.width,
            self.rows as f32 * self.cell.height,
        )
    }

    fn fade(&mut self, color: Rgb, alpha: f32) {
        let c = color.to_linear();
        for px in &mut self.pixels {
            blend(&mut px.ink, c, alpha);
            blend(&mut px.glow, c, alpha);
        }
    }

    fn fill_glyph(&mut self, glyph: char, x: f32, y: f32, paint: &GlyphPaint) {
        let Some((col, row)) = self.cell_of(x, y, paint.font_size) else {
            return;
        };
        let alpha = paint.alpha.clamp(0.0, 1.0);
        if alpha > 0.0 {
            let i = self.index(col, row);
            let px = &mut self.pixels[i];
            let before = Rgb::from_linear(px.ink).luma();
            // The glyph shown is whichever paint dominates the cell's ink.
            if alpha * paint.fill.luma() >= (1.0 - alpha) * before {
                px.glyph = glyph;
            }
            blend(&mut px.ink, paint.fill.to_linear(), alpha);
        }
        self.glow(col, row, paint);
    }
}

impl DrawTarget for Canvas {
    fn context(&mut self) -> Result<&mut dyn Surface, SurfaceError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(SurfaceError::Unavailable);
        }
        Ok(self)
    }
}
