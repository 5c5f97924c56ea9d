// Copyright (c) 2026 rezky_nightky

use thiserror::Error;

use crate::color::Rgb;

/// Size of a drawing surface in device pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }
}

/// Fill and glow for a single glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphPaint {
    pub fill: Rgb,
    /// Fill opacity in `0.0..=1.0`.
    pub alpha: f32,
    pub shadow: Rgb,
    /// Glow radius in device pixels, centered on the glyph (no offset).
    pub blur: f32,
    pub font_size: f32,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("drawing surface is not available")]
    Unavailable,
}

/// A 2D raster that can be faded and have glyphs painted onto it.
pub trait Surface {
    fn viewport(&self) -> Viewport;

    /// Composites `color` at `alpha` over the whole surface.
    fn fade(&mut self, color: Rgb, alpha: f32);

    /// Paints `glyph` with its baseline at logical `(x, y)`.
    fn fill_glyph(&mut self, glyph: char, x: f32, y: f32, paint: &GlyphPaint);
}

/// Something that may or may not currently have a drawable surface.
pub trait DrawTarget {
    fn context(&mut self) -> Result<&mut dyn Surface, SurfaceError>;
}
