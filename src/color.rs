// Copyright (c) 2026 rezky_nightky

use std::env;
use std::fmt;
use std::str::FromStr;

use crossterm::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Mono,
    Color16,
    Color256,
    TrueColor,
}

impl ColorMode {
    pub fn detect() -> Self {
        let colorterm = env::var("COLORTERM")
            .unwrap_or_default()
            .to_ascii_lowercase();
        if colorterm.contains("truecolor") || colorterm.contains("24bit") {
            return ColorMode::TrueColor;
        }

        let term = env::var("TERM").unwrap_or_default().to_ascii_lowercase();
        if term == "dumb" {
            return ColorMode::Mono;
        }
        if term.contains("256color") {
            return ColorMode::Color256;
        }

        ColorMode::Color16
    }

    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(ColorMode::Mono),
            16 => Some(ColorMode::Color16),
            8 | 256 => Some(ColorMode::Color256),
            24 | 32 => Some(ColorMode::TrueColor),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorMode::TrueColor => "24-bit truecolor",
            ColorMode::Color256 => "8-bit (256-color)",
            ColorMode::Color16 => "16-color",
            ColorMode::Mono => "mono",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_linear(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }

    pub fn from_linear(v: [f32; 3]) -> Self {
        let q = |c: f32| c.round().clamp(0.0, 255.0) as u8;
        Self::new(q(v[0]), q(v[1]), q(v[2]))
    }

    /// Perceived brightness in `0.0..=255.0`.
    pub fn luma(self) -> f32 {
        0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32
    }

    pub fn to_term(self, mode: ColorMode) -> Option<Color> {
        match mode {
            ColorMode::Mono => None,
            ColorMode::TrueColor => Some(Color::Rgb {
                r: self.r,
                g: self.g,
                b: self.b,
            }),
            ColorMode::Color256 => Some(Color::AnsiValue(rgb_to_ansi256(self.r, self.g, self.b))),
            ColorMode::Color16 => Some(rgb_to_color16(self.r, self.g, self.b)),
        }
    }
}

/// Source-over blend of `src` at `alpha` onto `dst`, in place.
pub fn blend(dst: &mut [f32; 3], src: [f32; 3], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    for (d, s) in dst.iter_mut().zip(src) {
        *d += (s - *d) * a;
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Accepts `#rrggbb`, `r,g,b` and `r g b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("invalid hex color: {s} (expected #rrggbb)"));
            }
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| format!("invalid hex color: {s}"))
            };
            return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 {
            return Err(format!("invalid color: {s} (expected r,g,b or #rrggbb)"));
        }
        let mut v = [0u8; 3];
        for (slot, part) in v.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("invalid color channel: {part} (min 0 max 255)"))?;
        }
        Ok(Rgb::new(v[0], v[1], v[2]))
    }
}

fn dist2(r0: u8, g0: u8, b0: u8, r1: u8, g1: u8, b1: u8) -> i32 {
    let dr = (r0 as i32) - (r1 as i32);
    let dg = (g0 as i32) - (g1 as i32);
    let db = (b0 as i32) - (b1 as i32);
    (dr * dr) + (dg * dg) + (db * db)
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

    let r6 = ((r as u16 * 5) + 127) / 255;
    let g6 = ((g as u16 * 5) + 127) / 255;
    let b6 = ((b as u16 * 5) + 127) / 255;

    let cube_idx = 16 + (36 * r6 as u8) + (6 * g6 as u8) + (b6 as u8);
    let cube_dist = dist2(
        r,
        g,
        b,
        CUBE_LEVELS[r6 as usize],
        CUBE_LEVELS[g6 as usize],
        CUBE_LEVELS[b6 as usize],
    );

    let avg = ((r as u16 + g as u16 + b as u16) / 3) as u8;
    let (gray_idx, level) = if avg < 8 {
        (16, 0)
    } else if avg > 238 {
        (231, 255)
    } else {
        let step = (avg - 8) / 10;
        (232 + step, 8 + 10 * step)
    };
    let gray_dist = dist2(r, g, b, level, level, level);

    if gray_dist < cube_dist {
        gray_idx
    } else {
        cube_idx
    }
}

fn rgb_to_color16(r: u8, g: u8, b: u8) -> Color {
    const TABLE: [(Color, (u8, u8, u8)); 16] = [
        (Color::Black, (0, 0, 0)),
        (Color::DarkGrey, (128, 128, 128)),
        (Color::Grey, (192, 192, 192)),
        (Color::White, (255, 255, 255)),
        (Color::DarkRed, (128, 0, 0)),
        (Color::Red, (255, 0, 0)),
        (Color::DarkGreen, (0, 128, 0)),
        (Color::Green, (0, 255, 0)),
        (Color::DarkBlue, (0, 0, 128)),
        (Color::Blue, (0, 0, 255)),
        (Color::DarkCyan, (0, 128, 128)),
        (Color::Cyan, (0, 255, 255)),
        (Color::DarkMagenta, (128, 0, 128)),
        (Color::Magenta, (255, 0, 255)),
        (Color::DarkYellow, (128, 128, 0)),
        (Color::Yellow, (255, 255, 0)),
    ];

    let mut best = Color::White;
    let mut best_d = i32::MAX;
    for (c, (cr, cg, cb)) in TABLE {
        let d = dist2(r, g, b, cr, cg, cb);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

/// The four colors the rain reads on every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RainColors {
    pub leading_fill: Rgb,
    pub leading_shadow: Rgb,
    pub trail_fill: Rgb,
    pub trail_shadow: Rgb,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Green,
    Amber,
    Ice,
    Crimson,
    Violet,
    Ghost,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Green,
        Theme::Amber,
        Theme::Ice,
        Theme::Crimson,
        Theme::Violet,
        Theme::Ghost,
    ];

    pub fn colors(self) -> RainColors {
        let (lf, ls, tf, ts) = match self {
            Theme::Green => (
                (220, 255, 220),
                (120, 255, 140),
                (0, 255, 70),
                (0, 140, 40),
            ),
            Theme::Amber => ((255, 240, 200), (255, 176, 0), (255, 160, 0), (140, 70, 0)),
            Theme::Ice => (
                (235, 250, 255),
                (120, 200, 255),
                (80, 180, 255),
                (20, 70, 140),
            ),
            Theme::Crimson => ((255, 220, 220), (255, 60, 60), (220, 20, 40), (110, 0, 20)),
            Theme::Violet => (
                (245, 225, 255),
                (190, 110, 255),
                (160, 80, 255),
                (70, 20, 130),
            ),
            Theme::Ghost => (
                (255, 255, 255),
                (200, 200, 200),
                (170, 170, 170),
                (80, 80, 80),
            ),
        };
        let rgb = |(r, g, b): (u8, u8, u8)| Rgb::new(r, g, b);
        RainColors {
            leading_fill: rgb(lf),
            leading_shadow: rgb(ls),
            trail_fill: rgb(tf),
            trail_shadow: rgb(ts),
        }
    }

    pub fn next(self) -> Theme {
        let i = Theme::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Theme::ALL[(i + 1) % Theme::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Green => "green",
            Theme::Amber => "amber",
            Theme::Ice => "ice",
            Theme::Crimson => "crimson",
            Theme::Violet => "violet",
            Theme::Ghost => "ghost",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Theme::Green => "Classic phosphor green",
            Theme::Amber => "Amber monitor",
            Theme::Ice => "Cold blue",
            Theme::Crimson => "Deep red",
            Theme::Violet => "Purple haze",
            Theme::Ghost => "Grayscale",
        }
    }
}
