// Copyright (c) 2026 rezky_nightky

use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::charset::{
    charset_from_str, expand_user_ranges, parse_user_hex_chars, Charset, Selection, CATALOG,
};
use crate::color::{ColorMode, RainColors, Rgb, Theme};

pub const DEFAULT_FONT_SIZE: f32 = 21.0;
pub const DEFAULT_TRAIL_LENGTH: usize = 7;
pub const DEFAULT_DENSITY: f32 = 8.0;

pub const FONT_SIZE_RANGE: (f32, f32) = (1.0, 100.0);
pub const TRAIL_LENGTH_RANGE: (usize, usize) = (0, 64);
pub const DENSITY_RANGE: (f32, f32) = (0.01, 32.0);
pub const FPS_RANGE: (f64, f64) = (1.0, 240.0);

pub const DEFAULT_PARAMS_USAGE: &str = "DEFAULT PARAMS USAGE:\n  glyphrain --font-size 21 --trail-length 7 --density 8 --charset katakana,latin,numbers --theme green --cell-size 10x20 --fps 60";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("failed to apply {name} {value} (must be a finite number)")]
    NotFinite { name: &'static str, value: f64 },
    #[error("failed to apply {name} {value} (min {min} max {max})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{0}")]
    Invalid(String),
}

fn require_range(name: &'static str, v: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if !v.is_finite() {
        return Err(ConfigError::NotFinite { name, value: v });
    }
    if v < min || v > max {
        return Err(ConfigError::OutOfRange {
            name,
            value: v,
            min,
            max,
        });
    }
    Ok(v)
}

pub fn color_enabled_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(std::env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn colorize_usage(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 32);
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if let Some(rest) = line.strip_prefix("  glyphrain") {
            out.push_str("  \x1b[1;34mglyphrain\x1b[0m");
            out.push_str(rest);
        } else if line.ends_with(':') && line == line.to_ascii_uppercase() {
            out.push_str("\x1b[1;36m");
            out.push_str(line);
            out.push_str("\x1b[0m");
        } else {
            out.push_str(line);
        }
    }
    out
}

pub fn default_params_usage_for_help() -> String {
    if color_enabled_stdout() {
        colorize_usage(DEFAULT_PARAMS_USAGE)
    } else {
        DEFAULT_PARAMS_USAGE.to_string()
    }
}

/// Virtual pixel size of one terminal cell, written `WxH`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl FromStr for CellSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| "expected: WIDTHxHEIGHT".to_string())?;
        let width: f32 = a
            .trim()
            .parse()
            .map_err(|_| "invalid width value".to_string())?;
        let height: f32 = b
            .trim()
            .parse()
            .map_err(|_| "invalid height value".to_string())?;
        if !(width.is_finite() && height.is_finite()) || width < 1.0 || height < 1.0 {
            return Err("cell size must be at least 1x1".to_string());
        }
        Ok(Self { width, height })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "glyphrain", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        long = "font-size",
        default_value_t = DEFAULT_FONT_SIZE,
        help_heading = "RAIN",
        help = "Glyph size and fall step in pixels (min 1 max 100)"
    )]
    pub font_size: f32,

    #[arg(
        long = "trail-length",
        default_value_t = DEFAULT_TRAIL_LENGTH,
        help_heading = "RAIN",
        help = "Glyphs trailing behind each head (min 0 max 64)"
    )]
    pub trail_length: usize,

    #[arg(
        short = 'd',
        long = "density",
        default_value_t = DEFAULT_DENSITY,
        help_heading = "RAIN",
        help = "Columns per font-size wide strip (min 0.01 max 32)"
    )]
    pub density: f32,

    #[arg(
        long = "charset",
        default_value = "katakana,latin,numbers",
        help_heading = "CHARSET",
        help = "Comma separated character sets (see --list-charsets)"
    )]
    pub charset: String,

    #[arg(
        long = "chars",
        help_heading = "CHARSET",
        help = "Extra code point ranges in hex: LOW,HIGH[,LOW,HIGH...]"
    )]
    pub chars: Option<String>,

    #[arg(
        short = 'c',
        long = "theme",
        default_value_t = Theme::Green,
        value_enum,
        help_heading = "APPEARANCE",
        help = "Color theme (see --list-themes)"
    )]
    pub theme: Theme,

    #[arg(
        long = "lead-color",
        help_heading = "APPEARANCE",
        help = "Head glyph color: r,g,b or #rrggbb"
    )]
    pub lead_color: Option<Rgb>,

    #[arg(
        long = "lead-glow",
        help_heading = "APPEARANCE",
        help = "Head glow color: r,g,b or #rrggbb"
    )]
    pub lead_glow: Option<Rgb>,

    #[arg(
        long = "trail-color",
        help_heading = "APPEARANCE",
        help = "Trail glyph color: r,g,b or #rrggbb"
    )]
    pub trail_color: Option<Rgb>,

    #[arg(
        long = "trail-glow",
        help_heading = "APPEARANCE",
        help = "Trail glow color: r,g,b or #rrggbb"
    )]
    pub trail_glow: Option<Rgb>,

    #[arg(
        long = "cell-size",
        default_value = "10x20",
        help_heading = "APPEARANCE",
        help = "Pixel size of one terminal cell: WIDTHxHEIGHT"
    )]
    pub cell_size: CellSize,

    #[arg(
        long = "no-mirror",
        help_heading = "APPEARANCE",
        help = "Draw glyphs left to right instead of mirrored"
    )]
    pub no_mirror: bool,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force color mode (allowed: 0,16,8/256,24/32). Default: detected from COLORTERM/TERM"
    )]
    pub colormode: Option<u16>,

    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = 60.0,
        help_heading = "PERFORMANCE",
        help = "Refresh rate the frame loop paces to (min 1 max 240)"
    )]
    pub fps: f64,

    #[arg(
        long = "fps-counter",
        help_heading = "PERFORMANCE",
        help = "Show the measured frame rate in the top right corner"
    )]
    pub fps_counter: bool,

    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (min 0.1 max 86400; <=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        short = 's',
        long = "screensaver",
        help_heading = "GENERAL",
        help = "Screensaver mode (exit on keypress)"
    )]
    pub screensaver: bool,

    #[arg(
        long = "log-file",
        help_heading = "GENERAL",
        help = "Write logs to this file (filter with RUST_LOG)"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "check-bitcolor",
        help_heading = "HELP",
        help = "Print detected terminal color capability and exit"
    )]
    pub check_bitcolor: bool,

    #[arg(
        long = "list-charsets",
        help_heading = "HELP",
        help = "List available character sets and exit"
    )]
    pub list_charsets: bool,

    #[arg(
        long = "list-themes",
        help_heading = "HELP",
        help = "List available color themes and exit"
    )]
    pub list_themes: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'v',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

/// Everything the rain field reads. Layout inputs (`font_size`,
/// `trail_length`, `density`) force a rebuild when they change; the glyph
/// pool and colors are read live on every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RainConfig {
    pub font_size: f32,
    pub trail_length: usize,
    pub density: f32,
    pub chars: Vec<char>,
    pub leading_fill: Rgb,
    pub leading_shadow: Rgb,
    pub trail_fill: Rgb,
    pub trail_shadow: Rgb,
    pub fps_counter_visible: bool,
}

impl Default for RainConfig {
    fn default() -> Self {
        let sets: Vec<&Charset> = ["katakana", "latin", "numbers"]
            .iter()
            .filter_map(|n| charset_from_str(n).ok())
            .collect();
        let mut cfg = Self {
            font_size: DEFAULT_FONT_SIZE,
            trail_length: DEFAULT_TRAIL_LENGTH,
            density: DEFAULT_DENSITY,
            chars: Selection::new(&sets, &[]).pool(),
            leading_fill: Rgb::new(0, 0, 0),
            leading_shadow: Rgb::new(0, 0, 0),
            trail_fill: Rgb::new(0, 0, 0),
            trail_shadow: Rgb::new(0, 0, 0),
            fps_counter_visible: false,
        };
        cfg.set_colors(Theme::Green.colors());
        cfg
    }
}

impl RainConfig {
    /// How far past the bottom edge a head travels before wrapping, so the
    /// whole trail leaves the screen first.
    pub fn bottom_margin(&self) -> f32 {
        self.font_size * (self.trail_length as f32 + 1.0)
    }

    pub fn set_colors(&mut self, colors: RainColors) {
        self.leading_fill = colors.leading_fill;
        self.leading_shadow = colors.leading_shadow;
        self.trail_fill = colors.trail_fill;
        self.trail_shadow = colors.trail_shadow;
    }

    pub fn colors(&self) -> RainColors {
        RainColors {
            leading_fill: self.leading_fill,
            leading_shadow: self.leading_shadow,
            trail_fill: self.trail_fill,
            trail_shadow: self.trail_shadow,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_range(
            "--font-size",
            self.font_size as f64,
            FONT_SIZE_RANGE.0 as f64,
            FONT_SIZE_RANGE.1 as f64,
        )?;
        require_range(
            "--trail-length",
            self.trail_length as f64,
            TRAIL_LENGTH_RANGE.0 as f64,
            TRAIL_LENGTH_RANGE.1 as f64,
        )?;
        require_range(
            "--density",
            self.density as f64,
            DENSITY_RANGE.0 as f64,
            DENSITY_RANGE.1 as f64,
        )?;
        if self.chars.is_empty() {
            return Err(ConfigError::Invalid("character pool is empty".to_string()));
        }
        Ok(())
    }
}

/// Resolved command line.
#[derive(Clone, Debug)]
pub struct Settings {
    pub rain: RainConfig,
    pub theme: Theme,
    pub selection: Selection,
    pub cell_size: CellSize,
    pub mirror: bool,
    pub color_mode: ColorMode,
    pub fps: f64,
    pub duration: Option<Duration>,
    pub screensaver: bool,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut sets = Vec::new();
        for name in args.charset.split(',').filter(|n| !n.trim().is_empty()) {
            sets.push(charset_from_str(name).map_err(ConfigError::Invalid)?);
        }

        let mut extra = Vec::new();
        if let Some(ranges) = &args.chars {
            let list = parse_user_hex_chars(ranges).map_err(ConfigError::Invalid)?;
            extra = expand_user_ranges(&list).map_err(ConfigError::Invalid)?;
        }

        let selection = Selection::new(&sets, &extra);

        let mut colors = args.theme.colors();
        if let Some(c) = args.lead_color {
            colors.leading_fill = c;
        }
        if let Some(c) = args.lead_glow {
            colors.leading_shadow = c;
        }
        if let Some(c) = args.trail_color {
            colors.trail_fill = c;
        }
        if let Some(c) = args.trail_glow {
            colors.trail_shadow = c;
        }

        let mut rain = RainConfig {
            font_size: args.font_size,
            trail_length: args.trail_length,
            density: args.density,
            chars: selection.pool(),
            fps_counter_visible: args.fps_counter,
            ..RainConfig::default()
        };
        rain.set_colors(colors);
        rain.validate()?;

        let color_mode = match args.colormode {
            Some(bits) => ColorMode::from_bits(bits).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "invalid --colormode: {} (allowed: 0,16,8,256,24,32)",
                    bits
                ))
            })?,
            None => ColorMode::detect(),
        };

        let fps = require_range("--fps", args.fps, FPS_RANGE.0, FPS_RANGE.1)?;

        let duration = match args.duration {
            Some(s) if !s.is_finite() => return Err(ConfigError::NotFinite {
                name: "--duration",
                value: s,
            }),
            Some(s) if s > 0.0 => Some(Duration::from_secs_f64(require_range(
                "--duration",
                s,
                0.1,
                86400.0,
            )?)),
            _ => None,
        };

        Ok(Self {
            rain,
            theme: args.theme,
            selection,
            cell_size: args.cell_size,
            mirror: !args.no_mirror,
            color_mode,
            fps,
            duration,
            screensaver: args.screensaver,
        })
    }
}

pub fn print_list_charsets() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mAVAILABLE CHARACTER SETS:\x1b[0m");
        println!("\x1b[2mNOTE: Combine names with commas: --charset latin,greek\x1b[0m");
    } else {
        println!("AVAILABLE CHARACTER SETS:");
        println!("NOTE: Combine names with commas: --charset latin,greek");
    }
    println!();
    println!("KEY  VALUE      SYMBOL  GLYPHS");
    for (i, set) in CATALOG.iter().enumerate() {
        println!(
            "{:<4} {:<10} {:<7} {}",
            i + 1,
            set.name,
            set.symbol,
            set.glyphs.len()
        );
    }
}

pub fn print_list_themes() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mAVAILABLE COLOR THEMES:\x1b[0m");
    } else {
        println!("AVAILABLE COLOR THEMES:");
    }
    println!();
    println!("VALUE      DESCRIPTION");
    for theme in Theme::ALL {
        println!("{:<10} {}", theme.name(), theme.description());
    }
}
