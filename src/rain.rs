// Copyright (c) 2026 rezky_nightky

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};

use crate::charset::FALLBACK_GLYPH;
use crate::color::Rgb;
use crate::config::RainConfig;
use crate::surface::{DrawTarget, GlyphPaint, Surface, Viewport};

/// Shortest and longest per-column advance interval, in milliseconds.
pub const UPDATE_STEP_MS: (u64, u64) = (100, 500);

pub const FADE_COLOR: Rgb = Rgb::new(5, 16, 1);
pub const FADE_ALPHA: f32 = 0.75;

pub const HEAD_BLUR: f32 = 12.0;
pub const TRAIL_BLUR: f32 = 4.0;

/// Peak trail opacity in percent.
const TRAIL_OPACITY_MAX: f32 = 30.0;

/// One falling lane of glyphs.
#[derive(Clone, Debug, PartialEq)]
pub struct RainColumn {
    pub x: f32,
    /// Baseline of the head glyph.
    pub y: f32,
    pub head: char,
    /// Previous heads, nearest to the head first.
    pub trail: VecDeque<char>,
    pub update_step: Duration,
    pub last_update: Instant,
}

/// Inputs that decide how many columns exist and where they sit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub viewport: Viewport,
    pub font_size: f32,
    pub density: f32,
    pub trail_length: usize,
}

impl Layout {
    pub fn of(viewport: Viewport, config: &RainConfig) -> Self {
        Self {
            viewport,
            font_size: config.font_size,
            density: config.density,
            trail_length: config.trail_length,
        }
    }

    pub fn column_count(&self) -> usize {
        column_count(self.density, self.viewport.width, self.font_size)
    }

    /// Horizontal distance between neighbouring columns, `None` when the
    /// layout has no columns.
    pub fn spacing(&self) -> Option<f32> {
        match self.column_count() {
            0 => None,
            n => Some(self.viewport.width / n as f32),
        }
    }
}

/// `floor(density * floor(width / font_size))`, or 0 for any input that
/// would divide by zero or go negative.
pub fn column_count(density: f32, width: f32, font_size: f32) -> usize {
    if !(font_size > 0.0 && density > 0.0 && width > 0.0) {
        return 0;
    }
    let n = (density * (width / font_size).floor()).floor();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

/// Opacity in percent of trail glyph `i` (0 is nearest the head).
pub fn trail_opacity(i: usize, trail_length: usize) -> f32 {
    if trail_length == 0 || i >= trail_length {
        return 0.0;
    }
    TRAIL_OPACITY_MAX * (trail_length - (i + 1)) as f32 / trail_length as f32
}

pub fn random_glyph<R: Rng + ?Sized>(pool: &[char], rng: &mut R) -> char {
    pool.choose(rng).copied().unwrap_or(FALLBACK_GLYPH)
}

pub fn new_column<R: Rng + ?Sized>(
    x: f32,
    layout: &Layout,
    config: &RainConfig,
    now: Instant,
    rng: &mut R,
) -> RainColumn {
    let max_y = layout.viewport.height.floor().max(0.0) as u32;
    RainColumn {
        x,
        y: rng.random_range(0..=max_y) as f32,
        head: random_glyph(&config.chars, rng),
        trail: (0..layout.trail_length)
            .map(|_| random_glyph(&config.chars, rng))
            .collect(),
        update_step: Duration::from_millis(rng.random_range(UPDATE_STEP_MS.0..=UPDATE_STEP_MS.1)),
        last_update: now,
    }
}

/// Advances `column` by one glyph if its own interval has elapsed.
/// Returns whether the column moved.
pub fn tick<R: Rng + ?Sized>(
    column: &mut RainColumn,
    now: Instant,
    config: &RainConfig,
    viewport_height: f32,
    rng: &mut R,
) -> bool {
    if now.saturating_duration_since(column.last_update) < column.update_step {
        return false;
    }
    column.last_update = now;

    let previous = std::mem::replace(&mut column.head, random_glyph(&config.chars, rng));

    if column.y > viewport_height + config.bottom_margin() {
        column.y = -config.font_size;
    }
    column.y += config.font_size;

    if column.trail.pop_back().is_some() {
        column.trail.push_front(previous);
    }
    true
}

pub fn head_paint(config: &RainConfig) -> GlyphPaint {
    GlyphPaint {
        fill: config.leading_fill,
        alpha: 1.0,
        shadow: config.leading_shadow,
        blur: HEAD_BLUR,
        font_size: config.font_size,
    }
}

pub fn trail_paint(config: &RainConfig, i: usize, trail_length: usize) -> GlyphPaint {
    GlyphPaint {
        fill: config.trail_fill,
        alpha: trail_opacity(i, trail_length) / 100.0,
        shadow: config.trail_shadow,
        blur: TRAIL_BLUR,
        font_size: config.font_size,
    }
}

pub fn render<S: Surface + ?Sized>(column: &RainColumn, surface: &mut S, config: &RainConfig) {
    surface.fill_glyph(column.head, column.x, column.y, &head_paint(config));

    let len = column.trail.len();
    for (i, &glyph) in column.trail.iter().enumerate() {
        let y = column.y - config.font_size * (i + 1) as f32;
        surface.fill_glyph(glyph, column.x, y, &trail_paint(config, i, len));
    }
}

/// The full set of columns for one layout.
pub struct RainField {
    layout: Layout,
    columns: Vec<RainColumn>,
    rng: StdRng,
}

impl RainField {
    pub fn new(viewport: Viewport, config: &RainConfig, now: Instant) -> Self {
        Self::with_rng(viewport, config, now, StdRng::from_os_rng())
    }

    pub fn with_rng(viewport: Viewport, config: &RainConfig, now: Instant, rng: StdRng) -> Self {
        let mut field = Self {
            layout: Layout::of(viewport, config),
            columns: Vec::new(),
            rng,
        };
        field.rebuild(config, now);
        field
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn columns(&self) -> &[RainColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Rebuilds the field if the viewport or a layout input changed since
    /// it was built. Returns whether a rebuild happened.
    pub fn sync(&mut self, viewport: Viewport, config: &RainConfig, now: Instant) -> bool {
        let layout = Layout::of(viewport, config);
        if layout == self.layout {
            return false;
        }
        log::debug!(
            "layout changed: {}x{} font {} density {} trail {}",
            viewport.width,
            viewport.height,
            config.font_size,
            config.density,
            config.trail_length
        );
        self.layout = layout;
        self.rebuild(config, now);
        true
    }

    /// Discards every column and creates a fresh set for the current layout.
    pub fn rebuild(&mut self, config: &RainConfig, now: Instant) {
        let layout = self.layout;
        let columns: Vec<RainColumn> = match layout.spacing() {
            None => Vec::new(),
            Some(spacing) => (0..layout.column_count())
                .map(|i| new_column(spacing * (i + 1) as f32, &layout, config, now, &mut self.rng))
                .collect(),
        };
        log::debug!("rain field rebuilt with {} columns", columns.len());
        self.columns = columns;
    }

    /// Returns how many columns advanced.
    pub fn tick(&mut self, now: Instant, config: &RainConfig) -> usize {
        let height = self.layout.viewport.height;
        let mut moved = 0;
        for column in &mut self.columns {
            if tick(column, now, config, height, &mut self.rng) {
                moved += 1;
            }
        }
        moved
    }

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S, config: &RainConfig) {
        if self.columns.is_empty() {
            return;
        }
        surface.fade(FADE_COLOR, FADE_ALPHA);
        for column in &self.columns {
            render(column, surface, config);
        }
    }

    /// Ticks and renders one frame, or does nothing when the target has no
    /// surface yet.
    pub fn frame<T: DrawTarget + ?Sized>(&mut self, now: Instant, target: &mut T, config: &RainConfig) {
        let surface = match target.context() {
            Ok(s) => s,
            Err(e) => {
                log::trace!("skipping frame: {}", e);
                return;
            }
        };
        self.tick(now, config);
        self.render(surface, config);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::surface::SurfaceError;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Fade(Rgb, f32),
        Glyph(char, f32, f32, GlyphPaint),
    }

    #[derive(Default)]
    struct Recorder {
        viewport: Viewport,
        calls: Vec<Call>,
        ready: bool,
    }

    impl Surface for Recorder {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        fn fade(&mut self, color: Rgb, alpha: f32) {
            self.calls.push(Call::Fade(color, alpha));
        }

        fn fill_glyph(&mut self, glyph: char, x: f32, y: f32, paint: &GlyphPaint) {
            self.calls.push(Call::Glyph(glyph, x, y, *paint));
        }
    }

    impl DrawTarget for Recorder {
        fn context(&mut self) -> Result<&mut dyn Surface, SurfaceError> {
            if self.ready {
                Ok(self)
            } else {
                Err(SurfaceError::Unavailable)
            }
        }
    }

    fn config(font_size: f32, trail_length: usize, density: f32) -> RainConfig {
        RainConfig {
            font_size,
            trail_length,
            density,
            chars: vec!['a', 'b', 'c'],
            ..RainConfig::default()
        }
    }

    fn field(viewport: Viewport, cfg: &RainConfig, now: Instant) -> RainField {
        RainField::with_rng(viewport, cfg, now, StdRng::seed_from_u64(7))
    }

    fn column(y: f32, trail: &[char], now: Instant) -> RainColumn {
        RainColumn {
            x: 10.0,
            y,
            head: 'h',
            trail: trail.iter().copied().collect(),
            update_step: Duration::from_millis(200),
            last_update: now,
        }
    }

    #[test]
    fn column_count_follows_density_and_font_size() {
        assert_eq!(column_count(8.0, 1600.0, 20.0), 640);
        assert_eq!(column_count(1.5, 100.0, 30.0), 4);
        assert_eq!(column_count(0.0, 1600.0, 20.0), 0);
        assert_eq!(column_count(8.0, 0.0, 20.0), 0);
        assert_eq!(column_count(8.0, 1600.0, 0.0), 0);
        assert_eq!(column_count(8.0, 10.0, 20.0), 0);
        assert_eq!(column_count(f32::NAN, 10.0, 20.0), 0);
    }

    #[test]
    fn trail_opacity_falls_off_linearly() {
        assert!((trail_opacity(0, 7) - 30.0 * 6.0 / 7.0).abs() < 1e-4);
        assert!((trail_opacity(0, 7) - 25.714).abs() < 1e-3);
        assert_eq!(trail_opacity(6, 7), 0.0);
        assert_eq!(trail_opacity(0, 0), 0.0);
    }

    #[test]
    fn columns_are_evenly_spaced_across_the_width() {
        let now = Instant::now();
        let cfg = config(20.0, 3, 1.0);
        let f = field(Viewport::new(100.0, 200.0), &cfg, now);

        let xs: Vec<f32> = f.columns().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![20.0, 40.0, 60.0, 80.0, 100.0]);
        for c in f.columns() {
            assert!(c.y >= 0.0 && c.y <= 200.0);
            assert_eq!(c.trail.len(), 3);
            assert!(c.update_step >= Duration::from_millis(100));
            assert!(c.update_step <= Duration::from_millis(500));
            assert_eq!(c.last_update, now);
        }
    }

    #[test]
    fn tick_is_gated_by_the_columns_own_step() {
        let now = Instant::now();
        let cfg = config(10.0, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = column(50.0, &['x', 'y'], now);
        let before = c.clone();

        assert!(!tick(&mut c, now + Duration::from_millis(199), &cfg, 100.0, &mut rng));
        assert_eq!(c, before);

        let later = now + Duration::from_millis(200);
        assert!(tick(&mut c, later, &cfg, 100.0, &mut rng));
        assert_eq!(c.last_update, later);
        assert_eq!(c.y, 60.0);
        assert_eq!(c.trail, VecDeque::from(vec!['h', 'x']));
        assert!(cfg.chars.contains(&c.head));

        // The step restarts from the last advance.
        assert!(!tick(&mut c, later + Duration::from_millis(150), &cfg, 100.0, &mut rng));
    }

    #[test]
    fn tick_wraps_below_the_bottom_margin() {
        let now = Instant::now();
        let cfg = config(10.0, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let step = Duration::from_millis(200);

        // bottom margin is 30, so 130 is the last height that keeps falling.
        let mut c = column(130.0, &['x', 'y'], now);
        tick(&mut c, now + step, &cfg, 100.0, &mut rng);
        assert_eq!(c.y, 140.0);

        tick(&mut c, now + step * 2, &cfg, 100.0, &mut rng);
        assert_eq!(c.y, 0.0);
    }

    #[test]
    fn empty_trail_stays_empty() {
        let now = Instant::now();
        let cfg = config(10.0, 0, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut c = column(0.0, &[], now);
        assert!(tick(&mut c, now + Duration::from_secs(1), &cfg, 100.0, &mut rng));
        assert!(c.trail.is_empty());
    }

    #[test]
    fn new_heads_come_from_the_live_pool_while_trails_keep_history() {
        let now = Instant::now();
        let mut cfg = config(10.0, 4, 1.0);
        let mut f = field(Viewport::new(100.0, 100.0), &cfg, now);
        let positions: Vec<f32> = f.columns().iter().map(|c| c.x).collect();

        cfg.chars = vec!['Z'];
        cfg.trail_fill = Rgb::new(1, 2, 3);
        assert!(!f.sync(Viewport::new(100.0, 100.0), &cfg, now));

        f.tick(now + Duration::from_secs(1), &cfg);
        for c in f.columns() {
            assert_eq!(c.head, 'Z');
            assert!(['a', 'b', 'c'].contains(&c.trail[0]));
        }
        let after: Vec<f32> = f.columns().iter().map(|c| c.x).collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn layout_changes_rebuild_the_field() {
        let now = Instant::now();
        let vp = Viewport::new(100.0, 100.0);
        let mut cfg = config(10.0, 2, 1.0);
        let mut f = field(vp, &cfg, now);
        assert_eq!(f.columns().len(), 10);

        cfg.trail_length = 5;
        assert!(f.sync(vp, &cfg, now));
        assert!(f.columns().iter().all(|c| c.trail.len() == 5));

        cfg.density = 2.0;
        assert!(f.sync(vp, &cfg, now));
        assert_eq!(f.columns().len(), 20);

        cfg.font_size = 20.0;
        assert!(f.sync(vp, &cfg, now));
        assert_eq!(f.columns().len(), 10);

        assert!(f.sync(Viewport::new(40.0, 100.0), &cfg, now));
        assert_eq!(f.columns().len(), 4);
        assert_eq!(f.layout().viewport.width, 40.0);
    }

    #[test]
    fn render_fades_then_draws_head_and_trail() {
        let now = Instant::now();
        let cfg = config(10.0, 2, 1.0);
        let mut f = field(Viewport::new(10.0, 100.0), &cfg, now);
        assert_eq!(f.columns().len(), 1);
        f.columns[0] = column(50.0, &['x', 'y'], now);

        let mut r = Recorder {
            viewport: Viewport::new(10.0, 100.0),
            ..Recorder::default()
        };
        f.render(&mut r, &cfg);

        let want = vec![
            Call::Fade(FADE_COLOR, FADE_ALPHA),
            Call::Glyph('h', 10.0, 50.0, head_paint(&cfg)),
            Call::Glyph('x', 10.0, 40.0, trail_paint(&cfg, 0, 2)),
            Call::Glyph('y', 10.0, 30.0, trail_paint(&cfg, 1, 2)),
        ];
        assert_eq!(r.calls, want);

        let Call::Glyph(_, _, _, head) = &r.calls[1] else {
            unreachable!()
        };
        assert_eq!(head.alpha, 1.0);
        assert_eq!(head.blur, 12.0);
        assert_eq!(head.fill, cfg.leading_fill);
        assert_eq!(head.shadow, cfg.leading_shadow);

        let Call::Glyph(_, _, _, near) = &r.calls[2] else {
            unreachable!()
        };
        assert!((near.alpha - 0.15).abs() < 1e-6);
        assert_eq!(near.blur, 4.0);
        assert_eq!(near.fill, cfg.trail_fill);
    }

    #[test]
    fn empty_field_draws_nothing() {
        let now = Instant::now();
        let cfg = config(20.0, 3, 8.0);
        let mut f = field(Viewport::new(0.0, 0.0), &cfg, now);
        assert!(f.is_empty());

        let mut r = Recorder {
            ready: true,
            ..Recorder::default()
        };
        f.frame(now + Duration::from_secs(1), &mut r, &cfg);
        assert!(r.calls.is_empty());
    }

    #[test]
    fn unavailable_surface_skips_tick_and_render() {
        let now = Instant::now();
        let cfg = config(10.0, 2, 1.0);
        let mut f = field(Viewport::new(100.0, 100.0), &cfg, now);
        let before = f.columns().to_vec();

        let mut r = Recorder::default();
        f.frame(now + Duration::from_secs(1), &mut r, &cfg);
        assert!(r.calls.is_empty());
        assert_eq!(f.columns(), before.as_slice());

        r.ready = true;
        f.frame(now + Duration::from_secs(1), &mut r, &cfg);
        assert_eq!(r.calls.len(), 1 + 10 * 3);
        assert_ne!(f.columns(), before.as_slice());
    }

    #[test]
    fn empty_pool_uses_fallback_glyph() {
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(random_glyph(&[], &mut rng), FALLBACK_GLYPH);
    }

    proptest! {
        #[test]
        fn ticks_preserve_trail_length_pool_and_bounds(
            seed in any::<u64>(),
            trail_length in 0usize..12,
            font_size in 1.0f32..40.0,
            height in 0.0f32..400.0,
            steps in prop::collection::vec(0u64..700, 1..80),
        ) {
            let now = Instant::now();
            let cfg = RainConfig {
                font_size,
                trail_length,
                density: 1.0,
                chars: vec!['p', 'q'],
                ..RainConfig::default()
            };
            let mut f = RainField::with_rng(
                Viewport::new(200.0, height),
                &cfg,
                now,
                StdRng::seed_from_u64(seed),
            );
            let limit = height + cfg.bottom_margin();

            let mut t = now;
            for ms in steps {
                t += Duration::from_millis(ms);
                let before = f.columns().to_vec();
                f.tick(t, &cfg);
                for (old, new) in before.iter().zip(f.columns()) {
                    prop_assert_eq!(new.trail.len(), trail_length);
                    prop_assert!(cfg.chars.contains(&new.head));
                    prop_assert!(new.trail.iter().all(|g| cfg.chars.contains(g)));
                    prop_assert_eq!(new.x, old.x);
                    if t.saturating_duration_since(old.last_update) < old.update_step {
                        prop_assert_eq!(new, old);
                    } else if old.y > limit {
                        prop_assert_eq!(new.y, 0.0);
                    } else {
                        prop_assert_eq!(new.y, old.y + font_size);
                        prop_assert!(new.y <= limit + font_size);
                    }
                }
            }
        }
    }
}
