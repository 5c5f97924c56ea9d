// Copyright (c) 2026 rezky_nightky

use std::io;
use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::canvas::Canvas;
use crate::charset::{Selection, CATALOG};
use crate::color::{ColorMode, Theme};
use crate::config::{
    RainConfig, Settings, DENSITY_RANGE, FONT_SIZE_RANGE, FPS_RANGE, TRAIL_LENGTH_RANGE,
};
use crate::error::Result;
use crate::frame::Frame;
use crate::overlay::FpsCounter;
use crate::rain::RainField;
use crate::scheduler::{FpsSink, FrameHost, FrameScheduler};
use crate::surface::Surface;
use crate::terminal::{EventSource, Terminal, TerminalHost};

const DENSITY_STEP: f32 = 0.5;
const FPS_STEP: f64 = 10.0;

/// What the frame loop should do after input was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    None,
    Rebuild,
    Restart,
    Quit,
}

/// The values the keyboard can change while running.
#[derive(Clone, Debug)]
pub struct Controls {
    pub rain: RainConfig,
    pub theme: Theme,
    pub selection: Selection,
    pub fps: f64,
    pub screensaver: bool,
}

impl Controls {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rain: settings.rain.clone(),
            theme: settings.theme,
            selection: settings.selection.clone(),
            fps: settings.fps,
            screensaver: settings.screensaver,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Command {
        if key.kind != KeyEventKind::Press {
            return Command::None;
        }
        if self.screensaver {
            return Command::Quit;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) | (KeyCode::Char('q'), _) => return Command::Quit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Command::Quit,
            (KeyCode::Char(' '), _) => return Command::Rebuild,
            (KeyCode::Up, _) => {
                self.rain.font_size = (self.rain.font_size + 1.0).min(FONT_SIZE_RANGE.1);
            }
            (KeyCode::Down, _) => {
                self.rain.font_size = (self.rain.font_size - 1.0).max(FONT_SIZE_RANGE.0);
            }
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => {
                self.rain.density = (self.rain.density + DENSITY_STEP).min(DENSITY_RANGE.1);
            }
            (KeyCode::Char('-'), _) => {
                self.rain.density = (self.rain.density - DENSITY_STEP).max(DENSITY_RANGE.0);
            }
            (KeyCode::Char(']'), _) => {
                self.rain.trail_length = (self.rain.trail_length + 1).min(TRAIL_LENGTH_RANGE.1);
            }
            (KeyCode::Char('['), _) => {
                self.rain.trail_length = self
                    .rain
                    .trail_length
                    .saturating_sub(1)
                    .max(TRAIL_LENGTH_RANGE.0);
            }
            (KeyCode::Char(c @ '1'..='8'), _) => {
                let idx = c as usize - '1' as usize;
                if let Some(set) = CATALOG.get(idx) {
                    self.selection.toggle(set);
                    self.rain.chars = self.selection.pool();
                    log::debug!(
                        "charset {} {}",
                        set.name,
                        if self.selection.is_active(set) {
                            "on"
                        } else {
                            "off"
                        }
                    );
                }
            }
            (KeyCode::Char('t'), _) => {
                self.theme = self.theme.next();
                self.rain.set_colors(self.theme.colors());
                log::debug!("theme {}", self.theme.name());
            }
            (KeyCode::Char('f'), _) => {
                self.rain.fps_counter_visible = !self.rain.fps_counter_visible;
            }
            (KeyCode::Right, _) => return self.set_fps(self.fps + FPS_STEP),
            (KeyCode::Left, _) => return self.set_fps(self.fps - FPS_STEP),
            _ => {}
        }
        Command::None
    }

    fn set_fps(&mut self, fps: f64) -> Command {
        let fps = fps.clamp(FPS_RANGE.0, FPS_RANGE.1);
        if fps == self.fps {
            return Command::None;
        }
        self.fps = fps;
        log::debug!("refresh rate {}", fps);
        Command::Restart
    }
}

/// Everything drawn on one frame: the rain, its canvas and the character
/// grid handed to the terminal.
pub struct Scene {
    controls: Controls,
    canvas: Canvas,
    frame: Frame,
    field: RainField,
    counter: FpsCounter,
    mode: ColorMode,
}

impl Scene {
    pub fn new(settings: &Settings, cols: u16, rows: u16, sink: FpsSink, now: Instant) -> Self {
        let controls = Controls::from_settings(settings);
        let canvas = Canvas::new(cols, rows, settings.cell_size, settings.mirror);
        let field = RainField::new(canvas.viewport(), &controls.rain, now);
        Self {
            controls,
            canvas,
            frame: Frame::new(cols, rows),
            field,
            counter: FpsCounter::new(sink),
            mode: settings.color_mode,
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Applies one input event. Rebuilds and resizes happen here; the
    /// returned command tells the frame loop what is left to do.
    pub fn handle_event(&mut self, ev: Event, now: Instant) -> Command {
        match ev {
            Event::Resize(w, h) => {
                log::debug!("resize to {}x{}", w, h);
                self.canvas.resize(w, h);
                self.frame = Frame::new(w, h);
                Command::None
            }
            Event::Key(key) => {
                let command = self.controls.handle_key(key);
                if command == Command::Rebuild {
                    self.field.rebuild(&self.controls.rain, now);
                }
                command
            }
            _ => Command::None,
        }
    }

    /// Advances and paints the rain, leaving the result in the frame.
    pub fn step(&mut self, now: Instant) {
        let rain = &self.controls.rain;
        self.field.sync(self.canvas.viewport(), rain, now);
        self.field.frame(now, &mut self.canvas, rain);
        self.canvas.present(&mut self.frame, self.mode);
        if rain.fps_counter_visible {
            self.counter.poll(now);
            self.counter.draw(&mut self.frame, self.mode);
        }
    }
}

/// Runs frames until the user quits, the duration ends or the loop is
/// cancelled. `draw` receives the frame whenever it changed.
pub fn drive<H, D>(
    scene: &mut Scene,
    scheduler: &mut FrameScheduler,
    host: &mut H,
    end_time: Option<Instant>,
    mut draw: D,
) -> io::Result<()>
where
    H: FrameHost + EventSource,
    D: FnMut(&mut Frame) -> io::Result<()>,
{
    let mut frame_loop = scheduler.start(host.now());
    while let Some(now) = frame_loop.next_frame(host)? {
        if end_time.is_some_and(|end| now >= end) {
            log::info!("duration elapsed");
            scheduler.cancel();
            break;
        }

        let mut quit = false;
        let mut restart = false;
        for ev in host.take_events() {
            match scene.handle_event(ev, now) {
                Command::Quit => quit = true,
                Command::Restart => restart = true,
                Command::None | Command::Rebuild => {}
            }
        }
        if quit {
            scheduler.cancel();
            break;
        }

        scene.step(now);
        if scene.frame.has_changes() {
            draw(&mut scene.frame)?;
        }

        if restart {
            scheduler.set_refresh_rate(scene.controls.fps);
            frame_loop = scheduler.start(now + scheduler.period());
        }
    }
    Ok(())
}

/// Runs the rain in the terminal until the user quits or the duration ends.
pub fn run(settings: &Settings) -> Result<()> {
    settings.rain.validate()?;

    let mut terminal = Terminal::new()?;
    let (cols, rows) = terminal.size()?;
    let start = Instant::now();
    let sink = FpsSink::default();
    let mut scene = Scene::new(settings, cols, rows, sink.clone(), start);
    let mut scheduler = FrameScheduler::new(settings.fps, sink);
    let mut host = TerminalHost::default();
    let end_time = settings.duration.map(|d| start + d);

    log::info!(
        "raining on {}x{} cells, {} columns, {} color",
        cols,
        rows,
        scene.field.columns().len(),
        settings.color_mode.label()
    );

    drive(&mut scene, &mut scheduler, &mut host, end_time, |frame| {
        terminal.draw(frame)
    })?;

    log::info!("stopped after {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::charset::charset_from_str;
    use crate::config::Args;
    use crate::surface::Viewport;

    fn controls() -> Controls {
        let latin = charset_from_str("latin").unwrap();
        let selection = Selection::new(&[latin], &[]);
        Controls {
            rain: RainConfig {
                chars: selection.pool(),
                ..RainConfig::default()
            },
            theme: Theme::Green,
            selection,
            fps: 60.0,
            screensaver: false,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_and_rebuild_keys() {
        let mut c = controls();
        assert_eq!(c.handle_key(press(KeyCode::Char('q'))), Command::Quit);
        assert_eq!(c.handle_key(press(KeyCode::Esc)), Command::Quit);
        assert_eq!(
            c.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Command::Quit
        );
        assert_eq!(c.handle_key(press(KeyCode::Char(' '))), Command::Rebuild);
    }

    #[test]
    fn screensaver_quits_on_any_key() {
        let mut c = controls();
        c.screensaver = true;
        assert_eq!(c.handle_key(press(KeyCode::Char('x'))), Command::Quit);
    }

    #[test]
    fn layout_edits_stay_in_range() {
        let mut c = controls();
        c.handle_key(press(KeyCode::Up));
        assert_eq!(c.rain.font_size, 22.0);

        c.rain.font_size = FONT_SIZE_RANGE.0;
        c.handle_key(press(KeyCode::Down));
        assert_eq!(c.rain.font_size, FONT_SIZE_RANGE.0);

        c.handle_key(press(KeyCode::Char('+')));
        assert_eq!(c.rain.density, 8.5);
        c.rain.density = 0.3;
        c.handle_key(press(KeyCode::Char('-')));
        assert_eq!(c.rain.density, DENSITY_RANGE.0);

        c.rain.trail_length = 0;
        c.handle_key(press(KeyCode::Char('[')));
        assert_eq!(c.rain.trail_length, 0);
        c.handle_key(press(KeyCode::Char(']')));
        assert_eq!(c.rain.trail_length, 1);
        assert!(c.rain.validate().is_ok());
    }

    #[test]
    fn number_keys_toggle_catalog_sets() {
        let mut c = controls();
        let latin = &CATALOG[2];
        assert_eq!(latin.name, "latin");

        c.handle_key(press(KeyCode::Char('3')));
        assert!(!c.selection.is_active(latin));
        assert_eq!(c.rain.chars, vec!['0', '1']);

        c.handle_key(press(KeyCode::Char('6')));
        assert!(c.selection.is_active(&CATALOG[5]));
        assert_eq!(c.rain.chars, CATALOG[5].glyphs.to_vec());
    }

    #[test]
    fn theme_and_overlay_toggles() {
        let mut c = controls();
        c.handle_key(press(KeyCode::Char('t')));
        assert_eq!(c.theme, Theme::Green.next());
        assert_eq!(c.rain.colors(), Theme::Green.next().colors());

        assert!(!c.rain.fps_counter_visible);
        c.handle_key(press(KeyCode::Char('f')));
        assert!(c.rain.fps_counter_visible);
    }

    #[test]
    fn refresh_rate_changes_request_a_restart() {
        let mut c = controls();
        assert_eq!(c.handle_key(press(KeyCode::Right)), Command::Restart);
        assert_eq!(c.fps, 70.0);

        c.fps = FPS_RANGE.1;
        assert_eq!(c.handle_key(press(KeyCode::Right)), Command::None);

        c.fps = 5.0;
        assert_eq!(c.handle_key(press(KeyCode::Left)), Command::Restart);
        assert_eq!(c.fps, FPS_RANGE.0);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut c = controls();
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert_eq!(c.handle_key(key), Command::None);
    }

    struct ScriptedHost {
        now: Instant,
        /// Virtual time each frame's work takes.
        frame_cost: Duration,
        script: Vec<(Instant, Event)>,
        pending: Vec<Event>,
        frames: Vec<Instant>,
    }

    impl ScriptedHost {
        fn new(frame_cost: Duration) -> Self {
            Self {
                now: Instant::now(),
                frame_cost,
                script: Vec::new(),
                pending: Vec::new(),
                frames: Vec::new(),
            }
        }

        fn at(&mut self, after: Duration, ev: Event) {
            self.script.push((self.now + after, ev));
        }

        fn deliver(&mut self) {
            let now = self.now;
            let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.script)
                .into_iter()
                .partition(|(t, _)| *t <= now);
            self.script = rest;
            self.pending.extend(due.into_iter().map(|(_, ev)| ev));
        }
    }

    impl FrameHost for ScriptedHost {
        fn now(&self) -> Instant {
            self.now
        }

        fn wait(&mut self, timeout: Duration) -> io::Result<()> {
            self.now += timeout;
            self.deliver();
            Ok(())
        }
    }

    impl EventSource for ScriptedHost {
        fn take_events(&mut self) -> Vec<Event> {
            self.frames.push(self.now);
            self.now += self.frame_cost;
            std::mem::take(&mut self.pending)
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(press(code))
    }

    fn settings() -> Settings {
        let args = Args::try_parse_from(["glyphrain", "--colormode", "0", "--fps", "60"]).unwrap();
        Settings::from_args(&args).unwrap()
    }

    fn drive_until_done(scene: &mut Scene, sched: &mut FrameScheduler, host: &mut ScriptedHost) -> usize {
        let limit = host.now + Duration::from_secs(10);
        let mut draws = 0;
        drive(scene, sched, host, Some(limit), |_| {
            draws += 1;
            Ok(())
        })
        .unwrap();
        draws
    }

    #[test]
    fn quit_is_read_while_frames_overrun_their_period() {
        let mut host = ScriptedHost::new(Duration::from_millis(20));
        let start = host.now;
        host.at(Duration::from_millis(100), key(KeyCode::Char('q')));

        let mut scene = Scene::new(&settings(), 20, 10, FpsSink::default(), start);
        let mut sched = FrameScheduler::new(60.0, FpsSink::default());
        let draws = drive_until_done(&mut scene, &mut sched, &mut host);

        assert!(host.now < start + Duration::from_millis(200), "{:?}", host.now - start);
        assert!(draws > 0);
        assert!(!sched.is_running());
    }

    #[test]
    fn resize_rebuilds_the_field_for_the_new_viewport() {
        let mut host = ScriptedHost::new(Duration::ZERO);
        let start = host.now;
        host.at(Duration::from_millis(50), Event::Resize(40, 10));
        host.at(Duration::from_millis(100), key(KeyCode::Char('q')));

        let mut scene = Scene::new(&settings(), 10, 5, FpsSink::default(), start);
        assert_eq!(scene.field.layout().viewport, Viewport::new(100.0, 100.0));
        assert_eq!(scene.field.columns().len(), 32);

        let mut sched = FrameScheduler::new(60.0, FpsSink::default());
        drive_until_done(&mut scene, &mut sched, &mut host);

        assert_eq!(scene.field.layout().viewport, Viewport::new(400.0, 200.0));
        assert_eq!(scene.field.columns().len(), 152);
        assert_eq!((scene.frame.width, scene.frame.height), (40, 10));
    }

    #[test]
    fn refresh_rate_change_restarts_without_a_double_frame() {
        let mut host = ScriptedHost::new(Duration::ZERO);
        let start = host.now;
        host.at(Duration::from_millis(50), key(KeyCode::Right));
        host.at(Duration::from_millis(200), key(KeyCode::Char('q')));

        let mut scene = Scene::new(&settings(), 10, 5, FpsSink::default(), start);
        let mut sched = FrameScheduler::new(60.0, FpsSink::default());
        drive_until_done(&mut scene, &mut sched, &mut host);

        assert_eq!(scene.controls().fps, 70.0);
        assert_eq!(sched.period(), Duration::from_secs_f64(1.0 / 70.0));
        for pair in host.frames.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(14), "{:?}", pair[1] - pair[0]);
        }
    }
}
