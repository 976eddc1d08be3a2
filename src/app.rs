use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use parking_lot::RwLock;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use ratatui::Terminal;

use crate::audio::{AudioClock, AudioEngine, EngineClock, EngineHandle};
use crate::instrument::{default_library, InstrumentDef, InstrumentResolver, SampleCache};
use crate::project::{self, ProjectData};
use crate::samples;
use crate::sequencer::{
    Panel, PatternStore, Scheduler, StepNotice, StepSync, DEFAULT_STEPS, NOTE_CENTER, NOTE_RANGE,
};
use crate::toys::{Bouncer, Rippler, Target};
use crate::ui::{render_grid, render_transport, GridState, Theme};

/// How long a status message stays in the footer
const STATUS_SECS: u64 = 3;

/// Preset board positions for the rippler targets, one per lane
const TARGET_SPOTS: [(f32, f32); 6] = [
    (0.15, 0.20),
    (0.85, 0.25),
    (0.30, 0.80),
    (0.70, 0.70),
    (0.10, 0.60),
    (0.90, 0.50),
];

pub struct App {
    theme: Theme,
    _engine: AudioEngine,
    clock: Arc<EngineClock>,
    sink: Arc<EngineHandle>,
    pattern: Arc<RwLock<PatternStore>>,
    resolver: Arc<InstrumentResolver>,
    scheduler: Scheduler,
    sync: StepSync,
    notices: Receiver<StepNotice>,
    /// Notices waiting for their scheduled time to pass
    pending: VecDeque<StepNotice>,
    playhead: Option<usize>,
    bouncer: Bouncer,
    rippler: Rippler,
    grid_state: GridState,
    should_quit: bool,
    project_path: PathBuf,
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(
        theme: Theme,
        project_path: Option<PathBuf>,
        samples_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let engine = AudioEngine::new()?;
        let clock = engine.clock();
        let sink = Arc::new(engine.handle());

        // Instrument table: built-in synth voices plus any discovered
        // samples, loaded off-thread while the UI comes up
        let cache = SampleCache::new();
        let mut defs = default_library();
        let mut dirs = samples::search_dirs();
        if let Some(dir) = samples_dir {
            dirs.insert(0, dir);
        }
        let found = samples::scan_samples(&dirs);
        let jobs: Vec<_> = found
            .iter()
            .map(|e| (e.name.clone(), e.path.clone()))
            .collect();
        for entry in &found {
            defs.push(InstrumentDef::sampled(&entry.name, 60, 0.9));
        }
        cache.load_in_background(jobs, clock.sample_rate() as f32);
        let resolver = Arc::new(InstrumentResolver::new(defs, cache));

        // Lanes: the synth voices, then up to two sample lanes
        let mut lane_names: Vec<String> =
            vec!["kick".into(), "bass".into(), "pluck".into(), "chime".into()];
        for entry in found.iter().take(2) {
            lane_names.push(entry.name.clone());
        }
        let lane_refs: Vec<&str> = lane_names.iter().map(|s| s.as_str()).collect();
        let pattern = Arc::new(RwLock::new(PatternStore::new(&lane_refs, DEFAULT_STEPS)));

        let (sync, notices) = StepSync::channel();
        let mut scheduler = Scheduler::new(
            clock.clone() as Arc<dyn AudioClock>,
            pattern.clone(),
            resolver.clone(),
            sink.clone() as Arc<dyn crate::audio::PlaybackSink>,
            sync.clone(),
        );

        let path = project_path.unwrap_or_else(|| PathBuf::from("pattern.tgrid"));
        let mut status_message = None;
        if path.exists() {
            match project::load_project(&path) {
                Ok(data) => {
                    scheduler.set_tempo(data.bpm);
                    *pattern.write() = data.pattern;
                    status_message = Some((format!("Loaded: {}", path.display()), Instant::now()));
                }
                Err(e) => {
                    status_message = Some((format!("Load failed: {}", e), Instant::now()));
                }
            }
        }

        let rippler_targets: Vec<Target> = lane_names
            .iter()
            .zip(TARGET_SPOTS.iter())
            .map(|(name, (x, y))| Target::new(name, NOTE_CENTER, *x, *y))
            .collect();

        Ok(Self {
            theme,
            _engine: engine,
            clock,
            sink,
            pattern,
            resolver,
            scheduler,
            sync,
            notices,
            pending: VecDeque::new(),
            playhead: None,
            bouncer: Bouncer::new("kick", NOTE_CENTER, 4),
            rippler: Rippler::new((0.5, 0.5), rippler_targets, 16),
            grid_state: GridState::new(),
            should_quit: false,
            project_path: path,
            status_message,
        })
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = Self::setup_terminal()?;
        let result = self.main_loop(&mut terminal);
        Self::restore_terminal(&mut terminal)?;
        result
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.tick_core();
            terminal.draw(|frame| self.render(frame))?;

            // The poll timeout doubles as the scheduler's polling period;
            // the lookahead window absorbs its jitter
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// One pass of the cooperative core: scheduler, toys, playhead
    fn tick_core(&mut self) {
        self.scheduler.tick();

        if let Some(timing) = self.scheduler.timing() {
            let now = self.clock.now();
            let step_count = self.pattern.read().step_count();
            self.bouncer.tick(
                now,
                timing,
                step_count,
                &self.resolver,
                self.sink.as_ref(),
                &self.sync,
            );
            self.rippler
                .tick(now, timing, &self.resolver, self.sink.as_ref(), &self.sync);
        }

        // Hold notices until their audio time passes, then move the
        // playhead; visual only
        for notice in self.notices.try_iter() {
            self.pending.push_back(notice);
        }
        let now = self.clock.now();
        while self
            .pending
            .front()
            .map(|n| n.time <= now)
            .unwrap_or(false)
        {
            if let Some(notice) = self.pending.pop_front() {
                if notice.panel == Panel::Grid {
                    self.playhead = Some(notice.step);
                }
            }
        }
        if !self.scheduler.is_playing() {
            self.playhead = None;
        }

        if let Some((_, at)) = &self.status_message {
            if at.elapsed() > Duration::from_secs(STATUS_SECS) {
                self.status_message = None;
            }
        }
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    fn toggle_playback(&mut self) {
        if self.scheduler.is_playing() {
            self.scheduler.stop();
            // Trailing voices inside the lookahead window still sound
            self.bouncer.disarm();
            self.rippler.disarm();
            self.pending.clear();
            self.playhead = None;
        } else if !self.scheduler.start() {
            self.set_status("Audio engine not ready yet".to_string());
        }
    }

    fn toggle_bouncer(&mut self) {
        if self.bouncer.is_armed() {
            self.bouncer.disarm();
            self.set_status("Bouncer off".to_string());
            return;
        }
        let Some(timing) = self.scheduler.timing() else {
            self.set_status("Start playback to launch the bouncer".to_string());
            return;
        };
        // The bouncer plays whichever lane the cursor is on
        let instrument = self
            .pattern
            .read()
            .lane_instrument(self.grid_state.cursor_lane)
            .unwrap_or("kick")
            .to_string();
        self.bouncer = Bouncer::new(&instrument, NOTE_CENTER, 4);
        self.bouncer.arm(self.clock.now(), timing);
        self.set_status(format!("Bouncer on: {}", instrument));
    }

    fn toggle_rippler(&mut self) {
        if self.rippler.is_armed() {
            self.rippler.disarm();
            self.set_status("Rippler off".to_string());
            return;
        }
        let Some(timing) = self.scheduler.timing() else {
            self.set_status("Start playback to launch the rippler".to_string());
            return;
        };
        // The wave expands from wherever the cursor sits on the grid
        let (lanes, steps) = {
            let p = self.pattern.read();
            (p.lane_count(), p.step_count())
        };
        let x = self.grid_state.cursor_step as f32 / (steps.max(2) - 1) as f32;
        let y = self.grid_state.cursor_lane as f32 / (lanes.max(2) - 1) as f32;
        self.rippler.move_origin(x, y);
        self.rippler.reset(self.clock.now(), timing);
        self.set_status("Rippler on".to_string());
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    self.save_project_action();
                    return;
                }
                KeyCode::Char('o') => {
                    self.load_project_action();
                    return;
                }
                _ => {}
            }
        }

        let (lanes, steps) = {
            let p = self.pattern.read();
            (p.lane_count(), p.step_count())
        };

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Left => self.grid_state.move_cursor(-1, 0, lanes, steps),
            KeyCode::Right => self.grid_state.move_cursor(1, 0, lanes, steps),
            KeyCode::Up => self.grid_state.move_cursor(0, -1, lanes, steps),
            KeyCode::Down => self.grid_state.move_cursor(0, 1, lanes, steps),
            KeyCode::Enter | KeyCode::Char('x') => {
                self.pattern
                    .write()
                    .toggle_step(self.grid_state.cursor_lane, self.grid_state.cursor_step);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_note(1),
            KeyCode::Char('-') => self.nudge_note(-1),
            KeyCode::Char('[') => {
                let bpm = self.scheduler.bpm().saturating_sub(5);
                self.scheduler.set_tempo(bpm);
            }
            KeyCode::Char(']') => {
                let bpm = self.scheduler.bpm() + 5;
                self.scheduler.set_tempo(bpm);
            }
            KeyCode::Char('c') => {
                self.pattern.write().clear_lane(self.grid_state.cursor_lane);
            }
            KeyCode::Char('C') => self.pattern.write().clear_all(),
            KeyCode::Char('b') => self.toggle_bouncer(),
            KeyCode::Char('r') => self.toggle_rippler(),
            _ => {}
        }
    }

    fn nudge_note(&mut self, delta: i32) {
        let lane = self.grid_state.cursor_lane;
        let step = self.grid_state.cursor_step;
        let mut p = self.pattern.write();
        let current = p.get_step(lane, step).note_index as i32;
        let next = (current + delta).clamp(0, NOTE_RANGE as i32 - 1) as u8;
        p.set_note(lane, step, next);
    }

    fn save_project_action(&mut self) {
        let data = ProjectData::new(self.scheduler.bpm(), self.pattern.read().clone());
        match project::save_project(&data, &self.project_path) {
            Ok(()) => self.set_status(format!("Saved: {}", self.project_path.display())),
            Err(e) => self.set_status(format!("Save failed: {}", e)),
        }
    }

    fn load_project_action(&mut self) {
        match project::load_project(&self.project_path) {
            Ok(data) => {
                // Loading replaces the grid wholesale; stop first so the
                // scheduler re-enters on the new step count
                self.scheduler.stop();
                self.bouncer.disarm();
                self.rippler.disarm();
                self.scheduler.set_tempo(data.bpm);
                *self.pattern.write() = data.pattern;
                self.grid_state = GridState::new();
                self.set_status(format!("Loaded: {}", self.project_path.display()));
            }
            Err(e) => self.set_status(format!("Load failed: {}", e)),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let toy_status = format!(
            "toys: {}{}",
            if self.bouncer.is_armed() { "B" } else { "-" },
            if self.rippler.is_armed() { "R" } else { "-" }
        );
        let pattern = self.pattern.read();
        render_transport(
            frame,
            chunks[0],
            self.scheduler.is_playing(),
            self.scheduler.bpm(),
            self.playhead,
            pattern.step_count(),
            &toy_status,
            self.status_message.as_ref().map(|(m, _)| m.as_str()),
            &self.theme,
        );
        render_grid(
            frame,
            chunks[1],
            &pattern,
            &self.grid_state,
            if self.scheduler.is_playing() {
                self.playhead
            } else {
                None
            },
            &self.theme,
        );

        let help = " SPACE play/stop  ENTER toggle  +/- note  [ ] tempo  b bouncer  r rippler  ^S save  ^O load  q quit";
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(self.theme.dimmed)),
            chunks[2],
        );
    }
}
