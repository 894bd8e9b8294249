//! App: terminal init, main loop, tick, key and mouse handling.

use crate::GameConfig;
use crate::game::GameState;
use crate::highscores;
use crate::input::{Action, Cursor, key_to_action, pointer_to_intent};
use crate::theme::Theme;
use crate::ui::{self, Hud};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseEvent};
use log::{info, warn};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Longest simulated step per frame; longer stalls (suspend, resize) are dropped.
const MAX_FRAME_DT: f32 = 0.1;

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    cursor: Cursor,
    paused: bool,
    /// Best score seen this session, including the running game.
    best: u32,
    /// Best score last written to disk.
    saved_best: u32,
    last_tick: Instant,
    /// Board rect from the last frame, for mouse hit-testing.
    board_area: Rect,
    /// TachyonFX flash over freshly cleared clusters.
    clear_effect: Option<Effect>,
    /// Last time we processed the clear effect (for delta).
    clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(config.tuning, config.seed);
        let best = highscores::load_high_score();
        info!("starting with seed {} (best {best})", config.seed);
        Self {
            config,
            theme,
            state,
            cursor: Cursor::default(),
            paused: false,
            best,
            saved_best: best,
            last_tick: Instant::now(),
            board_area: Rect::default(),
            clear_effect: None,
            clear_effect_process_time: None,
        }
    }

    fn persist_best(&mut self) {
        if self.best <= self.saved_best {
            return;
        }
        match highscores::save_high_score(self.best) {
            Ok(()) => self.saved_best = self.best,
            Err(e) => warn!("could not save best score: {e:#}"),
        }
    }

    fn reset_game(&mut self) {
        self.persist_best();
        self.state.init_board();
        self.cursor = Cursor::default();
        self.paused = false;
        self.last_tick = Instant::now();
        self.clear_effect = None;
        self.clear_effect_process_time = None;
    }

    /// Returns false when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::Pause => {
                self.paused = !self.paused;
                // Don't let the pause itself count as simulated time.
                self.last_tick = Instant::now();
            }
            Action::Restart => self.reset_game(),
            _ if self.paused => {}
            _ => {
                if let Some(intent) = self.cursor.apply(action) {
                    self.state.dispatch(intent);
                }
            }
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.paused {
            return;
        }
        if let Some(intent) = pointer_to_intent(mouse, self.board_area, self.state.new_row_delta()) {
            self.state.dispatch(intent);
        }
    }

    fn tick(&mut self, now: Instant) {
        let dt = now
            .saturating_duration_since(self.last_tick)
            .as_secs_f32()
            .min(MAX_FRAME_DT);
        self.last_tick = now;
        if !self.paused {
            self.state.tick(dt);
        }
        self.best = self.best.max(self.state.score());
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);
        self.persist_best();

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        self.last_tick = Instant::now();
        loop {
            let now = Instant::now();
            self.tick(now);

            let new_clears = self.state.take_recent_clears();
            let hud = Hud {
                cursor: self.cursor,
                best: self.best,
                paused: self.paused,
                no_animation: self.config.no_animation,
            };
            terminal.draw(|f| {
                self.board_area = ui::board_rect(f.area());
                ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    hud,
                    f.area(),
                    &new_clears,
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    now,
                );
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if !self.handle_action(key_to_action(key)) {
                                info!("quit with score {}", self.state.score());
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse),
                        _ => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BOARD_HEIGHT;
    use crate::config::Tuning;

    fn app() -> App {
        let config = GameConfig {
            tuning: Tuning::default(),
            seed: 11,
            frame_rate: 60.0,
            no_animation: true,
        };
        App {
            state: GameState::new(config.tuning, config.seed),
            config,
            theme: Theme::default(),
            cursor: Cursor::default(),
            paused: false,
            best: 0,
            saved_best: u32::MAX,
            last_tick: Instant::now(),
            board_area: Rect::default(),
            clear_effect: None,
            clear_effect_process_time: None,
        }
    }

    #[test]
    fn test_pause_blocks_board_actions() {
        let mut app = app();
        assert!(app.handle_action(Action::Pause));
        assert!(app.paused);
        app.handle_action(Action::RotateRow);
        assert!(app.state.row_animation().is_none());
        app.handle_action(Action::Pause);
        app.handle_action(Action::RotateRow);
        assert_eq!(app.state.row_animation().map(|a| a.row), Some(BOARD_HEIGHT - 1));
    }

    #[test]
    fn test_quit_and_restart() {
        let mut app = app();
        app.handle_action(Action::CursorUp);
        assert!(app.handle_action(Action::Restart));
        assert_eq!(app.cursor, Cursor::default());
        assert!(!app.handle_action(Action::Quit));
    }

    #[test]
    fn test_paused_tick_freezes_simulation() {
        let mut app = app();
        app.paused = true;
        let start = app.state.new_row_delta();
        app.tick(app.last_tick + Duration::from_millis(50));
        assert_eq!(app.state.new_row_delta(), start);
        app.paused = false;
        app.tick(app.last_tick + Duration::from_millis(50));
        assert!(app.state.new_row_delta() > start);
    }
}
