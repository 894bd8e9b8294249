//! Layout and drawing: playfield raster, particles, sidebar (score, stats, next row), pause.

use crate::animator::morph_band;
use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, TILE_SIZE};
use crate::game::GameState;
use crate::input::{Cursor, TILE_COLS, TILE_ROWS};
use crate::particles::Particle;
use crate::theme::{Theme, blend};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::ops::Range;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Half-block raster: two sub-rows per terminal row.
const RASTER_W: usize = BOARD_WIDTH * TILE_COLS as usize;
const RASTER_H: usize = BOARD_HEIGHT * TILE_ROWS as usize * 2;
/// Board pixels covered by one raster cell.
const SUB_W: f32 = TILE_SIZE / TILE_COLS as f32;
const SUB_H: f32 = TILE_SIZE / (TILE_ROWS as f32 * 2.0);
/// Board pixel extent.
const BOARD_PX_W: f32 = BOARD_WIDTH as f32 * TILE_SIZE;
const BOARD_PX_H: f32 = BOARD_HEIGHT as f32 * TILE_SIZE;

/// Board area in terminal cells, without border.
const BOARD_COLS: u16 = RASTER_W as u16;
const BOARD_ROWS: u16 = BOARD_HEIGHT as u16 * TILE_ROWS;

const SIDEBAR_WIDTH: u16 = 24;
/// Playfield block plus the controls line underneath.
const ACTIVE_HEIGHT: u16 = BOARD_ROWS + 2 + 1;

/// Duration of the cluster-clear flash in ms.
const CLEAR_FLASH_MS: u32 = 350;

/// Big score digits, 3 columns × 3 rows each.
const DIGIT_FONT: [[&str; 3]; 10] = [
    ["█▀█", "█ █", "▀▀▀"],
    [" ▀█", "  █", "  ▀"],
    ["▀▀█", "█▀▀", "▀▀▀"],
    ["▀▀█", " ▀█", "▀▀▀"],
    ["█ █", "▀▀█", "  ▀"],
    ["█▀▀", "▀▀█", "▀▀▀"],
    ["█▀▀", "█▀█", "▀▀▀"],
    ["▀▀█", "  █", "  ▀"],
    ["█▀█", "█▀█", "▀▀▀"],
    ["█▀█", "▀▀█", "▀▀▀"],
];
const DIGIT_W: u16 = 3;
const DIGIT_GAP: u16 = 1;

/// Particle glyph per visual stage.
const PARTICLE_GLYPHS: [&str; 3] = ["✦", "•", "·"];

/// Per-frame renderer inputs the simulation doesn't own.
#[derive(Debug, Clone, Copy)]
pub struct Hud {
    pub cursor: Cursor,
    pub best: u32,
    pub paused: bool,
    pub no_animation: bool,
}

/// Pixel colours of the playfield before they're packed into half-blocks.
struct Raster {
    pixels: Vec<Option<Color>>,
}

impl Raster {
    fn new() -> Self {
        Self {
            pixels: vec![None; RASTER_W * RASTER_H],
        }
    }

    fn get(&self, rx: usize, ry: usize) -> Option<Color> {
        self.pixels[ry * RASTER_W + rx]
    }

    /// Paints every raster cell whose centre lies inside the board-pixel rect.
    fn fill_rect(&mut self, px: f32, py: f32, w: f32, h: f32, color: Color) {
        for ry in span(py, h, SUB_H, RASTER_H) {
            for rx in span(px, w, SUB_W, RASTER_W) {
                self.pixels[ry * RASTER_W + rx] = Some(color);
            }
        }
    }

    /// Blends already painted cells inside the rect toward `color`.
    fn tint_rect(&mut self, px: f32, py: f32, w: f32, h: f32, color: Color, bg: Color) {
        for ry in span(py, h, SUB_H, RASTER_H) {
            for rx in span(px, w, SUB_W, RASTER_W) {
                let p = &mut self.pixels[ry * RASTER_W + rx];
                *p = Some(blend(p.unwrap_or(bg), color, 0.5));
            }
        }
    }
}

/// Raster indices whose cell centres fall in `[start, start + len)`, clipped to `[0, limit)`.
fn span(start: f32, len: f32, step: f32, limit: usize) -> Range<usize> {
    let index = |edge: f32| (((edge - step / 2.0) / step).ceil().max(0.0) as usize).min(limit);
    index(start)..index(start + len)
}

/// Digits of `score`, least significant first. Zero is a single digit.
fn score_digits(score: u32) -> Vec<u8> {
    let mut digits = Vec::new();
    let mut n = score;
    loop {
        digits.push((n % 10) as u8);
        n /= 10;
        if n == 0 {
            break;
        }
    }
    digits
}

/// Outer rects of (playfield block, sidebar, controls line) centred in `area`.
fn game_layout(area: Rect) -> (Rect, Rect, Rect) {
    let pw = BOARD_COLS + 2;
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ACTIVE_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(BOARD_ROWS + 2), Constraint::Length(1)])
        .split(vert_chunks[1]);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(rows[0]);
    (cols[0], cols[1], rows[1])
}

/// Terminal rect of the board itself (inside the border). Mouse hit-testing uses this.
pub fn board_rect(area: Rect) -> Rect {
    let (playfield, _, _) = game_layout(area);
    board_rect_in(playfield)
}

/// Draw one frame. Newly cleared tiles start a flash unless animations are off.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    hud: Hud,
    area: Rect,
    new_clears: &[(usize, usize)],
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let (playfield, sidebar, controls) = game_layout(area);
    draw_playfield(frame, state, theme, hud.cursor, playfield);
    draw_sidebar(frame, state, theme, hud.best, sidebar);
    draw_controls(frame, theme, controls);

    if !hud.no_animation {
        apply_clear_effect(
            frame,
            state,
            area,
            new_clears,
            clear_effect,
            clear_process_time,
            now,
        );
    }
    if hud.paused {
        draw_pause_overlay(frame, theme, area);
    }
}

/// Board pixel rect of every tile, plus the wrapped copy of a sliding row's first tile.
fn paint_board(raster: &mut Raster, state: &GameState, theme: &Theme) {
    let board = state.board();
    let nrd = state.new_row_delta();
    let row_anim = state.row_animation();
    let col_anim = state.column_animation();

    for y in 0..BOARD_HEIGHT {
        let dx = row_anim.filter(|a| a.row == y).map_or(0.0, |a| a.delta);
        for x in 0..BOARD_WIDTH {
            let tile = board.tile(x, y);
            let occupancy = tile.cell.occupancy();
            let Some(base) = theme.piece_color(occupancy) else {
                continue;
            };
            let color = col_anim
                .filter(|a| a.col == x)
                .and_then(|a| morph_band(a.phase, occupancy))
                .map_or(base, |band| theme.morph_color(band));
            let px = x as f32 * TILE_SIZE + dx;
            let py = y as f32 * TILE_SIZE + tile.fall_delta - nrd;
            raster.fill_rect(px, py, TILE_SIZE, TILE_SIZE, color);
            if x == 0 && dx < 0.0 {
                raster.fill_rect(px + BOARD_PX_W, py, -dx, TILE_SIZE, color);
            }
        }
    }

    // Incoming row rises from below the bottom edge.
    let py = BOARD_PX_H - nrd;
    for (x, occupancy) in state.pending_row().iter().enumerate() {
        if let Some(color) = theme.piece_color(*occupancy) {
            let dimmed = blend(color, theme.bg, 0.4);
            raster.fill_rect(x as f32 * TILE_SIZE, py, TILE_SIZE, TILE_SIZE, dimmed);
        }
    }
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, cursor: Cursor, area: Rect) {
    let title = format!(" clusterdrop  | Clusters: {} ", state.clusters);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    block.render(area, frame.buffer_mut());
    let board_rect = board_rect_in(area);

    let mut raster = Raster::new();
    paint_board(&mut raster, state, theme);
    raster.tint_rect(
        cursor.x as f32 * TILE_SIZE,
        cursor.y as f32 * TILE_SIZE - state.new_row_delta(),
        TILE_SIZE,
        TILE_SIZE,
        theme.cursor,
        theme.bg,
    );

    let buf = frame.buffer_mut();
    for ty in 0..RASTER_H / 2 {
        for tx in 0..RASTER_W {
            let rx = board_rect.x + tx as u16;
            let ry = board_rect.y + ty as u16;
            if rx >= board_rect.right() || ry >= board_rect.bottom() {
                continue;
            }
            let top = raster.get(tx, ty * 2).unwrap_or(theme.bg);
            let bottom = raster.get(tx, ty * 2 + 1).unwrap_or(theme.bg);
            buf[(rx, ry)]
                .set_symbol("▀")
                .set_style(Style::default().fg(top).bg(bottom));
        }
    }

    draw_particles(buf, state, theme, board_rect);
}

fn board_rect_in(playfield: Rect) -> Rect {
    let inner = Block::default().borders(Borders::ALL).inner(playfield);
    Rect {
        width: BOARD_COLS.min(inner.width),
        height: BOARD_ROWS.min(inner.height),
        ..inner
    }
}

fn particle_color(particle: &Particle, theme: &Theme) -> Color {
    let family = theme.piece_color(particle.family).unwrap_or(theme.main_fg);
    match particle.visual_stage {
        0 => theme.title,
        1 => family,
        _ => blend(family, theme.bg, 0.5),
    }
}

fn draw_particles(buf: &mut Buffer, state: &GameState, theme: &Theme, board_rect: Rect) {
    let nrd = state.new_row_delta();
    let cell_h = TILE_SIZE / f32::from(TILE_ROWS);
    for p in state.particles().iter() {
        let py = p.y - nrd;
        if p.x < 0.0 || py < 0.0 || p.x >= BOARD_PX_W || py >= BOARD_PX_H {
            continue;
        }
        let rx = board_rect.x + (p.x / SUB_W) as u16;
        let ry = board_rect.y + (py / cell_h) as u16;
        if rx >= board_rect.right() || ry >= board_rect.bottom() {
            continue;
        }
        let glyph = PARTICLE_GLYPHS[usize::from(p.visual_stage).min(PARTICLE_GLYPHS.len() - 1)];
        buf[(rx, ry)]
            .set_symbol(glyph)
            .set_fg(particle_color(p, theme));
    }
}

/// Terminal cells covered by cleared tiles at the current rise offset.
fn clearing_buffer_positions(
    board_rect: Rect,
    cleared: &[(usize, usize)],
    new_row_delta: f32,
) -> HashSet<(u16, u16)> {
    let cell_h = TILE_SIZE / f32::from(TILE_ROWS);
    let mut set = HashSet::new();
    for &(gx, gy) in cleared {
        let top = gy as f32 * TILE_SIZE - new_row_delta;
        let rows = span(top, TILE_SIZE, cell_h, usize::from(BOARD_ROWS));
        let x0 = board_rect.x + gx as u16 * TILE_COLS;
        for ty in rows {
            let by = board_rect.y + ty as u16;
            for bx in x0..(x0 + TILE_COLS).min(board_rect.right()) {
                if by < board_rect.bottom() {
                    set.insert((bx, by));
                }
            }
        }
    }
    set
}

/// Starts a flash over newly cleared tiles and advances the running one.
fn apply_clear_effect(
    frame: &mut Frame,
    state: &GameState,
    area: Rect,
    new_clears: &[(usize, usize)],
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board_rect = board_rect(area);
    if !new_clears.is_empty() {
        let clearing_set =
            clearing_buffer_positions(board_rect, new_clears, state.new_row_delta());
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let flash = Color::White;
        let effect = fx::fade_from(flash, flash, (CLEAR_FLASH_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        *clear_effect = Some(effect);
        *clear_process_time = None;
    }

    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *clear_process_time = Some(now);

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
    if clear_effect.as_ref().is_some_and(Effect::done) {
        *clear_effect = None;
        *clear_process_time = None;
    }
}

fn sidebar_block(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), theme.title))
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, best: u32, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Score (border + 3 digit rows)
            Constraint::Length(6), // Stats
            Constraint::Length(3), // Next row
            Constraint::Fill(1),
        ])
        .split(area);

    let score_block = sidebar_block(theme, "Score");
    let score_inner = score_block.inner(chunks[0]);
    score_block.render(chunks[0], frame.buffer_mut());
    draw_big_score(frame.buffer_mut(), state.score(), score_inner, fg_style);

    let stats_block = sidebar_block(theme, "Stats");
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let secs = state.elapsed as u64;
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let stats_lines = vec![
        stat("Best: ", best.max(state.score()).to_string()),
        stat("Clusters: ", state.clusters.to_string()),
        stat("Rows: ", state.rows_added.to_string()),
        stat("Time: ", format!("{:02}:{:02}", secs / 60, secs % 60)),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let next_block = sidebar_block(theme, "Next");
    let next_inner = next_block.inner(chunks[2]);
    next_block.render(chunks[2], frame.buffer_mut());
    draw_next_row(frame.buffer_mut(), state, theme, next_inner);
}

/// Big digits drawn from the right edge leftwards, least significant first.
fn draw_big_score(buf: &mut Buffer, score: u32, area: Rect, style: Style) {
    let mut right = area.right();
    for digit in score_digits(score) {
        if right < area.x + DIGIT_W {
            break;
        }
        let x = right - DIGIT_W;
        for (row, line) in DIGIT_FONT[usize::from(digit)].iter().enumerate() {
            let y = area.y + row as u16;
            if y < area.bottom() {
                buf.set_string(x, y, line, style);
            }
        }
        right = x.saturating_sub(DIGIT_GAP);
    }
}

/// Pending row as a strip of two-column blocks.
fn draw_next_row(buf: &mut Buffer, state: &GameState, theme: &Theme, area: Rect) {
    let block_w = (area.width / BOARD_WIDTH as u16).clamp(1, 2);
    let off_x = area.width.saturating_sub(block_w * BOARD_WIDTH as u16) / 2;
    for (i, occupancy) in state.pending_row().iter().enumerate() {
        let color = theme.piece_color(*occupancy).unwrap_or(theme.bg);
        let r = Rect {
            x: area.x + off_x + i as u16 * block_w,
            y: area.y,
            width: block_w,
            height: area.height.min(1),
        }
        .intersection(area);
        Paragraph::new("██")
            .style(Style::default().fg(color).bg(color))
            .render(r, buf);
    }
}

fn draw_controls(frame: &mut Frame, theme: &Theme, area: Rect) {
    let key = Style::default().fg(theme.title);
    let text = Style::default().fg(theme.inactive_fg);
    let line = Line::from(vec![
        Span::styled("←↑↓→", key),
        Span::styled(" cursor  ", text),
        Span::styled("space", key),
        Span::styled(" rotate  ", text),
        Span::styled("x", key),
        Span::styled(" invert  ", text),
        Span::styled("p", key),
        Span::styled(" pause  ", text),
        Span::styled("r", key),
        Span::styled(" restart  ", text),
        Span::styled("q", key),
        Span::styled(" quit", text),
    ]);
    Paragraph::new(line)
        .alignment(Alignment::Center)
        .render(area, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::config::Tuning;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_score_digits_least_significant_first() {
        assert_eq!(score_digits(0), vec![0]);
        assert_eq!(score_digits(7), vec![7]);
        assert_eq!(score_digits(1200), vec![0, 0, 2, 1]);
    }

    #[test]
    fn test_big_score_is_right_aligned() {
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        draw_big_score(&mut buf, 100, area, Style::default());
        // Three digits of width 3 with a 1-column gap end at the right edge.
        assert_eq!(buf[(19, 0)].symbol(), "█");
        assert_eq!(buf[(16, 0)].symbol(), " ");
        assert_eq!(buf[(12, 0)].symbol(), " ");
        // Leading "1" occupies columns 9..12.
        assert_eq!(buf[(10, 0)].symbol(), "▀");
        assert_eq!(buf[(11, 0)].symbol(), "█");
        assert_eq!(buf[(8, 0)].symbol(), " ");
    }

    #[test]
    fn test_span_samples_cell_centres() {
        assert_eq!(span(0.0, TILE_SIZE, SUB_W, RASTER_W), 0..4);
        assert_eq!(span(-12.0, TILE_SIZE, SUB_W, RASTER_W), 0..2);
        assert_eq!(span(300.0, TILE_SIZE, SUB_W, RASTER_W), 37..RASTER_W);
        assert_eq!(span(BOARD_PX_H, TILE_SIZE, SUB_H, RASTER_H), RASTER_H..RASTER_H);
    }

    #[test]
    fn test_sliding_row_wraps_first_tile() {
        let mut state = GameState::new(Tuning::default(), 3);
        let bottom = BOARD_HEIGHT - 1;
        for x in 0..BOARD_WIDTH {
            state.board_mut().set_cell(x, bottom, Cell::WHITE);
        }
        state.board_mut().set_cell(BOARD_WIDTH - 1, bottom, Cell::BLACK);
        state.rotate_row(bottom);
        state.tick(0.1); // slide offset -16 px

        let theme = Theme::default();
        let mut raster = Raster::new();
        paint_board(&mut raster, &state, &theme);
        let ry = RASTER_H - 1;
        // Black tile now at column 0: half off the left edge, half wrapped to the right.
        assert_eq!(raster.get(0, ry), Some(theme.dark_piece));
        assert_eq!(raster.get(RASTER_W - 1, ry), Some(theme.dark_piece));
        assert_eq!(raster.get(RASTER_W - 3, ry), Some(theme.light_piece));
    }

    #[test]
    fn test_frame_renders_board_and_sidebar() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let state = GameState::new(Tuning::default(), 9);
        let theme = Theme::default();
        let hud = Hud {
            cursor: Cursor::default(),
            best: 500,
            paused: false,
            no_animation: false,
        };
        let mut effect = None;
        let mut process_time = None;
        let cleared = [(0, BOARD_HEIGHT - 1)];
        terminal
            .draw(|f| {
                draw(
                    f,
                    &state,
                    &theme,
                    hud,
                    f.area(),
                    &cleared,
                    &mut effect,
                    &mut process_time,
                    Instant::now(),
                );
            })
            .unwrap();
        assert!(effect.is_some());
        let rect = board_rect(Rect::new(0, 0, 80, 24));
        assert_eq!((rect.width, rect.height), (BOARD_COLS, BOARD_ROWS));
        let buf = terminal.backend().buffer();
        assert_eq!(buf[(rect.x, rect.bottom() - 1)].symbol(), "▀");
        let text: String = (0..80).map(|x| buf[(x, rect.y - 1)].symbol().to_string()).collect();
        assert!(text.contains("clusterdrop"));
    }
}
