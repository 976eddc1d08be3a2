use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::sequencer::{PatternStore, NOTE_CENTER};
use crate::ui::Theme;

/// Grid cursor state
pub struct GridState {
    pub cursor_lane: usize,
    pub cursor_step: usize,
}

impl GridState {
    pub fn new() -> Self {
        Self {
            cursor_lane: 0,
            cursor_step: 0,
        }
    }

    pub fn move_cursor(&mut self, dx: i32, dy: i32, lanes: usize, steps: usize) {
        if lanes == 0 || steps == 0 {
            return;
        }
        self.cursor_step = ((self.cursor_step as i32 + dx).rem_euclid(steps as i32)) as usize;
        self.cursor_lane = ((self.cursor_lane as i32 + dy).rem_euclid(lanes as i32)) as usize;
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the step sequencer grid. `playhead` is the step last reported
/// by the scheduler's sync notices, shown only while playing.
pub fn render_grid(
    frame: &mut Frame,
    area: Rect,
    pattern: &PatternStore,
    grid_state: &GridState,
    playhead: Option<usize>,
    theme: &Theme,
) {
    let block = Block::default()
        .title(Span::styled(" Grid ", Style::default().fg(theme.lane_label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lanes = pattern.lane_count();
    let steps = pattern.step_count();
    if lanes == 0 || steps == 0 {
        return;
    }

    let label_width = 8u16;
    let available_width = inner.width.saturating_sub(label_width);
    let cell_width = (available_width / steps as u16).max(2);
    let cell_height = (inner.height / lanes as u16).max(1);

    for lane in 0..lanes {
        let lane_y = inner.y + (lane as u16 * cell_height);
        if lane_y >= inner.y + inner.height {
            break;
        }

        let name = pattern.lane_instrument(lane).unwrap_or("?");
        let label = format!("{:>7} ", name);
        let label_style = if lane == grid_state.cursor_lane {
            Style::default().fg(theme.grid_cursor).bold()
        } else {
            Style::default().fg(theme.lane_label)
        };
        frame.render_widget(
            Paragraph::new(label).style(label_style),
            Rect::new(inner.x, lane_y, label_width, 1),
        );

        for step in 0..steps {
            let step_x = inner.x + label_width + (step as u16 * cell_width);
            if step_x >= inner.x + inner.width {
                break;
            }

            let cell = pattern.get_step(lane, step);
            let is_cursor = lane == grid_state.cursor_lane && step == grid_state.cursor_step;
            let is_playhead = playhead == Some(step);

            let (symbol, style) = if is_cursor {
                let sym = if cell.active {
                    note_symbol(cell.note_index)
                } else {
                    "[]"
                };
                (
                    sym,
                    Style::default().fg(theme.bg).bg(theme.grid_cursor).bold(),
                )
            } else if is_playhead {
                if cell.active {
                    (
                        note_symbol(cell.note_index),
                        Style::default().fg(theme.bg).bg(theme.playhead).bold(),
                    )
                } else {
                    ("::", Style::default().fg(theme.playhead).bg(theme.bg))
                }
            } else if cell.active {
                (
                    note_symbol(cell.note_index),
                    Style::default().fg(theme.grid_active).bg(theme.bg),
                )
            } else if step % 4 == 0 {
                (". ", Style::default().fg(theme.dimmed).bg(theme.bg))
            } else {
                ("- ", Style::default().fg(theme.grid_inactive).bg(theme.bg))
            };

            frame.render_widget(
                Paragraph::new(symbol).style(style),
                Rect::new(step_x, lane_y, cell_width.min(2), 1),
            );
        }
    }
}

/// Active-cell glyph: arrows hint how far a step's note sits from the
/// base pitch.
fn note_symbol(note_index: u8) -> &'static str {
    if note_index > NOTE_CENTER {
        "#^"
    } else if note_index < NOTE_CENTER {
        "#v"
    } else {
        "##"
    }
}

/// Render the transport/status bar
#[allow(clippy::too_many_arguments)]
pub fn render_transport(
    frame: &mut Frame,
    area: Rect,
    playing: bool,
    bpm: u32,
    playhead: Option<usize>,
    step_count: usize,
    toy_status: &str,
    status_message: Option<&str>,
    theme: &Theme,
) {
    let status = if playing { "PLAY" } else { "STOP" };
    let status_style = if playing {
        Style::default().fg(theme.playhead).bold()
    } else {
        Style::default().fg(theme.dimmed)
    };

    let step_text = match playhead {
        Some(step) if playing => format!("Step: {:2}/{}", step + 1, step_count),
        _ => format!("Step:  -/{}", step_count),
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", status), status_style),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(format!("BPM: {}", bpm), Style::default().fg(theme.fg)),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(step_text, Style::default().fg(theme.fg)),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(toy_status.to_string(), Style::default().fg(theme.toy)),
    ];
    if let Some(msg) = status_message {
        spans.push(Span::styled(" | ", Style::default().fg(theme.border)));
        spans.push(Span::styled(msg.to_string(), Style::default().fg(theme.fg)));
    }

    let transport = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .style(Style::default().bg(theme.bg)),
        );

    frame.render_widget(transport, area);
}
