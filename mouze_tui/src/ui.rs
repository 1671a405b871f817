use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};

use anyhow::Result;
use mouze_core::{
    board::Cell,
    simulation::{Frame as GameFrame, GameState, Outcome, Prompt, Renderer},
};
use ratatui::{
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// The player asked to leave before the simulation finished.
#[derive(Debug, thiserror::Error)]
#[error("simulation interrupted by the user")]
pub struct UserQuit;

/// Configures the terminal for TUI interaction.
pub fn setup_terminal() -> Result<Tui> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
pub fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Text shown in a box over the board.
struct Popup {
    title: &'static str,
    lines: Vec<String>,
}

impl Popup {
    fn for_prompt(prompt: Prompt) -> Self {
        match prompt {
            Prompt::Welcome => Popup {
                title: "Mouze",
                lines: vec![
                    "Welcome to the Mouze game!".to_string(),
                    "Press <Enter> to start".to_string(),
                ],
            },
            Prompt::LifeLost { lives_left } => Popup {
                title: "Ouch",
                lines: vec![
                    "The mouse hit a wall!".to_string(),
                    format!("Lives left: {}", lives_left),
                    "Press <Enter> to continue".to_string(),
                ],
            },
            Prompt::LevelCleared { level } => Popup {
                title: "Level up",
                lines: vec![
                    format!("Level {} completed!", level),
                    "Press <Enter> for the next level".to_string(),
                ],
            },
        }
    }

    fn for_outcome(outcome: &Outcome) -> Self {
        let headline = if outcome.won {
            "Congratulations! The mouse ate all the food!"
        } else {
            "The mouse lost all its lives..."
        };
        Popup {
            title: "Game over",
            lines: vec![
                headline.to_string(),
                format!(
                    "Score: {}   Levels cleared: {}",
                    outcome.score, outcome.levels_cleared
                ),
                "Press any key to exit".to_string(),
            ],
        }
    }
}

/// Draws the simulation in the terminal and reads acknowledgments from the keyboard.
pub struct TerminalRenderer {
    terminal: Tui,
}

impl TerminalRenderer {
    pub fn new(terminal: Tui) -> Self {
        Self { terminal }
    }

    pub fn terminal_mut(&mut self) -> &mut Tui {
        &mut self.terminal
    }

    fn show(&mut self, frame: &GameFrame<'_>, popup: Option<&Popup>) -> Result<()> {
        self.terminal.draw(|f| ui(f, frame, popup))?;
        Ok(())
    }

    /// Shows the final result until a key is pressed.
    pub fn show_outcome(&mut self, frame: &GameFrame<'_>, outcome: &Outcome) -> Result<()> {
        let popup = Popup::for_outcome(outcome);
        loop {
            self.show(frame, Some(&popup))?;
            if pressed_key(event::read()?).is_some() {
                return Ok(());
            }
        }
    }
}

/// The key of a key press; releases and other events give `None`.
fn pressed_key(event: Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(key.code),
        _ => None,
    }
}

fn is_quit(code: KeyCode) -> bool {
    matches!(code, KeyCode::Char('q') | KeyCode::Esc)
}

impl Renderer for TerminalRenderer {
    type Error = anyhow::Error;

    fn draw(&mut self, frame: &GameFrame<'_>) -> Result<()> {
        self.show(frame, None)
    }

    /// Waits for `delay` while still reacting to the quit keys.
    fn pace(&mut self, delay: Duration) -> Result<()> {
        let deadline = Instant::now() + delay;
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if timeout.is_zero() {
                return Ok(());
            }
            if event::poll(timeout)?
                && let Some(code) = pressed_key(event::read()?)
                && is_quit(code)
            {
                return Err(UserQuit.into());
            }
        }
    }

    fn acknowledge(&mut self, prompt: Prompt, frame: &GameFrame<'_>) -> Result<()> {
        let popup = Popup::for_prompt(prompt);
        loop {
            // Redraw on every event so resizes are picked up.
            self.show(frame, Some(&popup))?;
            match pressed_key(event::read()?) {
                Some(KeyCode::Enter | KeyCode::Char(' ')) => return Ok(()),
                Some(code) if is_quit(code) => return Err(UserQuit.into()),
                _ => {}
            }
        }
    }
}

/// Renders the user interface.
fn ui(f: &mut Frame, game: &GameFrame<'_>, popup: Option<&Popup>) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Area for the board
            Constraint::Length(3), // Area for the status line
            Constraint::Length(2), // Area for help
        ])
        .split(f.area());

    render_board(f, main_layout[0], game);
    render_status(f, main_layout[1], game);

    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(help_text, main_layout[2]);

    if let Some(popup) = popup {
        render_popup(f, popup);
    }
}

fn cell_span(cell: Cell) -> Span<'static> {
    match cell {
        Cell::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
        Cell::Open => Span::raw(" "),
        Cell::Decor => Span::styled(".", Style::default().fg(Color::DarkGray)),
        Cell::Medium => Span::styled("@", Style::default().fg(Color::Yellow)),
        Cell::High => Span::styled("%", Style::default().fg(Color::Magenta)),
        Cell::Spawn => Span::styled("&", Style::default().fg(Color::Cyan)),
        Cell::Food => Span::styled("*", Style::default().fg(Color::LightYellow).bold()),
        Cell::Mouse { dead: false } => Span::styled("M", Style::default().fg(Color::Red).bold()),
        Cell::Mouse { dead: true } => {
            Span::styled("X", Style::default().fg(Color::Red).bold().reversed())
        }
        Cell::Visiting => Span::styled("·", Style::default().fg(Color::Green)),
    }
}

/// Renders the board onto the frame.
fn render_board(f: &mut Frame, area: Rect, game: &GameFrame<'_>) {
    let cells = game.board.cells();
    let lines: Vec<Line> = (0..cells.rows())
        .map(|row| Line::from(cells.row(row).map(|cell| cell_span(*cell)).collect::<Vec<_>>()))
        .collect();

    let title = format!(" Mouze - level {} of {} ", game.level, game.level_count);
    let board = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(board, area);
}

fn render_status(f: &mut Frame, area: Rect, game: &GameFrame<'_>) {
    let hearts = "♥ ".repeat(game.lives);
    let status = Line::from(vec![
        Span::raw("Lives: "),
        Span::styled(hearts, Style::default().fg(Color::Red)),
        Span::raw(format!(
            "  Food: {} of {}  Score: {}  Player: {}  ",
            game.size, game.food_quota, game.score, game.strategy
        )),
        Span::styled(state_label(game.state), Style::default().italic()),
    ]);
    let widget = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn state_label(state: GameState) -> &'static str {
    match state {
        GameState::Start | GameState::Welcome => "starting",
        GameState::LoadLevel => "placing food",
        GameState::Thinking => "thinking",
        GameState::Running => "running",
        GameState::Eating => "eating",
        GameState::Crashed => "crashed",
        GameState::LevelUp => "level up",
        GameState::Won => "won",
        GameState::Lost => "lost",
        GameState::End => "finished",
    }
}

fn render_popup(f: &mut Frame, popup: &Popup) {
    let width = popup
        .lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0) as u16
        + 4;
    let area = centered_rect(width, popup.lines.len() as u16 + 2, f.area());
    let text: Vec<Line> = popup.lines.iter().map(|line| Line::from(line.as_str())).collect();
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().title(popup.title).borders(Borders::ALL));
    f.render_widget(Clear, area);
    f.render_widget(widget, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_is_centred_and_clamped() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(10, 4, area), Rect::new(5, 3, 10, 4));
        assert_eq!(centered_rect(50, 40, area), area);
    }

    #[test]
    fn every_cell_is_one_column_wide() {
        for cell in [
            Cell::Wall,
            Cell::Open,
            Cell::Decor,
            Cell::Medium,
            Cell::High,
            Cell::Spawn,
            Cell::Food,
            Cell::Mouse { dead: false },
            Cell::Mouse { dead: true },
            Cell::Visiting,
        ] {
            assert_eq!(cell_span(cell).width(), 1);
        }
    }

    #[test]
    fn only_key_presses_are_read() {
        use ratatui::crossterm::event::{KeyEvent, KeyModifiers};

        let press = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(pressed_key(Event::Key(press)), Some(KeyCode::Char('q')));
        assert!(is_quit(KeyCode::Char('q')));

        let release =
            KeyEvent::new_with_kind(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(pressed_key(Event::Key(release)), None);
        assert_eq!(pressed_key(Event::Resize(80, 24)), None);
        assert!(!is_quit(KeyCode::Enter));
    }

    #[test]
    fn life_lost_popup_mentions_remaining_lives() {
        let popup = Popup::for_prompt(Prompt::LifeLost { lives_left: 2 });
        assert!(popup.lines.iter().any(|line| line.contains("Lives left: 2")));
    }
}
