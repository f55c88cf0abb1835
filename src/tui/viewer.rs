use color_eyre::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout};
use ratatui::text::Line;
use std::io;
use std::time::Duration;

use crate::render::Visual;
use crate::tui::theme::Theme;
use crate::tui::visual::VisualWidget;

/// Show a visual full-screen until `q` or `Esc`
pub fn show(title: &str, visual: &Visual, theme: Theme) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run_viewer(&mut terminal, title, visual, &theme);

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    res
}

fn run_viewer<B: Backend>(terminal: &mut Terminal<B>, title: &str, visual: &Visual, theme: &Theme) -> Result<()> {
    loop {
        terminal.draw(|f| {
            let [header, body, footer] =
                Layout::vertical([Constraint::Length(1), Constraint::Fill(1), Constraint::Length(1)]).areas(f.area());
            f.render_widget(Line::styled(title.to_string(), theme.title_style()), header);
            f.render_widget(VisualWidget::new(visual).theme(theme.clone()), body);
            f.render_widget(Line::styled("q / Esc to quit", theme.muted_style()), footer);
        })?;

        if event::poll(Duration::from_millis(200))?
            && let CEvent::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
        {
            break;
        }
    }
    Ok(())
}
