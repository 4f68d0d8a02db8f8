use std::collections::HashMap;
use std::io::{Write, stdout};

use anyhow::Result;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use crossterm::{execute, queue};
use tracing::warn;

use crate::dispatch::Movement;
use crate::listing::DirEntryRow;
use crate::session::{Session, SessionId};
use crate::util::{format_mtime, human_size, permission_string, truncate};

/// Presentation collaborator consumed by the dispatcher and control loop.
/// The terminal implementation below is the stock "list view"; tests use
/// lightweight fakes.
pub trait Presenter {
    fn snapshot_ready(&mut self, session: &Session, title: &str);
    /// Modal line editor; returns the entered text, or None when cancelled.
    fn prompt_text(&mut self, title: &str, initial: &str) -> Option<String>;
    fn move_cursor(&mut self, session: &Session, movement: Movement);
    fn selected_entry(&self, session: &Session) -> Option<DirEntryRow>;
    fn session_closed(&mut self, id: SessionId);
}

const PERMS_WIDTH: usize = 9;
const SIZE_WIDTH: usize = 9;

struct ViewState {
    rows: Vec<DirEntryRow>,
    cursor: usize,
    title: String,
}

pub struct TerminalPresenter {
    time_format: String,
    views: HashMap<SessionId, ViewState>,
    /// Listing rows that fit the last drawn frame; page movement unit.
    page_rows: usize,
}

impl TerminalPresenter {
    pub fn new(time_format: String) -> Self {
        Self {
            time_format,
            views: HashMap::new(),
            page_rows: 20,
        }
    }

    pub fn enter(&self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide)?;
        Ok(())
    }

    pub fn leave(&self) -> Result<()> {
        execute!(stdout(), Show, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn draw(&mut self, session: &Session, index: usize, count: usize) -> Result<()> {
        let (width, height) = terminal::size()?;
        let width = width as usize;
        let body_rows = height.saturating_sub(3) as usize;
        self.page_rows = body_rows.max(1);

        let Some(view) = self.views.get(&session.id) else {
            return Ok(());
        };

        let mut out = stdout();
        queue!(out, Clear(ClearType::All), SetTitle(&view.title))?;

        let header = format!(" {} [{}/{}]", view.title, index + 1, count);
        queue!(
            out,
            MoveTo(0, 0),
            Print(truncate(&header, width).bold().reverse())
        )?;

        let name_width = name_column_width(width);
        let columns = format!(
            " {:<name_width$} {:<PERMS_WIDTH$} {:>SIZE_WIDTH$} Modified",
            "Name", "Perms", "Size"
        );
        queue!(out, MoveTo(0, 1), Print(truncate(&columns, width).dim()))?;

        // Keep the cursor inside the visible window.
        let first = if view.cursor >= body_rows {
            view.cursor + 1 - body_rows
        } else {
            0
        };
        for (offset, row) in view.rows.iter().skip(first).take(body_rows).enumerate() {
            let line = format!(
                " {:<name_width$} {:<PERMS_WIDTH$} {:>SIZE_WIDTH$} {}",
                truncate(&row.name, name_width),
                permission_string(row.mode),
                human_size(row.size_bytes),
                format_mtime(&self.time_format, row.modified),
            );
            let line = truncate(&line, width);
            let selected = first + offset == view.cursor;
            let styled = if selected {
                line.reverse()
            } else if row.is_dir {
                line.bold()
            } else {
                line.stylize()
            };
            queue!(out, MoveTo(0, 2 + offset as u16), Print(styled))?;
        }

        let footer = format!(
            " {} entries{}",
            view.rows.len(),
            if session.show_hidden { " · dotfiles" } else { "" }
        );
        queue!(
            out,
            MoveTo(0, height.saturating_sub(1)),
            Print(truncate(&footer, width).dim())
        )?;
        out.flush()?;
        Ok(())
    }

    fn draw_prompt(&self, title: &str, buffer: &str) -> Result<()> {
        let (width, height) = terminal::size()?;
        let line = truncate(&format!("{title}: {buffer}"), width as usize);
        let mut out = stdout();
        queue!(
            out,
            MoveTo(0, height.saturating_sub(1)),
            Clear(ClearType::CurrentLine),
            Print(line),
            Show
        )?;
        out.flush()?;
        Ok(())
    }
}

impl Presenter for TerminalPresenter {
    fn snapshot_ready(&mut self, session: &Session, title: &str) {
        let mut rows = session.entries.clone();
        sort_rows(&mut rows);
        let cursor = self
            .views
            .get(&session.id)
            .map(|view| view.cursor.min(rows.len().saturating_sub(1)))
            .unwrap_or(0);
        self.views.insert(
            session.id,
            ViewState {
                rows,
                cursor,
                title: title.to_string(),
            },
        );
    }

    fn prompt_text(&mut self, title: &str, initial: &str) -> Option<String> {
        let mut buffer = initial.to_string();
        let entered = loop {
            if let Err(err) = self.draw_prompt(title, &buffer) {
                warn!(error = %err, "prompt rendering failed");
                break None;
            }
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Enter => break Some(buffer),
                    KeyCode::Esc => break None,
                    KeyCode::Backspace => {
                        buffer.pop();
                    }
                    KeyCode::Char(ch) if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        match ch {
                            'c' => break None,
                            'u' => buffer.clear(),
                            _ => {}
                        }
                    }
                    KeyCode::Char(ch) => buffer.push(ch),
                    _ => {}
                },
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "prompt input failed");
                    break None;
                }
            }
        };
        let _ = execute!(stdout(), Hide);
        entered
    }

    fn move_cursor(&mut self, session: &Session, movement: Movement) {
        let page = self.page_rows;
        let Some(view) = self.views.get_mut(&session.id) else {
            return;
        };
        if view.rows.is_empty() {
            return;
        }
        let last = view.rows.len() - 1;
        view.cursor = match movement {
            Movement::Up => view.cursor.saturating_sub(1),
            Movement::Down => (view.cursor + 1).min(last),
            Movement::PageUp => view.cursor.saturating_sub(page),
            Movement::PageDown => (view.cursor + page).min(last),
            Movement::Home => 0,
            Movement::End => last,
        };
    }

    fn selected_entry(&self, session: &Session) -> Option<DirEntryRow> {
        let view = self.views.get(&session.id)?;
        view.rows.get(view.cursor).cloned()
    }

    fn session_closed(&mut self, id: SessionId) {
        self.views.remove(&id);
    }
}

/// Directories first, then case-insensitive by name.
fn sort_rows(rows: &mut [DirEntryRow]) {
    rows.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

fn name_column_width(width: usize) -> usize {
    const FIXED: usize = 2 + PERMS_WIDTH + 1 + SIZE_WIDTH + 1 + 19;
    width.saturating_sub(FIXED).max(12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRegistry;
    use std::time::SystemTime;

    fn row(name: &str, is_dir: bool) -> DirEntryRow {
        DirEntryRow {
            name: name.to_string(),
            mode: 0o644,
            size_bytes: 1,
            modified: SystemTime::UNIX_EPOCH,
            is_dir,
        }
    }

    #[test]
    fn rows_sort_directories_first_then_case_insensitive() {
        let mut rows = vec![
            row("zeta.txt", false),
            row("Beta/", true),
            row("alpha.txt", false),
            row("gamma/", true),
        ];
        sort_rows(&mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Beta/", "gamma/", "alpha.txt", "zeta.txt"]);
    }

    #[test]
    fn cursor_movement_clamps_to_listing() {
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let mut session = handle.lock();
        session.entries = vec![row("a", false), row("b", false), row("c", false)];

        let mut presenter = TerminalPresenter::new("%Y".to_string());
        presenter.snapshot_ready(&session, "/tmp");

        presenter.move_cursor(&session, Movement::Up);
        assert_eq!(presenter.selected_entry(&session).unwrap().name, "a");

        presenter.move_cursor(&session, Movement::End);
        assert_eq!(presenter.selected_entry(&session).unwrap().name, "c");

        presenter.move_cursor(&session, Movement::Down);
        assert_eq!(presenter.selected_entry(&session).unwrap().name, "c");

        presenter.move_cursor(&session, Movement::PageUp);
        assert_eq!(presenter.selected_entry(&session).unwrap().name, "a");
    }

    #[test]
    fn snapshot_ready_preserves_cursor_position_when_possible() {
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let mut session = handle.lock();
        session.entries = vec![row("a", false), row("b", false), row("c", false)];

        let mut presenter = TerminalPresenter::new("%Y".to_string());
        presenter.snapshot_ready(&session, "/tmp");
        presenter.move_cursor(&session, Movement::End);

        // Listing shrank underneath the cursor.
        session.entries = vec![row("a", false)];
        presenter.snapshot_ready(&session, "/tmp");
        assert_eq!(presenter.selected_entry(&session).unwrap().name, "a");
    }

    #[test]
    fn closed_sessions_lose_their_view() {
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let mut session = handle.lock();
        session.entries = vec![row("a", false)];

        let mut presenter = TerminalPresenter::new("%Y".to_string());
        presenter.snapshot_ready(&session, "/tmp");
        assert!(presenter.selected_entry(&session).is_some());

        presenter.session_closed(session.id);
        assert!(presenter.selected_entry(&session).is_none());
    }
}
