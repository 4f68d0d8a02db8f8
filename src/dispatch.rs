//! Chord-to-action dispatch against the focused session.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use thiserror::Error;
use tracing::warn;

use crate::config::KeyBindingEntry;
use crate::session::{NoticeSender, RegistryState, SessionHandle, SessionRegistry, open_path};
use crate::ui::Presenter;

/// Environment variable carrying the working path to spawned commands.
pub const PATH_ENV_VAR: &str = "DIRWIN_PWD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pref {
    DotFiles,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    MoveCursor(Movement),
    OpenPath(String),
    NewWindow(Option<String>),
    Bookmark(usize),
    TogglePref(Pref),
    RunCommand(String),
    RunCommandCapturePath(String),
    SetPath(Option<String>),
    ActivateEntry,
    CloseWindow,
    FocusNext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub mods: KeyModifiers,
    pub key: KeyCode,
}

impl Chord {
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            mods: event.modifiers,
            key: event.code,
        }
    }
}

/// Modifier bits that are never part of a binding. Terminals speaking the
/// enhanced keyboard protocol can report these alongside ordinary chords.
const EXTRA_MODIFIERS: KeyModifiers = KeyModifiers::HYPER.union(KeyModifiers::META);

fn clean_modifiers(mods: KeyModifiers) -> KeyModifiers {
    mods & !EXTRA_MODIFIERS
}

fn lower_key(key: KeyCode) -> KeyCode {
    match key {
        KeyCode::Char(ch) => KeyCode::Char(ch.to_ascii_lowercase()),
        other => other,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("empty chord")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("unknown key `{0}`")]
    UnknownKey(String),
}

/// Parse a chord spec such as `ctrl+shift+j` or `backspace`.
pub fn parse_chord(spec: &str) -> Result<(KeyModifiers, KeyCode), ChordParseError> {
    let parts: Vec<&str> = spec.split('+').map(str::trim).collect();
    let (key_token, mod_tokens) = parts.split_last().ok_or(ChordParseError::Empty)?;

    let mut mods = KeyModifiers::NONE;
    for token in mod_tokens {
        mods |= match token.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "shift" => KeyModifiers::SHIFT,
            "alt" => KeyModifiers::ALT,
            "super" => KeyModifiers::SUPER,
            _ => return Err(ChordParseError::UnknownModifier((*token).to_string())),
        };
    }

    Ok((mods, parse_key(key_token)?))
}

fn parse_key(token: &str) -> Result<KeyCode, ChordParseError> {
    let lower = token.to_ascii_lowercase();
    let mut chars = lower.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(ch));
    }

    Ok(match lower.as_str() {
        "backspace" => KeyCode::Backspace,
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "page_up" => KeyCode::PageUp,
        "pagedown" | "page_down" => KeyCode::PageDown,
        "delete" | "del" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        _ => return Err(ChordParseError::UnknownKey(token.to_string())),
    })
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub mods: KeyModifiers,
    pub key: KeyCode,
    pub action: Action,
}

impl Binding {
    pub fn new(mods: KeyModifiers, key: KeyCode, action: Action) -> Self {
        Self {
            mods: clean_modifiers(mods),
            key: lower_key(key),
            action,
        }
    }
}

/// Static chord table, fixed after startup. Declaration order is matching
/// order, and every matching entry fires, not just the first.
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Build the table from config entries. Invalid chords or actions are
    /// logged and skipped so one bad line does not take the table down.
    pub fn from_config(entries: &[KeyBindingEntry]) -> Self {
        let mut bindings = Vec::with_capacity(entries.len());
        for entry in entries {
            let (mods, key) = match parse_chord(&entry.chord) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(chord = %entry.chord, error = %err, "skipping key binding");
                    continue;
                }
            };
            match parse_action(&entry.action, entry.arg.as_deref()) {
                Ok(action) => bindings.push(Binding::new(mods, key, action)),
                Err(err) => {
                    warn!(chord = %entry.chord, action = %entry.action, error = %err, "skipping key binding");
                }
            }
        }
        Self::new(bindings)
    }

    /// All actions bound to `chord`, in table order. Matching masks out the
    /// extra modifier bits and compares character keys case-insensitively.
    pub fn lookup(&self, chord: Chord) -> impl Iterator<Item = &Action> {
        let mods = clean_modifiers(chord.mods);
        let key = lower_key(chord.key);
        self.bindings
            .iter()
            .filter(move |binding| binding.mods == mods && binding.key == key)
            .map(|binding| &binding.action)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn parse_action(name: &str, arg: Option<&str>) -> Result<Action, String> {
    match name {
        "move_cursor" => match arg {
            Some("up") => Ok(Action::MoveCursor(Movement::Up)),
            Some("down") => Ok(Action::MoveCursor(Movement::Down)),
            Some("page_up") => Ok(Action::MoveCursor(Movement::PageUp)),
            Some("page_down") => Ok(Action::MoveCursor(Movement::PageDown)),
            Some("home") => Ok(Action::MoveCursor(Movement::Home)),
            Some("end") => Ok(Action::MoveCursor(Movement::End)),
            other => Err(format!("unknown movement {other:?}")),
        },
        "open_path" => arg
            .map(|path| Action::OpenPath(path.to_string()))
            .ok_or_else(|| "open_path requires a path argument".to_string()),
        "new_window" => Ok(Action::NewWindow(arg.map(str::to_string))),
        "bookmark" => arg
            .and_then(|index| index.parse().ok())
            .map(Action::Bookmark)
            .ok_or_else(|| "bookmark requires a numeric index".to_string()),
        "toggle_pref" => match arg {
            Some("dotfiles") => Ok(Action::TogglePref(Pref::DotFiles)),
            other => Err(format!("unknown preference {other:?}")),
        },
        "run_command" => arg
            .map(|template| Action::RunCommand(template.to_string()))
            .ok_or_else(|| "run_command requires a command template".to_string()),
        "run_command_capture_path" => arg
            .map(|template| Action::RunCommandCapturePath(template.to_string()))
            .ok_or_else(|| "run_command_capture_path requires a command template".to_string()),
        "set_path" => Ok(Action::SetPath(arg.map(str::to_string))),
        "activate_entry" => Ok(Action::ActivateEntry),
        "close_window" => Ok(Action::CloseWindow),
        "focus_next" => Ok(Action::FocusNext),
        other => Err(format!("unknown action `{other}`")),
    }
}

/// Substitute `%p` with `path` in a command template.
///
/// A `%` at the end of the template ends the expansion; any other escape is
/// swallowed whole.
pub fn format_command(template: &str, path: &str) -> String {
    let mut out = String::with_capacity(template.len() + path.len());
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('p') => out.push_str(path),
            Some(_) => {}
            None => break,
        }
    }
    out
}

/// Fire-and-forget spawn of `command_line` in `working_dir`. Exit status is
/// neither awaited nor tracked; failures are logged and dropped.
pub fn spawn_detached(command_line: &str, working_dir: &Path) {
    let argv = match shell_words::split(command_line) {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) => return,
        Err(err) => {
            warn!(command = command_line, error = %err, "unparsable command line");
            return;
        }
    };

    let spawned = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(working_dir)
        .env(PATH_ENV_VAR, working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(err) = spawned {
        warn!(command = command_line, error = %err, "failed to spawn command");
    }
}

/// Run `command_line` and capture exactly the first line of its stdout,
/// trimmed. The child is not awaited beyond that line.
pub fn capture_first_line(command_line: &str, working_dir: &Path) -> Option<String> {
    let argv = match shell_words::split(command_line) {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) => return None,
        Err(err) => {
            warn!(command = command_line, error = %err, "unparsable command line");
            return None;
        }
    };

    let mut child = match Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(working_dir)
        .env(PATH_ENV_VAR, working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(command = command_line, error = %err, "failed to spawn command");
            return None;
        }
    };

    let stdout = child.stdout.take()?;
    let mut line = String::new();
    if let Err(err) = BufReader::new(stdout).read_line(&mut line) {
        warn!(command = command_line, error = %err, "failed to read command output");
        return None;
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Continue,
    /// The focused session changed; the control loop should follow.
    Focus(SessionHandle),
    /// The last session was closed; shut the process down.
    Quit,
}

pub struct Dispatcher {
    table: BindingTable,
    bookmarks: Vec<String>,
    file_command: String,
    /// Hidden-file default for windows created after startup.
    default_show_hidden: bool,
}

impl Dispatcher {
    pub fn new(
        table: BindingTable,
        bookmarks: Vec<String>,
        file_command: String,
        default_show_hidden: bool,
    ) -> Self {
        Self {
            table,
            bookmarks,
            file_command,
            default_show_hidden,
        }
    }

    /// Run every action bound to `chord` against the focused session, in
    /// table order. `Quit` short-circuits; a later `Focus` supersedes an
    /// earlier one.
    pub fn dispatch(
        &self,
        chord: Chord,
        focused: &SessionHandle,
        registry: &SessionRegistry,
        notices: &NoticeSender,
        presenter: &mut dyn Presenter,
    ) -> DispatchOutcome {
        let actions: Vec<Action> = self.table.lookup(chord).cloned().collect();
        let mut outcome = DispatchOutcome::Continue;
        for action in &actions {
            match self.run_action(action, focused, registry, notices, presenter) {
                DispatchOutcome::Quit => return DispatchOutcome::Quit,
                DispatchOutcome::Focus(handle) => outcome = DispatchOutcome::Focus(handle),
                DispatchOutcome::Continue => {}
            }
        }
        outcome
    }

    fn run_action(
        &self,
        action: &Action,
        focused: &SessionHandle,
        registry: &SessionRegistry,
        notices: &NoticeSender,
        presenter: &mut dyn Presenter,
    ) -> DispatchOutcome {
        match action {
            Action::MoveCursor(movement) => {
                let session = focused.lock();
                presenter.move_cursor(&session, *movement);
            }
            Action::OpenPath(target) => {
                let mut session = focused.lock();
                open_path(&mut session, target, notices);
            }
            Action::NewWindow(explicit) => {
                let inherited = explicit.clone().or_else(|| {
                    focused
                        .lock()
                        .path
                        .as_ref()
                        .map(|path| path.to_string_lossy().into_owned())
                });
                let handle = registry.create(self.default_show_hidden);
                if let Some(candidate) = inherited {
                    let mut session = handle.lock();
                    open_path(&mut session, &candidate, notices);
                }
                return DispatchOutcome::Focus(handle);
            }
            Action::Bookmark(index) => {
                if let Some(target) = self.bookmarks.get(*index) {
                    let mut session = focused.lock();
                    open_path(&mut session, target, notices);
                }
            }
            Action::TogglePref(Pref::DotFiles) => {
                let mut session = focused.lock();
                session.show_hidden = !session.show_hidden;
                if let Some(path) = session.path.clone() {
                    let candidate = path.to_string_lossy().into_owned();
                    open_path(&mut session, &candidate, notices);
                }
            }
            Action::RunCommand(template) => {
                let Some(path) = focused.lock().path.clone() else {
                    return DispatchOutcome::Continue;
                };
                let command = format_command(template, &path.to_string_lossy());
                spawn_detached(&command, &path);
            }
            Action::RunCommandCapturePath(template) => {
                let Some(path) = focused.lock().path.clone() else {
                    return DispatchOutcome::Continue;
                };
                let command = format_command(template, &path.to_string_lossy());
                if let Some(candidate) = capture_first_line(&command, &path) {
                    let mut session = focused.lock();
                    open_path(&mut session, &candidate, notices);
                }
            }
            Action::SetPath(explicit) => {
                let input = match explicit {
                    Some(path) => Some(path.clone()),
                    None => {
                        // The prompt is modal; the session lock must not be
                        // held while it blocks on input.
                        let initial = focused
                            .lock()
                            .path
                            .as_ref()
                            .map(|path| path.display().to_string())
                            .unwrap_or_default();
                        presenter.prompt_text("Open path", &initial)
                    }
                };
                if let Some(text) = input {
                    let text = text.trim();
                    if !text.is_empty() {
                        let mut session = focused.lock();
                        open_path(&mut session, text, notices);
                    }
                }
            }
            Action::ActivateEntry => {
                let mut session = focused.lock();
                let Some(row) = presenter.selected_entry(&session) else {
                    return DispatchOutcome::Continue;
                };
                if row.is_dir {
                    let name = row.bare_name().to_string();
                    open_path(&mut session, &name, notices);
                } else if let Some(dir) = session.path.clone() {
                    let full = dir.join(row.bare_name());
                    let command = format_command(&self.file_command, &full.to_string_lossy());
                    drop(session);
                    spawn_detached(&command, &dir);
                }
            }
            Action::CloseWindow => {
                let id = focused.lock().id;
                match registry.unregister(id) {
                    RegistryState::Empty => return DispatchOutcome::Quit,
                    RegistryState::Active => {
                        presenter.session_closed(id);
                        if let Some(next) = registry.handles().into_iter().next() {
                            return DispatchOutcome::Focus(next);
                        }
                    }
                }
            }
            Action::FocusNext => {
                let id = focused.lock().id;
                let handles = registry.handles();
                if handles.len() > 1 {
                    let pos = handles
                        .iter()
                        .position(|handle| handle.lock().id == id)
                        .unwrap_or(0);
                    let next = Arc::clone(&handles[(pos + 1) % handles.len()]);
                    return DispatchOutcome::Focus(next);
                }
            }
        }
        DispatchOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::DirEntryRow;
    use crate::session::{Session, SessionId, notice_channel};
    use std::fs;

    struct NullPresenter;

    impl Presenter for NullPresenter {
        fn snapshot_ready(&mut self, _session: &Session, _title: &str) {}
        fn prompt_text(&mut self, _title: &str, _initial: &str) -> Option<String> {
            None
        }
        fn move_cursor(&mut self, _session: &Session, _movement: Movement) {}
        fn selected_entry(&self, _session: &Session) -> Option<DirEntryRow> {
            None
        }
        fn session_closed(&mut self, _id: SessionId) {}
    }

    fn dispatcher_with(table: BindingTable, bookmarks: Vec<String>) -> Dispatcher {
        Dispatcher::new(table, bookmarks, "true %p".to_string(), false)
    }

    #[test]
    fn chord_parsing() {
        assert_eq!(
            parse_chord("ctrl+j").unwrap(),
            (KeyModifiers::CONTROL, KeyCode::Char('j'))
        );
        assert_eq!(
            parse_chord("Ctrl+Shift+G").unwrap(),
            (
                KeyModifiers::CONTROL | KeyModifiers::SHIFT,
                KeyCode::Char('g')
            )
        );
        assert_eq!(
            parse_chord("backspace").unwrap(),
            (KeyModifiers::NONE, KeyCode::Backspace)
        );
        assert_eq!(
            parse_chord("alt+enter").unwrap(),
            (KeyModifiers::ALT, KeyCode::Enter)
        );
        assert!(matches!(
            parse_chord("hyper+j"),
            Err(ChordParseError::UnknownModifier(_))
        ));
        assert!(matches!(
            parse_chord("ctrl+notakey"),
            Err(ChordParseError::UnknownKey(_))
        ));
    }

    #[test]
    fn lookup_is_key_case_insensitive() {
        let table = BindingTable::new(vec![Binding::new(
            KeyModifiers::CONTROL,
            KeyCode::Char('j'),
            Action::MoveCursor(Movement::Down),
        )]);
        let chord = Chord {
            mods: KeyModifiers::CONTROL,
            key: KeyCode::Char('J'),
        };
        assert_eq!(table.lookup(chord).count(), 1);
    }

    #[test]
    fn lookup_masks_extra_modifier_bits() {
        let table = BindingTable::new(vec![Binding::new(
            KeyModifiers::CONTROL,
            KeyCode::Char('j'),
            Action::MoveCursor(Movement::Down),
        )]);
        let chord = Chord {
            mods: KeyModifiers::CONTROL | KeyModifiers::META,
            key: KeyCode::Char('j'),
        };
        assert_eq!(table.lookup(chord).count(), 1);

        let wrong = Chord {
            mods: KeyModifiers::CONTROL | KeyModifiers::SHIFT,
            key: KeyCode::Char('j'),
        };
        assert_eq!(table.lookup(wrong).count(), 0);
    }

    #[test]
    fn duplicate_bindings_all_fire_in_table_order() {
        let table = BindingTable::new(vec![
            Binding::new(
                KeyModifiers::CONTROL,
                KeyCode::Char('j'),
                Action::MoveCursor(Movement::Down),
            ),
            Binding::new(
                KeyModifiers::CONTROL,
                KeyCode::Char('k'),
                Action::MoveCursor(Movement::Up),
            ),
            Binding::new(
                KeyModifiers::CONTROL,
                KeyCode::Char('j'),
                Action::MoveCursor(Movement::PageDown),
            ),
        ]);
        let chord = Chord {
            mods: KeyModifiers::CONTROL,
            key: KeyCode::Char('j'),
        };
        let actions: Vec<&Action> = table.lookup(chord).collect();
        assert_eq!(
            actions,
            vec![
                &Action::MoveCursor(Movement::Down),
                &Action::MoveCursor(Movement::PageDown),
            ]
        );
    }

    #[test]
    fn invalid_config_entries_are_skipped() {
        let entries = vec![
            KeyBindingEntry {
                chord: "ctrl+j".to_string(),
                action: "move_cursor".to_string(),
                arg: Some("down".to_string()),
            },
            KeyBindingEntry {
                chord: "notachord+".to_string(),
                action: "move_cursor".to_string(),
                arg: Some("down".to_string()),
            },
            KeyBindingEntry {
                chord: "ctrl+k".to_string(),
                action: "not_an_action".to_string(),
                arg: None,
            },
        ];
        let table = BindingTable::from_config(&entries);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn command_formatting() {
        assert_eq!(format_command("edit %p", "/tmp/x"), "edit /tmp/x");
        assert_eq!(format_command("%p %p", "/a"), "/a /a");
        assert_eq!(format_command("echo %", "/a"), "echo ");
        assert_eq!(format_command("a%xb", "/a"), "ab");
        assert_eq!(format_command("plain", "/a"), "plain");
    }

    #[test]
    fn out_of_range_bookmark_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let (notices, rx) = notice_channel();
        {
            let mut session = handle.lock();
            open_path(&mut session, dir.path().to_str().unwrap(), &notices);
        }
        rx.try_recv().unwrap();
        let before = handle.lock().path.clone();

        let dispatcher = dispatcher_with(BindingTable::default(), vec!["/".to_string()]);
        dispatcher.run_action(
            &Action::Bookmark(10),
            &handle,
            &registry,
            &notices,
            &mut NullPresenter,
        );

        assert_eq!(handle.lock().path, before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn in_range_bookmark_opens_target() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let (notices, _rx) = notice_channel();

        let dispatcher = dispatcher_with(
            BindingTable::default(),
            vec![dir.path().to_string_lossy().into_owned()],
        );
        dispatcher.run_action(
            &Action::Bookmark(0),
            &handle,
            &registry,
            &notices,
            &mut NullPresenter,
        );

        assert_eq!(
            handle.lock().path.as_deref(),
            Some(fs::canonicalize(dir.path()).unwrap().as_path())
        );
    }

    #[test]
    fn toggle_pref_flips_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let (notices, _rx) = notice_channel();
        {
            let mut session = handle.lock();
            open_path(&mut session, dir.path().to_str().unwrap(), &notices);
            assert!(session.entries.is_empty());
        }

        let dispatcher = dispatcher_with(BindingTable::default(), Vec::new());
        dispatcher.run_action(
            &Action::TogglePref(Pref::DotFiles),
            &handle,
            &registry,
            &notices,
            &mut NullPresenter,
        );

        let session = handle.lock();
        assert!(session.show_hidden);
        assert_eq!(session.entries.len(), 1);
    }

    #[test]
    fn close_window_quits_only_on_last_session() {
        let registry = SessionRegistry::new();
        let first = registry.create(false);
        let second = registry.create(false);
        let (notices, _rx) = notice_channel();
        let dispatcher = dispatcher_with(BindingTable::default(), Vec::new());

        let outcome = dispatcher.run_action(
            &Action::CloseWindow,
            &first,
            &registry,
            &notices,
            &mut NullPresenter,
        );
        assert!(matches!(outcome, DispatchOutcome::Focus(_)));

        let outcome = dispatcher.run_action(
            &Action::CloseWindow,
            &second,
            &registry,
            &notices,
            &mut NullPresenter,
        );
        assert!(matches!(outcome, DispatchOutcome::Quit));
    }

    #[test]
    fn new_window_inherits_the_focused_path() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let (notices, _rx) = notice_channel();
        {
            let mut session = handle.lock();
            open_path(&mut session, dir.path().to_str().unwrap(), &notices);
        }

        let dispatcher = dispatcher_with(BindingTable::default(), Vec::new());
        let outcome = dispatcher.run_action(
            &Action::NewWindow(None),
            &handle,
            &registry,
            &notices,
            &mut NullPresenter,
        );

        let DispatchOutcome::Focus(created) = outcome else {
            panic!("expected focus change");
        };
        assert_eq!(created.lock().path, handle.lock().path);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn fan_out_runs_every_matching_action() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let (notices, _rx) = notice_channel();
        {
            let mut session = handle.lock();
            open_path(&mut session, dir.path().to_str().unwrap(), &notices);
        }

        // The same chord bound twice to the same toggle: fan-out means the
        // preference flips twice and lands where it started.
        let table = BindingTable::new(vec![
            Binding::new(
                KeyModifiers::CONTROL,
                KeyCode::Char('t'),
                Action::TogglePref(Pref::DotFiles),
            ),
            Binding::new(
                KeyModifiers::CONTROL,
                KeyCode::Char('t'),
                Action::TogglePref(Pref::DotFiles),
            ),
        ]);
        let dispatcher = dispatcher_with(table, Vec::new());
        dispatcher.dispatch(
            Chord {
                mods: KeyModifiers::CONTROL,
                key: KeyCode::Char('t'),
            },
            &handle,
            &registry,
            &notices,
            &mut NullPresenter,
        );

        assert!(!handle.lock().show_hidden);
    }

    #[test]
    fn capture_first_line_trims_and_takes_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let line = capture_first_line("echo first", dir.path()).unwrap();
        assert_eq!(line, "first");

        assert_eq!(capture_first_line("true", dir.path()), None);
    }

    #[test]
    fn set_path_with_argument_opens_without_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let handle = registry.create(false);
        let (notices, _rx) = notice_channel();

        let dispatcher = dispatcher_with(BindingTable::default(), Vec::new());
        dispatcher.run_action(
            &Action::SetPath(Some(dir.path().to_string_lossy().into_owned())),
            &handle,
            &registry,
            &notices,
            &mut NullPresenter,
        );

        assert_eq!(
            handle.lock().path.as_deref(),
            Some(fs::canonicalize(dir.path()).unwrap().as_path())
        );
    }
}
