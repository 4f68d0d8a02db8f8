use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyEventKind};

use crate::cli::Cli;
use crate::config::{self, BrowserConfig};
use crate::dispatch::{BindingTable, Chord, DispatchOutcome, Dispatcher};
use crate::poller::{self, StopSignal};
use crate::session::{Notice, NoticeSender, SessionHandle, SessionRegistry, notice_channel, open_path};
use crate::ui::{Presenter, TerminalPresenter};

pub fn run(cli: Cli, config: BrowserConfig) -> Result<()> {
    let runtime = config::runtime_settings(&config);

    let stop = StopSignal::new();
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.trigger())
            .context("failed to install Ctrl+C handler")?;
    }

    let registry = Arc::new(SessionRegistry::new());
    let (notices, notice_rx) = notice_channel();

    let table = BindingTable::from_config(&config.keys);
    let dispatcher = Dispatcher::new(
        table,
        config.bookmarks.clone(),
        config.file_command.clone(),
        cli.dotfiles,
    );

    let focused = registry.create(cli.dotfiles);
    {
        let mut session = focused.lock();
        open_path(&mut session, &cli.path, &notices);
        if session.path.is_none() {
            bail!(
                "cannot open starting directory {:?} or any of its ancestors",
                cli.path
            );
        }
    }

    let poller = poller::spawn(
        Arc::clone(&registry),
        notices.clone(),
        runtime.poll_interval,
        Arc::clone(&stop),
    );

    let mut presenter = TerminalPresenter::new(config.time_format.clone());
    presenter.enter()?;
    let result = event_loop(
        &registry,
        focused,
        &dispatcher,
        &notices,
        &notice_rx,
        &mut presenter,
        &stop,
    );
    let _ = presenter.leave();

    stop.trigger();
    let _ = poller.join();
    result
}

fn event_loop(
    registry: &SessionRegistry,
    mut focused: SessionHandle,
    dispatcher: &Dispatcher,
    notices: &NoticeSender,
    notice_rx: &Receiver<Notice>,
    presenter: &mut TerminalPresenter,
    stop: &StopSignal,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if stop.is_stopped() {
            return Ok(());
        }

        for notice in notice_rx.try_iter() {
            match notice {
                Notice::SnapshotReady { session, title } => {
                    if let Some(handle) = registry.find(session) {
                        let session = handle.lock();
                        presenter.snapshot_ready(&session, &title);
                    }
                    dirty = true;
                }
            }
        }

        if dirty {
            draw_focused(registry, &focused, presenter)?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let outcome =
                        dispatcher.dispatch(Chord::from_event(&key), &focused, registry, notices, presenter);
                    match outcome {
                        DispatchOutcome::Quit => stop.trigger(),
                        DispatchOutcome::Focus(handle) => focused = handle,
                        DispatchOutcome::Continue => {}
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
}

fn draw_focused(
    registry: &SessionRegistry,
    focused: &SessionHandle,
    presenter: &mut TerminalPresenter,
) -> Result<()> {
    let handles = registry.handles();
    let count = handles.len().max(1);
    let index = handles
        .iter()
        .position(|handle| Arc::ptr_eq(handle, focused))
        .unwrap_or(0);

    let session = focused.lock();
    presenter.draw(&session, index, count)
}
