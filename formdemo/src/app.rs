//! Terminal application and the non-interactive commands.
//!
//! The event loop runs on a current-thread runtime and waits on three
//! sources at once: terminal events, the next input timer, and the store
//! poll interval. The timer queue clock is moved to the wall clock before
//! anything else happens on every wake-up.

use std::{path::Path, rc::Rc, time::Duration};

use anyhow::Context;
use colored::Colorize;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
};
use tokio::time::{Instant, MissedTickBehavior};
use uinput::{InputView, Key, TimerQueue};

use crate::{
    form::Form,
    settings::FormSettings,
    store::{FileStore, Store},
    values::{STORAGE_KEY, Values},
};

const HELP: &str = "Tab/Shift-Tab move  Esc leave field  Ctrl-Q quit";

/// Interactive form session.
pub struct App {
    form: Form,
    timers: Rc<TimerQueue>,
    store: Rc<FileStore>,
    poll_interval: Duration,
    should_quit: bool,
}

impl App {
    /// Open the store and build the form.
    pub fn new(settings: &FormSettings, store_path: &Path) -> anyhow::Result<Self> {
        let store = Rc::new(
            FileStore::open(store_path)
                .with_context(|| format!("Failed to open store {}", store_path.display()))?,
        );
        let timers = Rc::new(TimerQueue::new());
        let form = Form::new(settings, store.clone(), timers.clone());
        info!(
            "form `{}` opened on {} with {} fields",
            settings.title,
            store_path.display(),
            form.fields().len()
        );

        Ok(Self {
            form,
            timers,
            store,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            should_quit: false,
        })
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Take over the terminal until the user quits.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal).await;
        ratatui::restore();
        result
    }

    async fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        let mut events = EventStream::new();
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;

            let deadline = self.timers.next_deadline();
            let timer = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(Instant::from_std(at)).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        self.tick();
                        self.handle_event(event);
                    }
                    Some(Err(e)) => return Err(e).context("terminal event stream failed"),
                    None => break,
                },
                _ = timer => self.tick(),
                _ = poll.tick() => {
                    self.tick();
                    self.poll_store();
                }
            }
        }

        // commit whatever is being edited
        self.form.blur_all();
        info!("form closed");
        Ok(())
    }

    /// Bring the timer clock to the wall clock and run due timers.
    fn tick(&mut self) {
        if self.timers.advance_to(std::time::Instant::now()) > 0 {
            self.form.refresh();
        }
    }

    fn poll_store(&mut self) {
        match self.store.poll_external() {
            Ok(0) => {}
            Ok(n) => {
                debug!("{n} external store changes");
                self.form.refresh();
            }
            Err(e) => warn!("polling store failed: {e}"),
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(..) => self.form.resize(),
            _ => {}
        }
    }

    fn handle_key(&mut self, event: KeyEvent) {
        if event.kind == KeyEventKind::Release {
            return;
        }
        if event.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(event.code, KeyCode::Char('q') | KeyCode::Char('c'))
        {
            self.should_quit = true;
            return;
        }
        if let Some(key) = Key::from_event(&event) {
            self.form.handle_key(key);
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let fields = self.form.fields();
        let views: Vec<InputView> = fields
            .iter()
            .map(|f| {
                InputView::new(f.input())
                    .title(f.config().key.as_str())
                    .style(f.style().clone())
            })
            .collect();

        let mut rows = vec![Constraint::Length(2)];
        rows.extend(views.iter().map(|v| Constraint::Length(v.height())));
        rows.push(Constraint::Min(0));
        rows.push(Constraint::Length(1));
        let areas = Layout::vertical(rows).split(frame.area());

        frame.render_widget(
            Line::styled(self.form.title(), Style::default().add_modifier(Modifier::BOLD)),
            areas[0],
        );

        for (i, (view, field)) in views.into_iter().zip(fields).enumerate() {
            let area = field_area(areas[i + 1], field.style().width);
            let cursor = view.cursor_position(area);
            frame.render_widget(view, area);
            if let Some(pos) = cursor {
                frame.set_cursor_position(pos);
            }
        }

        let footer = format!("{HELP}  |  {}", self.store.path().display());
        frame.render_widget(
            Line::styled(footer, Style::default().add_modifier(Modifier::DIM)),
            areas[areas.len() - 1],
        );
    }
}

fn field_area(row: Rect, width_percent: Option<u16>) -> Rect {
    let percent = width_percent.unwrap_or(100).clamp(1, 100);
    let width = u16::try_from(u32::from(row.width) * u32::from(percent) / 100).unwrap_or(row.width);
    Rect { width, ..row }
}

/// Render the stored mapping for `formdemo dump`.
pub fn dump(store: &dyn Store) -> anyhow::Result<String> {
    let Some(raw) = store.get(STORAGE_KEY)? else {
        return Ok(format!("{}", "no values stored".yellow()));
    };
    let values = Values::parse(&raw).context("stored values are unreadable")?;

    let width = values.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let lines: Vec<String> = values
        .iter()
        .map(|(k, v)| format!("{}  {v}", format!("{k:width$}").cyan().bold()))
        .collect();
    Ok(lines.join("\n"))
}

/// Remove the stored mapping; open sessions fall back to their defaults.
pub fn reset(store: &dyn Store) -> anyhow::Result<()> {
    store.remove(STORAGE_KEY)?;
    info!("stored values removed");
    Ok(())
}
