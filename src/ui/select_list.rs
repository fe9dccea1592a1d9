//! Built-in chooser: a filterable list drawn inline on stderr

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::{
    Terminal, TerminalOptions, Viewport,
    backend::{Backend, CrosstermBackend},
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};
use std::io;

use super::Theme;
use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::term::stderr_is_terminal;

/// Most rows the list takes on screen
const MAX_VISIBLE_ITEMS: usize = 10;

/// Items, the typed filter and the highlighted row
pub struct SelectListState {
    pub list_state: ListState,
    pub items: Vec<String>,
    pub filter: String,
    /// Indexes into `items` that match the filter
    matches: Vec<usize>,
}

impl SelectListState {
    pub fn new(items: Vec<String>) -> Self {
        let mut state = Self {
            list_state: ListState::default(),
            items,
            filter: String::new(),
            matches: Vec::new(),
        };
        state.refilter();
        state
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.refilter();
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.refilter();
    }

    fn refilter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.matches = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        self.list_state
            .select(if self.matches.is_empty() { None } else { Some(0) });
    }

    pub fn select_next(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.matches.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.matches.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Index into the unfiltered items
    pub fn selected(&self) -> Option<usize> {
        self.list_state
            .selected()
            .and_then(|i| self.matches.get(i))
            .copied()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

pub struct SelectListWidget<'a> {
    theme: &'a Theme,
}

impl<'a> SelectListWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }
}

impl StatefulWidget for SelectListWidget<'_> {
    type State = SelectListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let [prompt_area, list_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(area);

        let prompt = Line::from(vec![
            Span::styled(
                "> ",
                Style::default()
                    .fg(self.theme.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(state.filter.clone(), Style::default().fg(self.theme.fg)),
            Span::styled(
                format!("  {}/{}", state.match_count(), state.items.len()),
                Style::default().fg(self.theme.muted),
            ),
        ]);
        Paragraph::new(prompt).render(prompt_area, buf);

        let items: Vec<ListItem> = state
            .matches
            .iter()
            .map(|i| {
                ListItem::new(Span::styled(
                    state.items[*i].clone(),
                    Style::default().fg(self.theme.fg),
                ))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .bg(self.theme.highlight_bg)
                    .fg(self.theme.highlight_fg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        StatefulWidget::render(list, list_area, buf, &mut state.list_state);
    }
}

/// What a key press does to the chooser
enum KeyOutcome {
    Continue,
    Chosen(usize),
    Cancelled,
}

fn handle_key(state: &mut SelectListState, key: KeyEvent) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => KeyOutcome::Cancelled,
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => KeyOutcome::Cancelled,
        KeyCode::Enter => match state.selected() {
            Some(index) => KeyOutcome::Chosen(index),
            None => KeyOutcome::Continue,
        },
        KeyCode::Up => {
            state.select_previous();
            KeyOutcome::Continue
        }
        KeyCode::Char('p') | KeyCode::Char('k') if ctrl => {
            state.select_previous();
            KeyOutcome::Continue
        }
        KeyCode::Down | KeyCode::Tab => {
            state.select_next();
            KeyOutcome::Continue
        }
        KeyCode::Char('n') | KeyCode::Char('j') if ctrl => {
            state.select_next();
            KeyOutcome::Continue
        }
        KeyCode::Backspace => {
            state.pop_filter();
            KeyOutcome::Continue
        }
        KeyCode::Char(c) if !ctrl => {
            state.push_filter(c);
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

/// Inline list chooser, used when no external chooser is configured
#[derive(Default)]
pub struct ListSelector {
    theme: Theme,
}

impl ListSelector {
    pub fn new() -> Self {
        Self::default()
    }

    fn run<B: Backend>(&self, terminal: &mut Terminal<B>, state: &mut SelectListState) -> Result<usize> {
        loop {
            terminal.draw(|frame| {
                frame.render_stateful_widget(SelectListWidget::new(&self.theme), frame.area(), state)
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(state, key) {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Chosen(index) => return Ok(index),
                    KeyOutcome::Cancelled => return Err(Error::Cancelled),
                }
            }
        }
    }
}

impl Selector for ListSelector {
    fn select(&self, items: &[String]) -> Result<usize> {
        if !stderr_is_terminal() {
            return Err(Error::InvalidInput(
                "interactive selection needs a terminal, set select_cmd to use an external chooser"
                    .to_string(),
            ));
        }
        let mut state = SelectListState::new(items.to_vec());
        let height = (items.len().min(MAX_VISIBLE_ITEMS) + 1) as u16;

        enable_raw_mode()?;
        let backend = CrosstermBackend::new(io::stderr());
        let mut terminal = match Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        ) {
            Ok(terminal) => terminal,
            Err(e) => {
                disable_raw_mode()?;
                return Err(e.into());
            }
        };

        let result = self.run(&mut terminal, &mut state);

        terminal.clear().ok();
        disable_raw_mode()?;
        result
    }
}
