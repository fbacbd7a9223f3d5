use std::io::{self, Write};

use crate::entry::Entry;
use crate::input::InputBuffer;
use crate::terminal::Terminal;

use ratatui::prelude::*;
use ratatui::widgets::*;

use crossterm::event::{self, Event, KeyEventKind};
use unicode_width::UnicodeWidthStr;
use uuid::Uuid;

use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};

const INFO_TEXT_NORMAL_MODE: &str =
    "(Esc) quit | (↑) move up | (↓) move down | (Enter) select | (a) add | (/) search";
const INFO_TEXT_SEARCH_MODE: &str =
    "(Esc) quit search | (↑) move up | (↓) move down | (Enter) select";
const SEARCH_SYMBOL: &str = "🔍 ";

enum Mode {
    Normal,
    Search,
}

/// What the user asked for from the entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Entry(Uuid),
    Add,
    Quit,
}

struct Item {
    id: Uuid,
    name: String,
    address: String,
    description: String,
}

/// Searchable table of entries. Rows are matched back to entries by id, so
/// two boards sharing a name stay distinguishable.
pub struct SelectBox {
    data: Vec<Item>,
    state: TableState,
    longest_item_lens: (u16, u16), // order is (name, address)
    // indices into `data` of the rows currently shown, with match positions
    displayed: Vec<(usize, [Vec<usize>; 3])>,
    input_buffer: InputBuffer,
    mode: Mode,
}

impl SelectBox {
    pub fn new(entries: &[Entry]) -> Self {
        let mut select_box = Self {
            data: Vec::new(),
            state: TableState::default().with_selected(0),
            longest_item_lens: (0, 0),
            displayed: Vec::new(),
            input_buffer: InputBuffer::new(SEARCH_SYMBOL.to_string()),
            mode: Mode::Normal,
        };
        select_box.set_entries(entries);
        select_box
    }

    pub fn set_entries(&mut self, entries: &[Entry]) {
        self.data = entries
            .iter()
            .map(|e| Item {
                id: e.id,
                name: e.name.clone(),
                address: e.address.clone(),
                description: e.description.clone(),
            })
            .collect();
        self.longest_item_lens = (
            self.data
                .iter()
                .map(|d| UnicodeWidthStr::width(d.name.as_str()))
                .max()
                .unwrap_or(0) as u16,
            self.data
                .iter()
                .map(|d| UnicodeWidthStr::width(d.address.as_str()))
                .max()
                .unwrap_or(0) as u16,
        );
        self.refilter();
    }

    /// Blocks until the user picks an entry, asks to add one, or quits.
    /// `status` is shown above the key help, e.g. the last launch error.
    pub fn select(
        &mut self,
        terminal: &mut Terminal<impl Write>,
        status: Option<&str>,
    ) -> io::Result<Selection> {
        loop {
            self.draw(terminal, status)?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            use event::KeyCode::*;
            match key.code {
                Down => self.down(),
                Up => self.up(),
                Enter => {
                    // nothing to pick when the filter matches no rows
                    if let Some(id) = self.selected_id() {
                        terminal.clear()?;
                        return Ok(Selection::Entry(id));
                    }
                }
                _ => match self.mode {
                    Mode::Normal => match key.code {
                        Esc | Char('q') => {
                            terminal.clear()?;
                            return Ok(Selection::Quit);
                        }
                        Char('a') => {
                            terminal.clear()?;
                            return Ok(Selection::Add);
                        }
                        Char('/') => {
                            self.mode = Mode::Search;
                            self.input_buffer.reset();
                        }
                        _ => {}
                    },
                    Mode::Search => {
                        match key.code {
                            Esc => {
                                self.input_buffer.reset();
                                self.mode = Mode::Normal;
                            }
                            _ => self.input_buffer.handle_event(Event::Key(key)),
                        }
                        self.refilter();
                    }
                },
            }
        }
    }

    fn selected_id(&self) -> Option<Uuid> {
        let row = self.state.selected()?;
        let (index, _) = self.displayed.get(row)?;
        self.data.get(*index).map(|item| item.id)
    }

    fn draw(&mut self, terminal: &mut Terminal<impl Write>, status: Option<&str>) -> io::Result<()> {
        terminal.draw(|frame| {
            self.ui(frame, status);
        })?;
        Result::Ok(())
    }

    fn ui(&mut self, f: &mut Frame, status: Option<&str>) {
        let header = Row::new(vec![
            Cell::from("Name").style(Style::default().add_modifier(Modifier::UNDERLINED)),
            Cell::from("Address").style(Style::default().add_modifier(Modifier::UNDERLINED)),
            Cell::from("Description").style(Style::default().add_modifier(Modifier::UNDERLINED)),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows: Vec<_> = self
            .displayed
            .iter()
            .map(|(index, indices)| {
                let item = &self.data[*index];
                Row::new([
                    Text::from(Line::from(Self::get_highlight_spans(&item.name, &indices[0]))),
                    Text::from(Line::from(Self::get_highlight_spans(&item.address, &indices[1]))),
                    Text::from(Line::from(Self::get_highlight_spans(
                        &item.description,
                        &indices[2],
                    ))),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(self.longest_item_lens.0 + 1),
                Constraint::Length(self.longest_item_lens.1 + 1),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(" BBS Dialer "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_spacing(HighlightSpacing::Always);

        let info = match self.mode {
            Mode::Normal => Paragraph::new(Line::from(INFO_TEXT_NORMAL_MODE)).centered(),
            Mode::Search => Paragraph::new(Line::from(INFO_TEXT_SEARCH_MODE)).centered(),
        };
        let status = Paragraph::new(Line::from(status.unwrap_or_default()))
            .style(Style::default().fg(Color::Red));

        if matches!(self.mode, Mode::Search) {
            let recs = Layout::vertical([
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.size());

            let input = Paragraph::new(
                Text::from(self.input_buffer.line()).style(Style::default().fg(Color::Cyan)),
            )
            .block(Block::default().borders(Borders::ALL));

            StatefulWidget::render(table, recs[0], f.buffer_mut(), &mut self.state);
            input.render(recs[1], f.buffer_mut());
            status.render(recs[2], f.buffer_mut());
            info.render(recs[3], f.buffer_mut());

            f.set_cursor(
                recs[1].x + 1 + self.input_buffer.visual_cursor() as u16,
                recs[1].y + 1,
            );
        } else {
            let recs = Layout::vertical([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.size());

            StatefulWidget::render(table, recs[0], f.buffer_mut(), &mut self.state);
            status.render(recs[1], f.buffer_mut());
            info.render(recs[2], f.buffer_mut());
        }
    }

    fn up(&mut self) {
        if self.displayed.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.displayed.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i))
    }

    fn down(&mut self) {
        if self.displayed.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.displayed.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i))
    }

    fn refilter(&mut self) {
        self.displayed = if self.input_buffer.input.value().is_empty() {
            (0..self.data.len())
                .map(|i| (i, [Vec::new(), Vec::new(), Vec::new()]))
                .collect()
        } else {
            self.fuzzy_match()
        };

        let selected = match self.state.selected() {
            _ if self.displayed.is_empty() => None,
            Some(i) => Some(i.min(self.displayed.len() - 1)),
            None => Some(0),
        };
        self.state.select(selected);
    }

    // match order: name, address, description
    fn fuzzy_match(&self) -> Vec<(usize, [Vec<usize>; 3])> {
        let matcher = SkimMatcherV2::default();
        let pattern = self.input_buffer.input.value();
        self.data
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let indices = [&item.name, &item.address, &item.description].map(|text| {
                    matcher
                        .fuzzy_indices(text, pattern)
                        .map(|(_, indices)| indices)
                        .unwrap_or_default()
                });

                if indices.iter().all(Vec::is_empty) {
                    None
                } else {
                    Some((index, indices))
                }
            })
            .collect()
    }

    fn get_highlight_spans<'b>(input: &str, indices: &[usize]) -> Vec<Span<'b>> {
        let mut spans = Vec::new();
        let mut current_segment = String::new();
        let mut index_set: Vec<usize> = indices.to_vec();
        index_set.sort_unstable();
        index_set.dedup();

        let highlight_style = Style::default()
            .fg(Color::Rgb(250, 0, 0))
            .bg(Color::Rgb(0xFF, 0xFC, 0x67))
            .add_modifier(Modifier::BOLD);
        for (i, c) in input.chars().enumerate() {
            if index_set.binary_search(&i).is_ok() {
                if !current_segment.is_empty() {
                    spans.push(Span::raw(current_segment.clone()));
                    current_segment.clear();
                }
                spans.push(Span::styled(c.to_string(), highlight_style));
            } else {
                current_segment.push(c);
            }
        }

        if !current_segment.is_empty() {
            spans.push(Span::raw(current_segment));
        }

        spans
    }
}
