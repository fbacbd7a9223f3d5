use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::entry::{Entry, Field};
use crate::input::InputBuffer;
use crate::lifecycle::FieldEditor;
use crate::terminal::Terminal;

/// A titled list of `(tag, description)` choices.
pub struct ChoiceList {
    title: String,
    items: Vec<(String, String)>,
    state: ListState,
}

impl ChoiceList {
    pub fn new(title: impl Into<String>, items: Vec<(String, String)>) -> Self {
        Self {
            title: title.into(),
            items,
            state: ListState::default().with_selected(Some(0)),
        }
    }

    /// Index of the chosen item, `None` on Esc.
    pub fn choose(&mut self, terminal: &mut Terminal<impl Write>) -> io::Result<Option<usize>> {
        if self.items.is_empty() {
            return Ok(None);
        }
        loop {
            terminal.draw(|f| self.ui(f))?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let current = self.state.selected().unwrap_or(0);
            match key.code {
                KeyCode::Up => {
                    let i = current.checked_sub(1).unwrap_or(self.items.len() - 1);
                    self.state.select(Some(i));
                }
                KeyCode::Down => self.state.select(Some((current + 1) % self.items.len())),
                KeyCode::Enter => return Ok(Some(current)),
                KeyCode::Esc | KeyCode::Char('q') => return Ok(None),
                _ => {}
            }
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let tag_width = self
            .items
            .iter()
            .map(|(tag, _)| tag.chars().count())
            .max()
            .unwrap_or(0);
        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|(tag, description)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{tag:<tag_width$}  "),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(description.as_str()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(self.title.as_str()))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let recs = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(f.size());
        StatefulWidget::render(list, recs[0], f.buffer_mut(), &mut self.state);
        Paragraph::new(Line::from("(↑/↓) move | (Enter) choose | (Esc) back"))
            .centered()
            .render(recs[1], f.buffer_mut());
    }
}

/// Asks a yes/no question; Esc counts as no.
pub fn confirm(terminal: &mut Terminal<impl Write>, question: &str) -> io::Result<bool> {
    let mut list = ChoiceList::new(
        question,
        vec![
            ("No".to_string(), String::new()),
            ("Yes".to_string(), String::new()),
        ],
    );
    Ok(list.choose(terminal)? == Some(1))
}

/// Single-line editor pre-filled with `initial`. `None` on Esc.
pub fn input_box(
    terminal: &mut Terminal<impl Write>,
    title: &str,
    initial: &str,
) -> io::Result<Option<String>> {
    let mut buffer = InputBuffer::with_value(String::new(), initial.to_string());
    loop {
        terminal.draw(|f| {
            let recs = Layout::vertical([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(f.size());
            Paragraph::new(Text::from(buffer.line()).style(Style::default().fg(Color::Cyan)))
                .block(Block::default().borders(Borders::ALL).title(title))
                .render(recs[0], f.buffer_mut());
            Paragraph::new(Line::from("(Enter) save | (Esc) cancel"))
                .centered()
                .render(recs[1], f.buffer_mut());
            f.set_cursor(recs[0].x + 1 + buffer.visual_cursor() as u16, recs[0].y + 1);
        })?;

        let event = event::read()?;
        if let Event::Key(key) = &event {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(Some(buffer.value().to_string())),
                KeyCode::Esc => return Ok(None),
                _ => {}
            }
        }
        buffer.handle_event(event);
    }
}

/// Field-by-field editing through the menu: pick a field, then type a value.
pub struct TerminalFieldEditor<'t, W: Write> {
    terminal: &'t mut Terminal<W>,
}

impl<'t, W: Write> TerminalFieldEditor<'t, W> {
    pub fn new(terminal: &'t mut Terminal<W>) -> Self {
        Self { terminal }
    }
}

impl<W: Write> FieldEditor for TerminalFieldEditor<'_, W> {
    fn next_edit(&mut self, entry: &Entry) -> crate::Result<Option<(Field, String)>> {
        loop {
            let items = Field::EDITABLE
                .iter()
                .map(|f| (f.label().to_string(), entry.field(*f).to_string()))
                .collect();
            let mut list = ChoiceList::new(format!(" Edit {} ", entry.name), items);
            let Some(index) = list.choose(&mut *self.terminal)? else {
                return Ok(None);
            };

            let field = Field::EDITABLE[index];
            let current = entry.field(field);
            let title = format!(" Edit {} ", field.label());
            match input_box(&mut *self.terminal, &title, current)? {
                Some(value) if value != current => return Ok(Some((field, value))),
                _ => continue,
            }
        }
    }
}
