//! Terminal rendering of inputs.
//!
//! [`InputView`] borrows an [`Input`] and draws it as a bordered control,
//! the trailing action decorations, and the option list of a focused select.

use std::str::FromStr;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph, Widget},
};

use crate::{
    config::{ActionTone, StyleHints},
    input::Input,
    mask::{Mask, Slot},
    select::{SelectRow, filter},
    variant::Variant,
};

/// Most option rows shown below a focused select.
pub const DROPDOWN_ROWS: u16 = 6;

/// Shown in place of a tab character.
const TAB_GLYPH: char = '→';

/// Translate style hints into a ratatui style. Unknown colors are ignored.
pub fn to_style(hints: &StyleHints) -> Style {
    let mut style = Style::default();
    if let Some(fg) = hints.fg.as_deref().and_then(parse_color) {
        style = style.fg(fg);
    }
    if let Some(bg) = hints.bg.as_deref().and_then(parse_color) {
        style = style.bg(bg);
    }
    style
}

fn parse_color(name: &str) -> Option<Color> {
    Color::from_str(name)
        .map_err(|_| debug!("unknown color {name:?}"))
        .ok()
}

fn tone_style(tone: ActionTone) -> Style {
    match tone {
        ActionTone::Normal => Style::default(),
        ActionTone::Active => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ActionTone::Muted => Style::default().fg(Color::DarkGray),
    }
}

fn mask_cursor(mask: &Mask, filled: usize) -> usize {
    let mut seen = 0;
    for (i, slot) in mask.slots().iter().enumerate() {
        if let Slot::Editable(_) = slot {
            if seen == filled {
                return i;
            }
            seen += 1;
        }
    }
    mask.slots().len()
}

/// Display columns taken by the first `col` characters of line `row`.
fn display_col(text: &str, row: usize, col: usize) -> usize {
    let line = text.split('\n').nth(row).unwrap_or_default();
    let prefix: String = line.chars().take(col).collect();
    Span::raw(prefix).width()
}

struct Content {
    text: String,
    placeholder: bool,
    row: usize,
    /// Cursor column in display cells.
    col: usize,
}

/// Widget drawing one [`Input`].
pub struct InputView<'a> {
    input: &'a Input,
    title: Option<&'a str>,
    hints: StyleHints,
}

impl<'a> InputView<'a> {
    /// View with the input's own style hints.
    pub fn new(input: &'a Input) -> Self {
        Self {
            input,
            title: None,
            hints: input.config().style.clone(),
        }
    }

    /// Title drawn into the top border.
    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    /// Replace the style hints, e.g. with a class preset merged in.
    pub fn style(mut self, hints: StyleHints) -> Self {
        self.hints = hints;
        self
    }

    /// Rows needed to draw the view.
    pub fn height(&self) -> u16 {
        self.input.rows() + 2 + self.dropdown_rows()
    }

    fn dropdown_rows(&self) -> u16 {
        match self.input.variant() {
            Variant::Select(entries) if self.input.is_focused() => {
                let rows = filter(entries, self.input.select_state().query()).len();
                u16::try_from(rows)
                    .unwrap_or(u16::MAX)
                    .clamp(1, DROPDOWN_ROWS)
            }
            _ => 0,
        }
    }

    fn split(&self, area: Rect) -> (Rect, Rect, Rect) {
        let [top, dropdown] = Layout::vertical([
            Constraint::Length(self.input.rows() + 2),
            Constraint::Min(0),
        ])
        .areas(area);

        let reserved = self.input.reserved_width();
        let gap = u16::from(reserved > 0);
        let [control, _, actions] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(gap),
            Constraint::Length(reserved),
        ])
        .areas(top);

        (control, actions, dropdown)
    }

    fn content(&self) -> Content {
        let input = self.input;
        let focused = input.is_focused();

        if let Variant::Select(_) = input.variant() {
            let query = input.select_state().query();
            if focused && !query.is_empty() {
                return Content {
                    text: query.to_string(),
                    placeholder: false,
                    row: 0,
                    col: Span::raw(query).width(),
                };
            }
        }

        let text = input.display_text();
        if text.is_empty() {
            if let Some(placeholder) = input.placeholder() {
                return Content {
                    text: placeholder,
                    placeholder: true,
                    row: 0,
                    col: 0,
                };
            }
        }

        let (row, col) = match input.variant() {
            _ if !focused => (0, 0),
            Variant::Masked(mask) => (0, mask_cursor(mask, input.mask_fill().chars().count())),
            Variant::Select(_) => (0, text.chars().count()),
            _ => input.cursor_row_col(),
        };

        let text = text.replace('\t', &TAB_GLYPH.to_string());
        Content {
            col: display_col(&text, row, col),
            text,
            placeholder: false,
            row,
        }
    }

    fn block(&self) -> Block<'a> {
        let border = if self.input.is_invalid() {
            Style::default().fg(Color::Red)
        } else if self.input.is_focused() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let border_type = if self.hints.rounded {
            BorderType::Rounded
        } else {
            BorderType::Plain
        };

        let mut block = Block::bordered()
            .border_type(border_type)
            .border_style(border)
            .style(to_style(&self.hints));
        if let Some(title) = self.title {
            block = block.title(title);
        }
        block
    }

    fn scroll(content: &Content, inner: Rect) -> (u16, u16) {
        let offset = |pos: usize, len: u16| {
            let len = usize::from(len.max(1));
            u16::try_from((pos + 1).saturating_sub(len)).unwrap_or(u16::MAX)
        };
        (offset(content.row, inner.height), offset(content.col, inner.width))
    }

    /// Terminal position of the cursor, when the input is being edited.
    pub fn cursor_position(&self, area: Rect) -> Option<Position> {
        if !self.input.is_focused() || !self.input.variant().is_interactive() {
            return None;
        }
        let (control, _, _) = self.split(area);
        let inner = self.block().inner(control);
        let content = self.content();
        let (dy, dx) = Self::scroll(&content, inner);

        let x = u16::try_from(content.col).ok()?.checked_sub(dx)?;
        let y = u16::try_from(content.row).ok()?.checked_sub(dy)?;
        Some(Position::new(inner.x + x, inner.y + y))
    }

    fn render_actions(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height < 3 {
            return;
        }
        let mut spans = Vec::new();
        for (i, action) in self.input.actions().iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(action.symbol.as_str(), tone_style(action.tone)));
        }
        let row = Rect {
            y: area.y + 1,
            height: 1,
            ..area
        };
        Line::from(spans).render(row, buf);
    }

    fn render_dropdown(&self, area: Rect, buf: &mut Buffer) {
        let Variant::Select(entries) = self.input.variant() else {
            return;
        };
        if area.height == 0 || !self.input.is_focused() {
            return;
        }

        let state = self.input.select_state();
        let rows = filter(entries, state.query());
        if rows.is_empty() {
            Line::styled("  no match", Style::default().add_modifier(Modifier::DIM)).render(area, buf);
            return;
        }

        let highlighted = state.highlighted(entries);
        let selected_row = rows
            .iter()
            .position(|r| matches!(r, SelectRow::Option(o) if Some(*o) == highlighted))
            .unwrap_or(0);
        let skip = (selected_row + 1).saturating_sub(usize::from(area.height));

        for (y, row) in (area.y..area.bottom()).zip(rows.iter().skip(skip)) {
            let line_area = Rect {
                y,
                height: 1,
                ..area
            };
            let line = match row {
                SelectRow::Group(label) => {
                    Line::styled(*label, Style::default().add_modifier(Modifier::BOLD))
                }
                SelectRow::Option(o) => {
                    let mut spans = vec![Span::raw("  "), Span::raw(o.label())];
                    if let Some(sub) = &o.sub_label {
                        spans.push(Span::styled(
                            format!("  {sub}"),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    let line = Line::from(spans);
                    if Some(*o) == highlighted {
                        line.style(Style::default().add_modifier(Modifier::REVERSED))
                    } else {
                        line
                    }
                }
            };
            line.render(line_area, buf);
        }
    }
}

impl Widget for InputView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (control, actions, dropdown) = self.split(area);

        let block = self.block();
        let inner = block.inner(control);
        block.render(control, buf);

        let content = self.content();
        let text_style = if content.placeholder {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };
        Paragraph::new(content.text.as_str())
            .style(text_style)
            .scroll(Self::scroll(&content, inner))
            .render(inner, buf);

        self.render_actions(actions, buf);
        self.render_dropdown(dropdown, buf);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        config::{Action, FieldConfig},
        input::InputProps,
        key::Key,
        select::{SelectEntry, SelectOption},
        timer::TimerQueue,
    };

    fn mount(props: InputProps) -> Input {
        Input::new(props, Rc::new(TimerQueue::new()))
    }

    fn draw(input: &Input, width: u16) -> Buffer {
        let view = InputView::new(input);
        let area = Rect::new(0, 0, width, view.height());
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);
        buf
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (buf.area.left()..buf.area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn test_value_and_border() {
        let mut input = mount(InputProps::new(FieldConfig::new("second")).value("hello"));
        let buf = draw(&input, 12);
        assert_eq!(row(&buf, 1), "│hello     │");
        assert_eq!(buf[(0, 0)].fg, Color::DarkGray);

        input.focus();
        let buf = draw(&input, 12);
        assert_eq!(buf[(0, 0)].fg, Color::Yellow);
    }

    #[test]
    fn test_placeholder_and_rounded() {
        let cfg = FieldConfig {
            placeholder: Some("Text type".into()),
            style: StyleHints {
                rounded: true,
                ..Default::default()
            },
            ..FieldConfig::new("second")
        };
        let input = mount(InputProps::new(cfg));
        let buf = draw(&input, 12);
        assert_eq!(row(&buf, 0), "╭──────────╮");
        assert_eq!(row(&buf, 1), "│Text type │");
        assert!(buf[(1, 1)].modifier.contains(Modifier::DIM));
    }

    #[test]
    fn test_actions_reserve_space() {
        let input = mount(
            InputProps::new(FieldConfig::new("second"))
                .value("abcdefgh")
                .actions(vec![Action::new("●")]),
        );
        let buf = draw(&input, 12);
        assert_eq!(row(&buf, 1), "│abcdefgh│ ●");
        assert_eq!(row(&buf, 1).chars().count(), 12);
    }

    #[test]
    fn test_horizontal_scroll_follows_cursor() {
        let mut input = mount(InputProps::new(FieldConfig::new("second")).value("abcdefghijkl"));
        input.focus();
        let area = Rect::new(0, 0, 8, 3);
        let view = InputView::new(&input);
        assert_eq!(view.cursor_position(area), Some(Position::new(6, 1)));

        let mut buf = Buffer::empty(area);
        InputView::new(&input).render(area, &mut buf);
        assert_eq!(row(&buf, 1), "│hijkl │");
    }

    #[test]
    fn test_cursor_counts_wide_characters() {
        let mut input = mount(InputProps::new(FieldConfig::new("second")).value("日本語"));
        input.focus();
        let area = Rect::new(0, 0, 12, 3);
        assert_eq!(InputView::new(&input).cursor_position(area), Some(Position::new(7, 1)));

        input.handle_key(Key::Left);
        assert_eq!(InputView::new(&input).cursor_position(area), Some(Position::new(5, 1)));
    }

    #[test]
    fn test_masked_cursor_skips_literals() {
        let cfg = FieldConfig {
            mask: Some("111-111".into()),
            ..FieldConfig::new("four")
        };
        let mut input = mount(InputProps::new(cfg));
        let buf = draw(&input, 10);
        assert_eq!(row(&buf, 1), "│___-___ │");

        input.focus();
        for c in "123".chars() {
            input.handle_key(Key::Char(c));
        }
        let view = InputView::new(&input);
        assert_eq!(view.cursor_position(Rect::new(0, 0, 10, 3)), Some(Position::new(5, 1)));
        let buf = draw(&input, 10);
        assert_eq!(row(&buf, 1), "│123-___ │");
    }

    #[test]
    fn test_select_dropdown_and_invalid() {
        let options: Vec<SelectEntry> = ["first element", "second element", "third element"]
            .into_iter()
            .map(|v| SelectOption::new(v).into())
            .collect();
        let cfg = FieldConfig {
            options: Some(options),
            ..FieldConfig::new("five")
        };
        let mut input = mount(InputProps::new(cfg).value("unknown"));
        assert_eq!(InputView::new(&input).height(), 3);
        let buf = draw(&input, 20);
        assert_eq!(buf[(0, 0)].fg, Color::Red);

        input.focus();
        assert_eq!(InputView::new(&input).height(), 6);
        for c in "third".chars() {
            input.handle_key(Key::Char(c));
        }
        assert_eq!(InputView::new(&input).height(), 4);
        let buf = draw(&input, 20);
        assert_eq!(row(&buf, 1), "│third             │");
        assert_eq!(row(&buf, 3), "  third element     ");
        assert!(buf[(2, 3)].modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn test_tabs_are_visible() {
        let cfg = FieldConfig {
            allow_tabs: true,
            ..FieldConfig::new("second")
        };
        let input = mount(InputProps::new(cfg).value("a\tb"));
        let buf = draw(&input, 8);
        assert_eq!(row(&buf, 1), "│a→b   │");
    }

    #[test]
    fn test_to_style() {
        let hints = StyleHints {
            fg: Some("black".into()),
            bg: Some("not-a-color".into()),
            ..Default::default()
        };
        let style = to_style(&hints);
        assert_eq!(style.fg, Some(Color::Black));
        assert_eq!(style.bg, None);
    }
}
