use std::io::{self, Stdout};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap,
};
use tracing::{info, warn};

use crate::api::SpaceApi;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::input::{InputError, Rover};
use crate::pipeline::{self, ChannelSink, PipelineEvent, Request};
use crate::render::{Card, Hazard};
use crate::session::{Mode, ViewState};
use crate::status::Tone;
use crate::text_sanitize::{sanitize, sanitize_field};
use crate::transform::MAX_RESULTS;

const GRID_COLUMNS: usize = 4;
const DATE_INPUT_MAX: usize = 10;
const QUERY_INPUT_MAX: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Start,
    End,
}

struct App {
    api: Arc<dyn SpaceApi>,
    view: ViewState,

    query: String,
    quick_tags: Vec<String>,
    tag_list: ListState,

    rover_list: ListState,

    start_date: String,
    end_date: String,
    date_field: DateField,

    events_tx: mpsc::Sender<PipelineEvent>,
    events_rx: mpsc::Receiver<PipelineEvent>,
    in_flight: usize,
    last_elapsed_ms: Option<u128>,
}

impl App {
    fn new(api: Arc<dyn SpaceApi>, settings: &Settings) -> Self {
        let (events_tx, events_rx) = mpsc::channel::<PipelineEvent>();
        let mut rover_list = ListState::default();
        rover_list.select(Some(settings.ui.default_rover.index()));
        Self {
            api,
            view: ViewState::default(),
            query: String::new(),
            quick_tags: settings.ui.quick_tags.clone(),
            tag_list: ListState::default(),
            rover_list,
            start_date: String::new(),
            end_date: String::new(),
            date_field: DateField::Start,
            events_tx,
            events_rx,
            in_flight: 0,
            last_elapsed_ms: None,
        }
    }

    fn selected_rover(&self) -> Rover {
        self.rover_list
            .selected()
            .and_then(|i| Rover::ALL.get(i).copied())
            .unwrap_or_default()
    }

    fn switch_mode(&mut self, mode: Mode) {
        self.view.switch_mode(mode);
    }

    /// Validation failures stay synchronous; everything else goes to a
    /// worker thread under a fresh ticket.
    fn submit(&mut self, parsed: std::result::Result<Request, InputError>) {
        let request = match parsed {
            Ok(r) => r,
            Err(e) => {
                self.view.report_invalid(e);
                return;
            }
        };
        let ticket = self.view.begin(request.mode(), request.query());
        let sink = Arc::new(ChannelSink::new(self.events_tx.clone()));
        self.in_flight = self.in_flight.saturating_add(1);
        pipeline::spawn(self.api.clone(), ticket, request, sink);
    }

    fn submit_search(&mut self) {
        let parsed = Request::search(&self.query);
        self.submit(parsed);
    }

    fn submit_rover(&mut self) {
        let rover = self.selected_rover();
        self.submit(Ok(Request::Rover(rover)));
    }

    fn submit_asteroids(&mut self) {
        let parsed = Request::asteroids(&self.start_date, &self.end_date);
        self.submit(parsed);
    }

    /// A quick tag behaves like typing its text and pressing Enter.
    fn select_tag(&mut self, delta: isize) {
        if self.quick_tags.is_empty() {
            return;
        }
        let len = self.quick_tags.len() as isize;
        let next: isize = match self.tag_list.selected() {
            Some(i) => (i as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        let next = next as usize;
        self.tag_list.select(Some(next));
        self.query = self.quick_tags[next].clone();
        self.submit_search();
    }

    fn select_rover(&mut self, delta: isize) {
        let len = Rover::ALL.len() as isize;
        let i = self.rover_list.selected().unwrap_or(0) as isize;
        self.rover_list
            .select(Some((i + delta).rem_euclid(len) as usize));
    }

    fn active_date_mut(&mut self) -> &mut String {
        match self.date_field {
            DateField::Start => &mut self.start_date,
            DateField::End => &mut self.end_date,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(ev) = self.events_rx.try_recv() {
            match ev {
                PipelineEvent::Finished {
                    ticket,
                    outcome,
                    elapsed_ms,
                } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    if self.view.apply(ticket, outcome) {
                        self.last_elapsed_ms = Some(elapsed_ms);
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) -> Result<bool> {
        if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
            return Ok(true);
        }

        match code {
            KeyCode::Esc => return Ok(true),
            KeyCode::F(1) => {
                self.switch_mode(Mode::Search);
                return Ok(false);
            }
            KeyCode::F(2) => {
                self.switch_mode(Mode::Rover);
                return Ok(false);
            }
            KeyCode::F(3) => {
                self.switch_mode(Mode::Asteroids);
                return Ok(false);
            }
            KeyCode::Tab => {
                self.switch_mode(self.view.mode.next());
                return Ok(false);
            }
            KeyCode::BackTab => {
                self.switch_mode(self.view.mode.prev());
                return Ok(false);
            }
            _ => {}
        }

        match self.view.mode {
            Mode::Search => match code {
                KeyCode::Enter => self.submit_search(),
                KeyCode::Backspace => {
                    self.query.pop();
                }
                KeyCode::Down => self.select_tag(1),
                KeyCode::Up => self.select_tag(-1),
                KeyCode::Char(c) => {
                    if !c.is_control() && self.query.chars().count() < QUERY_INPUT_MAX {
                        self.query.push(c);
                    }
                }
                _ => {}
            },
            Mode::Rover => match code {
                KeyCode::Down | KeyCode::Char('j') => self.select_rover(1),
                KeyCode::Up | KeyCode::Char('k') => self.select_rover(-1),
                KeyCode::Enter | KeyCode::Char('l') => self.submit_rover(),
                _ => {}
            },
            Mode::Asteroids => match code {
                KeyCode::Enter => self.submit_asteroids(),
                KeyCode::Left | KeyCode::Up => self.date_field = DateField::Start,
                KeyCode::Right | KeyCode::Down => self.date_field = DateField::End,
                KeyCode::Backspace => {
                    self.active_date_mut().pop();
                }
                KeyCode::Char('t') => {
                    let today = chrono::Local::now().date_naive().format("%Y-%m-%d");
                    *self.active_date_mut() = today.to_string();
                }
                KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => {
                    let field = self.active_date_mut();
                    if field.len() < DATE_INPUT_MAX {
                        field.push(c);
                    }
                }
                _ => {}
            },
        }
        Ok(false)
    }

    fn draw(&mut self, f: &mut ratatui::Frame) {
        let size = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(6),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(size);

        self.draw_header(f, chunks[0]);
        match self.view.mode {
            Mode::Search => self.draw_search_controls(f, chunks[1]),
            Mode::Rover => self.draw_rover_controls(f, chunks[1]),
            Mode::Asteroids => self.draw_asteroid_controls(f, chunks[1]),
        }
        self.draw_status(f, chunks[2]);
        self.draw_grid(f, chunks[3]);
        self.draw_footer(f, chunks[4]);
    }

    fn draw_header(&self, f: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(40)])
            .split(area);

        let titles: Vec<Line> = Mode::ALL
            .iter()
            .enumerate()
            .map(|(i, m)| Line::from(format!("F{} {}", i + 1, m.title())))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.view.mode.index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(tabs, cols[0]);

        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut spans = Vec::new();
        if self.in_flight > 0 {
            spans.push(Span::styled(
                format!("{} in flight  ", self.in_flight),
                Style::default().fg(Color::LightBlue),
            ));
        } else if let Some(ms) = self.last_elapsed_ms {
            spans.push(Span::styled(
                format!("{ms}ms  "),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::styled(now, Style::default().fg(Color::Yellow)));
        let p = Paragraph::new(Line::from(spans))
            .alignment(ratatui::layout::Alignment::Right)
            .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(p, cols[1]);
    }

    fn draw_search_controls(&self, f: &mut ratatui::Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let input = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(self.query.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]))
        .block(
            Block::default()
                .title("Search NASA images")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        f.render_widget(input, rows[0]);

        let selected = self.tag_list.selected();
        let mut spans = vec![Span::styled("Quick: ", Style::default().fg(Color::Gray))];
        for (i, tag) in self.quick_tags.iter().enumerate() {
            let style = if Some(i) == selected {
                Style::default().fg(Color::Black).bg(Color::LightYellow)
            } else {
                Style::default().fg(Color::LightBlue)
            };
            spans.push(Span::styled(format!("[{tag}]"), style));
            spans.push(Span::raw(" "));
        }
        let tags = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
        f.render_widget(tags, rows[1]);
    }

    fn draw_rover_controls(&self, f: &mut ratatui::Frame, area: Rect) {
        let items: Vec<ListItem> = Rover::ALL
            .iter()
            .map(|r| ListItem::new(r.name()))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title("Mars rover")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::LightYellow))
            .highlight_symbol("> ");
        let mut state = self.rover_list.clone();
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_asteroid_controls(&self, f: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(24),
                Constraint::Length(24),
                Constraint::Min(0),
            ])
            .split(area);

        let field = |title: &'static str, value: &str, focused: bool| {
            let border = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let shown = if value.is_empty() { "YYYY-MM-DD" } else { value };
            let text_style = if value.is_empty() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Paragraph::new(Span::styled(shown.to_string(), text_style)).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(border),
            )
        };
        f.render_widget(
            field("Start date", &self.start_date, self.date_field == DateField::Start),
            cols[0],
        );
        f.render_widget(
            field("End date", &self.end_date, self.date_field == DateField::End),
            cols[1],
        );
        let hint = Paragraph::new(Text::from(vec![
            Line::from("Up to 7 days. [t] fills today."),
            Line::from("[Enter] Look up near-Earth objects"),
        ]))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::NONE));
        f.render_widget(hint, cols[2]);
    }

    fn draw_status(&self, f: &mut ratatui::Frame, area: Rect) {
        let color = match self.view.status.tone() {
            Tone::Neutral => Color::Gray,
            Tone::Busy => Color::LightBlue,
            Tone::Good => Color::Green,
            Tone::Warn => Color::Yellow,
            Tone::Error => Color::Red,
        };
        let p = Paragraph::new(sanitize(&self.view.status.to_string()))
            .style(Style::default().fg(color))
            .block(
                Block::default()
                    .title("Status")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Plain),
            );
        f.render_widget(p, area);
    }

    fn draw_grid(&self, f: &mut ratatui::Frame, area: Rect) {
        if self.view.cards.is_empty() {
            return;
        }
        let cards: Vec<&Card> = self.view.cards.iter().take(MAX_RESULTS).collect();
        let row_count = cards.len().div_ceil(GRID_COLUMNS);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, row_count as u32); row_count])
            .split(area);
        for (r, chunk) in cards.chunks(GRID_COLUMNS).enumerate() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![
                    Constraint::Ratio(1, GRID_COLUMNS as u32);
                    GRID_COLUMNS
                ])
                .split(rows[r]);
            for (c, card) in chunk.iter().enumerate() {
                f.render_widget(card_widget(card), cols[c]);
            }
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame, area: Rect) {
        let hint = match self.view.mode {
            Mode::Search => {
                "[type] Query  [Enter] Search  [Up/Down] Quick tag  [F1-F3/Tab] Mode  [Esc] Quit"
            }
            Mode::Rover => "[j/k] Rover  [Enter] Load photos  [F1-F3/Tab] Mode  [Esc] Quit",
            Mode::Asteroids => {
                "[0-9 -] Date  [Left/Right] Field  [t] Today  [Enter] Look up  [F1-F3/Tab] Mode  [Esc] Quit"
            }
        };
        let p = Paragraph::new(hint)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::TOP));
        f.render_widget(p, area);
    }
}

fn card_widget(card: &Card) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if let Some(url) = card.image_url.as_deref() {
        lines.push(Line::from(Span::styled(
            sanitize_field(url, 200),
            Style::default().fg(Color::DarkGray),
        )));
    }
    for l in &card.lines {
        lines.push(Line::from(sanitize(l)));
    }
    if let Some(h) = card.hazard {
        let color = match h {
            Hazard::Hazardous => Color::Red,
            Hazard::Safe => Color::Green,
        };
        lines.push(Line::from(Span::styled(
            h.label(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
    Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    sanitize_field(&card.title, 80),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
}

pub fn run_tui(api: Arc<dyn SpaceApi>, settings: &Settings) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
    execute!(stdout, EnterAlternateScreen, Hide).map_err(|e| Error::msg(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| Error::msg(e.to_string()))?;
    terminal
        .clear()
        .map_err(|e| Error::msg(format!("tui clear failed: {e}")))?;

    info!("tui started");
    let result = run_loop(&mut terminal, App::new(api, settings));

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();
    info!("tui stopped");
    result
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut app: App) -> Result<()> {
    let tick = Duration::from_millis(100);
    loop {
        app.drain_events();
        let mut draw_panicked = false;
        let draw_result = terminal.draw(|f| {
            if catch_unwind(AssertUnwindSafe(|| app.draw(f))).is_err() {
                draw_panicked = true;
            }
        });
        if draw_panicked {
            warn!("draw panicked; clearing terminal");
            let _ = terminal.clear();
            continue;
        }
        if let Err(e) = draw_result {
            warn!("draw error: {e}");
            let _ = terminal.clear();
            continue;
        }

        // Poll so finished pipelines repaint without a key press.
        if event::poll(tick).map_err(|e| Error::msg(e.to_string()))? {
            match event::read().map_err(|e| Error::msg(e.to_string()))? {
                Event::Key(k) => {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    if app.handle_key(k.code, k.modifiers)? {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }
    Ok(())
}
