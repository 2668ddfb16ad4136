//! Visible state shared by all pipelines: active mode, status line, cards.
//!
//! Each pipeline start takes a [`Ticket`]. Outcomes are applied only while
//! their ticket is still the newest, so a slow response can never overwrite
//! what a later action put on screen. Mode switches also invalidate
//! outstanding tickets.

use tracing::debug;

use crate::input::InputError;
use crate::render::Card;
use crate::status::StatusLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    Search,
    #[default]
    Rover,
    Asteroids,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Search, Mode::Rover, Mode::Asteroids];

    pub fn title(self) -> &'static str {
        match self {
            Mode::Search => "Search",
            Mode::Rover => "Mars Rovers",
            Mode::Asteroids => "Asteroids",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Mode::Search => 0,
            Mode::Rover => 1,
            Mode::Asteroids => 2,
        }
    }

    pub fn next(self) -> Self {
        Mode::ALL[(self.index() + 1) % Mode::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Mode::ALL[(self.index() + Mode::ALL.len() - 1) % Mode::ALL.len()]
    }
}

/// Generation token handed out when a pipeline starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    mode: Mode,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a finished pipeline wants on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusLine,
    pub cards: Vec<Card>,
}

impl Outcome {
    pub fn status_only(status: StatusLine) -> Self {
        Self {
            status,
            cards: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub mode: Mode,
    pub status: StatusLine,
    pub cards: Vec<Card>,
    generation: u64,
}

impl ViewState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Shows exactly one panel and wipes the status line and grid.
    pub fn switch_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.status = StatusLine::Empty;
        self.cards.clear();
        self.generation += 1;
    }

    /// Validation failures touch only the status line.
    pub fn report_invalid(&mut self, err: InputError) {
        self.status = StatusLine::Invalid(err);
    }

    /// Marks a pipeline as in flight: loading status, empty grid, new ticket.
    pub fn begin(&mut self, mode: Mode, query: Option<&str>) -> Ticket {
        self.generation += 1;
        self.mode = mode;
        self.status = StatusLine::loading(mode, query);
        self.cards.clear();
        Ticket {
            generation: self.generation,
            mode,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && ticket.mode == self.mode
    }

    /// Returns false (and changes nothing) for a stale ticket.
    pub fn apply(&mut self, ticket: Ticket, outcome: Outcome) -> bool {
        if !self.is_current(&ticket) {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale outcome"
            );
            return false;
        }
        self.status = outcome.status;
        self.cards = outcome.cards;
        true
    }
}
