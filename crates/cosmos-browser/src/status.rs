use std::fmt;

use crate::input::InputError;
use crate::session::Mode;
use crate::transform::MAX_RESULTS;

/// The single line reporting what the last pipeline did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusLine {
    #[default]
    Empty,
    Invalid(InputError),
    Searching {
        query: String,
    },
    LoadingPhotos,
    LoadingAsteroids,
    NoImages {
        query: String,
    },
    NoPhotos,
    NoFeedData,
    NoAsteroids,
    Found {
        mode: Mode,
        total: usize,
    },
    Failed(Mode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Busy,
    Good,
    Warn,
    Error,
}

impl StatusLine {
    pub fn loading(mode: Mode, query: Option<&str>) -> Self {
        match mode {
            Mode::Search => StatusLine::Searching {
                query: query.unwrap_or_default().to_string(),
            },
            Mode::Rover => StatusLine::LoadingPhotos,
            Mode::Asteroids => StatusLine::LoadingAsteroids,
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            StatusLine::Empty => Tone::Neutral,
            StatusLine::Searching { .. } | StatusLine::LoadingPhotos | StatusLine::LoadingAsteroids => {
                Tone::Busy
            }
            StatusLine::Found { .. } => Tone::Good,
            StatusLine::Invalid(_)
            | StatusLine::NoImages { .. }
            | StatusLine::NoPhotos
            | StatusLine::NoFeedData
            | StatusLine::NoAsteroids => Tone::Warn,
            StatusLine::Failed(_) => Tone::Error,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StatusLine::Empty)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Empty => Ok(()),
            StatusLine::Invalid(e) => write!(f, "{e}"),
            StatusLine::Searching { query } => write!(f, "Searching NASA images for \"{query}\" .."),
            StatusLine::LoadingPhotos => f.write_str("Loading photos.."),
            StatusLine::LoadingAsteroids => f.write_str("Loading asteroid data.."),
            StatusLine::NoImages { query } => write!(f, "No images found for \"{query}\"."),
            StatusLine::NoPhotos => f.write_str("No photos found!"),
            StatusLine::NoFeedData => f.write_str("No data found."),
            StatusLine::NoAsteroids => f.write_str("No asteroids found."),
            StatusLine::Found { mode, total } => {
                let noun = match mode {
                    Mode::Search => "results",
                    Mode::Rover => "photos",
                    Mode::Asteroids => "asteroids",
                };
                write!(f, "Found {total} {noun} — showing first {MAX_RESULTS}.")
            }
            StatusLine::Failed(Mode::Search) => {
                f.write_str("Error fetching NASA images. See console for details.")
            }
            StatusLine::Failed(Mode::Rover) => f.write_str("Error loading photos!"),
            StatusLine::Failed(Mode::Asteroids) => f.write_str("Error loading asteroid data!"),
        }
    }
}
