use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::{error, info};

use crate::api::SpaceApi;
use crate::input::{DateRange, InputError, Rover, SearchQuery};
use crate::render::{asteroid_cards, image_cards};
use crate::session::{Mode, Outcome, Ticket};
use crate::status::StatusLine;
use crate::transform;

/// A validated user action, ready to go upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Search(SearchQuery),
    Rover(Rover),
    Asteroids(DateRange),
}

impl Request {
    pub fn search(raw: &str) -> Result<Self, InputError> {
        SearchQuery::parse(raw).map(Request::Search)
    }

    pub fn asteroids(start: &str, end: &str) -> Result<Self, InputError> {
        DateRange::parse(start, end).map(Request::Asteroids)
    }

    pub fn mode(&self) -> Mode {
        match self {
            Request::Search(_) => Mode::Search,
            Request::Rover(_) => Mode::Rover,
            Request::Asteroids(_) => Mode::Asteroids,
        }
    }

    /// The text echoed back in the search status lines.
    pub fn query(&self) -> Option<&str> {
        match self {
            Request::Search(q) => Some(q.as_str()),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Request::Search(q) => format!("search '{q}'"),
            Request::Rover(r) => format!("rover {r}"),
            Request::Asteroids(r) => format!("asteroids {}..{}", r.start_param(), r.end_param()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Finished {
        ticket: Ticket,
        outcome: Outcome,
        elapsed_ms: u128,
    },
}

pub trait PipelineSink: Send + Sync {
    fn emit(&self, ev: PipelineEvent);
}

pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl PipelineSink for ChannelSink {
    fn emit(&self, ev: PipelineEvent) {
        let _ = self.tx.send(ev);
    }
}

/// Fetch, transform and summarize one request. Never fails: transport and
/// parse errors become the mode's generic status, with detail logged.
pub fn run(api: &dyn SpaceApi, request: &Request) -> Outcome {
    let mode = request.mode();
    let result = match request {
        Request::Search(q) => api.search_images(q.as_str()).and_then(|body| {
            let batch = transform::search_results(&body)?;
            Ok(if batch.is_empty() {
                Outcome::status_only(StatusLine::NoImages {
                    query: q.to_string(),
                })
            } else {
                Outcome {
                    status: StatusLine::Found {
                        mode,
                        total: batch.total,
                    },
                    cards: image_cards(&batch.records),
                }
            })
        }),
        Request::Rover(r) => api.search_images(&r.keyword()).and_then(|body| {
            let batch = transform::rover_results(&body)?;
            Ok(if batch.is_empty() {
                Outcome::status_only(StatusLine::NoPhotos)
            } else {
                Outcome {
                    status: StatusLine::Found {
                        mode,
                        total: batch.total,
                    },
                    cards: image_cards(&batch.records),
                }
            })
        }),
        Request::Asteroids(range) => api.neo_feed(range).and_then(|body| {
            Ok(match transform::asteroid_results(&body)? {
                None => Outcome::status_only(StatusLine::NoFeedData),
                Some(batch) if batch.is_empty() => Outcome::status_only(StatusLine::NoAsteroids),
                Some(batch) => Outcome {
                    status: StatusLine::Found {
                        mode,
                        total: batch.total,
                    },
                    cards: asteroid_cards(&batch.records),
                },
            })
        }),
    };

    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(request = %request.describe(), "pipeline failed: {e}");
            Outcome::status_only(StatusLine::Failed(mode))
        }
    }
}

/// Runs `request` on its own thread and reports through `sink`.
pub fn spawn(
    api: Arc<dyn SpaceApi>,
    ticket: Ticket,
    request: Request,
    sink: Arc<dyn PipelineSink>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let started = Instant::now();
        info!(request = %request.describe(), ticket = ticket.generation(), "pipeline started");
        let outcome = run(api.as_ref(), &request);
        let elapsed_ms = started.elapsed().as_millis();
        info!(
            request = %request.describe(),
            cards = outcome.cards.len(),
            elapsed_ms = elapsed_ms as u64,
            "pipeline finished"
        );
        sink.emit(PipelineEvent::Finished {
            ticket,
            outcome,
            elapsed_ms,
        });
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use super::*;
    use crate::error::{Error, Result};
    use crate::session::ViewState;

    #[derive(Default)]
    struct FakeApi {
        images: Option<Value>,
        feed: Option<Value>,
        queries: Mutex<Vec<String>>,
    }

    impl SpaceApi for FakeApi {
        fn search_images(&self, query: &str) -> Result<Value> {
            self.queries.lock().unwrap().push(query.to_string());
            self.images.clone().ok_or_else(|| Error::msg("connection refused"))
        }

        fn neo_feed(&self, range: &DateRange) -> Result<Value> {
            self.queries.lock().unwrap().push(range.start_param());
            self.feed.clone().ok_or_else(|| Error::msg("connection refused"))
        }
    }

    fn items(n: usize) -> Value {
        let items: Vec<Value> = (0..n)
            .map(|i| json!({ "links": [{ "href": format!("{i}.jpg") }], "data": [{ "title": format!("t{i}") }] }))
            .collect();
        json!({ "collection": { "items": items } })
    }

    #[test]
    fn search_reports_total_and_caps_cards() {
        let api = FakeApi {
            images: Some(items(30)),
            ..Default::default()
        };
        let out = run(&api, &Request::search("saturn").unwrap());
        assert_eq!(out.status.to_string(), "Found 30 results — showing first 12.");
        assert_eq!(out.cards.len(), 12);
    }

    #[test]
    fn empty_search_result_is_not_an_error() {
        let api = FakeApi {
            images: Some(json!({ "collection": { "items": [] } })),
            ..Default::default()
        };
        let out = run(&api, &Request::search("zzzz").unwrap());
        assert_eq!(out.status.to_string(), "No images found for \"zzzz\".");
        assert!(out.cards.is_empty());
    }

    #[test]
    fn transport_failure_uses_generic_message() {
        let api = FakeApi::default();
        let out = run(&api, &Request::search("moon").unwrap());
        assert_eq!(
            out.status.to_string(),
            "Error fetching NASA images. See console for details."
        );
        let out = run(&api, &Request::Rover(Rover::Spirit));
        assert_eq!(out.status.to_string(), "Error loading photos!");
    }

    #[test]
    fn rover_queries_with_keyword() {
        let api = FakeApi {
            images: Some(items(2)),
            ..Default::default()
        };
        let out = run(&api, &Request::Rover(Rover::Opportunity));
        assert_eq!(out.status.to_string(), "Found 2 photos — showing first 12.");
        assert_eq!(api.queries.lock().unwrap()[0], "Opportunity rover");
    }

    #[test]
    fn rover_item_without_data_fails_the_listing() {
        let api = FakeApi {
            images: Some(json!({ "collection": { "items": [{ "links": [{ "href": "x.jpg" }] }] } })),
            ..Default::default()
        };
        let out = run(&api, &Request::Rover(Rover::Curiosity));
        assert_eq!(out.status, StatusLine::Failed(Mode::Rover));
        assert!(out.cards.is_empty());
    }

    #[test]
    fn asteroid_feed_without_objects_reports_no_data() {
        let api = FakeApi {
            feed: Some(json!({ "element_count": 0 })),
            ..Default::default()
        };
        let out = run(&api, &Request::asteroids("2024-01-01", "2024-01-02").unwrap());
        assert_eq!(out.status.to_string(), "No data found.");
    }

    #[test]
    fn asteroid_feed_with_no_dates_reports_no_asteroids() {
        let api = FakeApi {
            feed: Some(json!({ "element_count": 0, "near_earth_objects": {} })),
            ..Default::default()
        };
        let out = run(&api, &Request::asteroids("2024-01-01", "2024-01-02").unwrap());
        assert_eq!(out.status, StatusLine::NoAsteroids);
        assert_eq!(out.status.to_string(), "No asteroids found.");
        assert!(out.cards.is_empty());
    }

    #[test]
    fn empty_query_never_reaches_the_api() {
        let err = Request::search("   ").unwrap_err();
        let mut view = ViewState::new(Mode::Search);
        view.report_invalid(err);
        assert_eq!(view.status.to_string(), "Please type a search term (e.g. Saturn).");
    }

    struct VecSink(Mutex<Vec<PipelineEvent>>);

    impl PipelineSink for VecSink {
        fn emit(&self, ev: PipelineEvent) {
            self.0.lock().unwrap().push(ev);
        }
    }

    #[test]
    fn spawned_pipeline_reports_its_ticket() {
        let api: Arc<dyn SpaceApi> = Arc::new(FakeApi {
            images: Some(items(1)),
            ..Default::default()
        });
        let sink = Arc::new(VecSink(Mutex::new(Vec::new())));
        let mut view = ViewState::new(Mode::Search);
        let ticket = view.begin(Mode::Search, Some("io"));

        spawn(api, ticket, Request::search("io").unwrap(), sink.clone())
            .join()
            .unwrap();

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        let PipelineEvent::Finished { ticket: got, outcome, .. } = &events[0];
        assert_eq!(*got, ticket);
        assert!(view.apply(*got, outcome.clone()));
        assert_eq!(view.cards.len(), 1);
    }
}
