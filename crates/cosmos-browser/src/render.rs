//! Cards: the renderer-neutral view of one result, plus the HTML grid.
//!
//! Upstream text is untrusted. HTML output escapes every field it
//! interpolates; terminal output goes through [`crate::text_sanitize`].

use std::fmt::Write as _;

use crate::session::ViewState;
use crate::status::Tone;
use crate::text_sanitize::sanitize;
use crate::transform::{AsteroidResult, ImageResult, MAX_RESULTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Hazardous,
    Safe,
}

impl Hazard {
    pub fn label(self) -> &'static str {
        match self {
            Hazard::Hazardous => "⚠ Hazardous",
            Hazard::Safe => "✔ Safe",
        }
    }

    fn css_color(self) -> &'static str {
        match self {
            Hazard::Hazardous => "red",
            Hazard::Safe => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub image_url: Option<String>,
    pub lines: Vec<String>,
    pub hazard: Option<Hazard>,
}

impl Card {
    pub fn from_image(r: &ImageResult) -> Self {
        let lines = if r.date_created.is_empty() {
            Vec::new()
        } else {
            vec![r.date_created.clone()]
        };
        Self {
            title: r.title.clone(),
            image_url: Some(r.image_url.clone()),
            lines,
            hazard: None,
        }
    }

    pub fn from_asteroid(a: &AsteroidResult) -> Self {
        Self {
            title: a.name.clone(),
            image_url: None,
            lines: vec![
                format!("🪨 Size: {} km", a.max_diameter_km),
                format!("🚀 Speed: {} km/h", a.speed_kmh),
                format!("🌍 Miss Distance: {} km", a.miss_distance_km),
                format!("📅 Date: {}", a.close_date),
            ],
            hazard: Some(if a.is_hazardous {
                Hazard::Hazardous
            } else {
                Hazard::Safe
            }),
        }
    }
}

pub fn image_cards(records: &[ImageResult]) -> Vec<Card> {
    records.iter().take(MAX_RESULTS).map(Card::from_image).collect()
}

pub fn asteroid_cards(records: &[AsteroidResult]) -> Vec<Card> {
    records
        .iter()
        .take(MAX_RESULTS)
        .map(Card::from_asteroid)
        .collect()
}

/// Escapes `&`, `"`, `<` and `>`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn card_html(card: &Card) -> String {
    let mut out = String::from("<div class=\"card\">\n");
    let title = escape_html(&card.title);
    if let Some(url) = card.image_url.as_deref() {
        let _ = writeln!(
            out,
            "  <img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
            escape_html(url),
            title
        );
    }
    let _ = writeln!(out, "  <p><b>{title}</b></p>");
    for line in &card.lines {
        let _ = writeln!(out, "  <p class=\"meta\">{}</p>", escape_html(line));
    }
    if let Some(h) = card.hazard {
        let _ = writeln!(
            out,
            "  <p style=\"color:{};\">{}</p>",
            h.css_color(),
            h.label()
        );
    }
    out.push_str("</div>\n");
    out
}

pub fn grid_html(cards: &[Card]) -> String {
    let mut out = String::from("<div id=\"photoGrid\">\n");
    for card in cards.iter().take(MAX_RESULTS) {
        out.push_str(&card_html(card));
    }
    out.push_str("</div>\n");
    out
}

/// Plain-text form of one card, for stdout.
pub fn card_text(index: usize, card: &Card) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>2}. {}", index + 1, sanitize(&card.title));
    if let Some(url) = card.image_url.as_deref() {
        let _ = writeln!(out, "    {}", sanitize(url));
    }
    for line in &card.lines {
        let _ = writeln!(out, "    {}", sanitize(line));
    }
    if let Some(h) = card.hazard {
        let _ = writeln!(out, "    {}", h.label());
    }
    out
}

const PAGE_STYLE: &str = "body{font-family:sans-serif;background:#f5efe6;color:#3b2f22;margin:2rem}\
#status{margin:1rem 0;font-weight:bold}\
#status.error{color:#b00020}\
#photoGrid{display:grid;grid-template-columns:repeat(auto-fill,minmax(220px,1fr));gap:1rem}\
.card{background:#fff;border-radius:8px;padding:.75rem;box-shadow:0 1px 4px rgba(0,0,0,.15)}\
.card img{width:100%;border-radius:4px}\
.meta{font-size:13px;color:#6a5844}";

/// A standalone page for one view: heading, status line, and grid.
pub fn page_html(heading: &str, view: &ViewState) -> String {
    let status_class = if view.status.tone() == Tone::Error {
        " class=\"error\""
    } else {
        ""
    };
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(heading));
    let _ = writeln!(out, "<style>{PAGE_STYLE}</style>");
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", escape_html(heading));
    let _ = writeln!(
        out,
        "<p id=\"status\"{status_class}>{}</p>",
        escape_html(&view.status.to_string())
    );
    out.push_str(&grid_html(&view.cards));
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(title: &str) -> ImageResult {
        ImageResult {
            image_url: "https://img.example/a.jpg".into(),
            title: title.into(),
            date_created: "2021-02-18".into(),
        }
    }

    #[test]
    fn escapes_the_four_special_characters() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & Jerry</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; Jerry&lt;/b&gt;"
        );
    }

    #[test]
    fn markup_in_titles_stays_inert() {
        let html = card_html(&Card::from_image(&image("<b>X</b>")));
        assert!(html.contains("<p><b>&lt;b&gt;X&lt;/b&gt;</b></p>"), "{html}");
        assert!(html.contains("alt=\"&lt;b&gt;X&lt;/b&gt;\""), "{html}");
        assert!(!html.contains("<b>X</b>"), "{html}");
    }

    #[test]
    fn grid_never_exceeds_twelve_cards() {
        let records: Vec<ImageResult> = (0..15).map(|i| image(&format!("t{i}"))).collect();
        let cards = image_cards(&records);
        assert_eq!(cards.len(), 12);
        let html = grid_html(&cards);
        assert_eq!(html.matches("class=\"card\"").count(), 12);
    }

    #[test]
    fn text_cards_are_numbered_and_sanitized() {
        let text = card_text(2, &Card::from_image(&image("Moon\u{1b}[2J walk")));
        assert_eq!(
            text,
            " 3. Moon walk\n    https://img.example/a.jpg\n    2021-02-18\n"
        );
    }

    #[test]
    fn asteroid_cards_carry_hazard_colour() {
        let a = AsteroidResult {
            name: "(2024 AB)".into(),
            max_diameter_km: "0.12".into(),
            speed_kmh: "45000".into(),
            miss_distance_km: "1200000".into(),
            close_date: "2024-01-01".into(),
            is_hazardous: true,
        };
        let card = Card::from_asteroid(&a);
        assert_eq!(card.hazard, Some(Hazard::Hazardous));
        assert_eq!(card.lines[1], "🚀 Speed: 45000 km/h");
        let html = card_html(&card);
        assert!(html.contains("color:red;"), "{html}");
        assert!(html.contains("⚠ Hazardous"), "{html}");
        assert!(!html.contains("<img"), "{html}");
    }
}
