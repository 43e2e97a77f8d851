//! Template-based narration text
//!
//! One of a small set of templates is chosen per day; the bird's name,
//! a trimmed description, its family and the listener's place fill it in.

use crate::error::UpstreamError;
use crate::types::{BirdCandidate, FactGenerator};
use async_trait::async_trait;
use birdcast_common::selector::{select_from, SelectionDomain};
use birdcast_common::Location;
use chrono::NaiveDate;

const MAX_DESCRIPTION_SENTENCES: usize = 2;

/// Placeholders: `{name}`, `{facts}`, `{family}`, `{place}`
const TEMPLATES: &[&str] = &[
    "Good morning, bird explorers! Today's bird is the {name}. {facts} {family} Keep your ears open near {place}, and you might hear one singing!",
    "Hello, friends! Listen closely, because today we meet the {name}. {facts} {family} Birds like this one have been spotted around {place}.",
    "Guess who is visiting today? It's the {name}! {facts} {family} Next time you are outside in {place}, look up and listen!",
    "Time for our bird of the day: the {name}. {facts} {family} Can you imagine one flying over {place} right now?",
];

/// Day-seeded template fact generator
#[derive(Debug, Clone, Default)]
pub struct TemplateFactGenerator;

impl TemplateFactGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render narration text synchronously
    pub fn render(
        &self,
        bird: &BirdCandidate,
        description: &str,
        location: &Location,
        date: NaiveDate,
    ) -> String {
        // TEMPLATES is a non-empty constant, so selection cannot fail
        let template = select_from(SelectionDomain::FactTemplate, date, TEMPLATES)
            .map(|t| *t)
            .unwrap_or(TEMPLATES[0]);

        let facts = leading_sentences(&sanitize(description), MAX_DESCRIPTION_SENTENCES);
        let family = bird
            .family
            .as_deref()
            .map(|f| format!("It belongs to a bird family called {}.", f))
            .unwrap_or_default();

        let text = template
            .replace("{name}", &bird.common_name)
            .replace("{facts}", &facts)
            .replace("{family}", &family)
            .replace("{place}", &place_name(location));

        collapse_whitespace(&text)
    }
}

#[async_trait]
impl FactGenerator for TemplateFactGenerator {
    async fn generate(
        &self,
        bird: &BirdCandidate,
        description: &str,
        location: &Location,
        date: NaiveDate,
    ) -> Result<String, UpstreamError> {
        let text = self.render(bird, description, location, date);
        tracing::debug!(bird = %bird.common_name, chars = text.len(), "Narration text rendered");
        Ok(text)
    }
}

fn place_name(location: &Location) -> String {
    [&location.city, &location.region, &location.country]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "your neighbourhood".to_string())
}

/// Drop parenthetical asides and collapse whitespace
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    collapse_whitespace(&out.replace(" ,", ",").replace(" .", "."))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `count` sentences of already-sanitised text
pub fn leading_sentences(text: &str, count: usize) -> String {
    let mut end = text.len();
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen == count {
                    end = i + c.len_utf8();
                    break;
                }
            }
        }
    }
    text[..end].trim().to_string()
}
