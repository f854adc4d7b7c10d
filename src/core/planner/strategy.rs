use super::types::Goal;
use crate::error::PlannerError;
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const REPORTS_BUCKET: &str = "agicore-reports";

/// An action plus its parameters, before a worker has been chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDraft {
    pub action: String,
    pub parameters: BTreeMap<String, Value>,
}

impl StepDraft {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

/// Turns a goal into an ordered list of step drafts.
///
/// Implementations never pick workers; the planner routes every draft through
/// the capability registry. The same goal must always yield the same drafts.
pub trait DecompositionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn draft(&self, goal: &Goal) -> Result<Vec<StepDraft>, PlannerError>;
}

/// Deterministic keyword matcher: image intent, then trade intent, then the
/// news-analysis report template for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordStrategy;

const IMAGE_WORDS: [&str; 3] = ["image", "picture", "illustration"];
const IMAGE_MARKERS: [&str; 3] = ["image of", "picture of", "illustration of"];
const TOPIC_MARKERS: [&str; 3] = [" for ", " on ", " about "];
const TRADE_FILLER: [&str; 5] = ["share", "shares", "of", "units", "unit"];

impl DecompositionStrategy for KeywordStrategy {
    fn name(&self) -> &str {
        "keyword"
    }

    fn draft(&self, goal: &Goal) -> Result<Vec<StepDraft>, PlannerError> {
        let description = goal.description.trim();
        let lowered = description.to_ascii_lowercase();

        if IMAGE_WORDS.iter().any(|word| lowered.contains(word)) {
            let prompt = text_after_marker(description, &lowered, &IMAGE_MARKERS)
                .unwrap_or_else(|| trim_trailing_punctuation(description).to_string());
            return Ok(vec![StepDraft::new("generate_image").with("prompt", prompt)]);
        }

        if let Some(drafts) = trade_drafts(description)? {
            return Ok(drafts);
        }

        Ok(analysis_drafts(description, &lowered))
    }
}

fn trim_trailing_punctuation(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim_end()
}

/// Text following the earliest marker found. `lowered` must be the ASCII
/// lowercase form of `text` so byte offsets line up.
fn text_after_marker(text: &str, lowered: &str, markers: &[&str]) -> Option<String> {
    let (start, marker) = markers
        .iter()
        .filter_map(|marker| lowered.find(marker).map(|index| (index, *marker)))
        .min_by_key(|(index, _)| *index)?;
    let rest = trim_trailing_punctuation(&text[start + marker.len()..]);
    (!rest.is_empty()).then(|| rest.to_string())
}

fn trade_drafts(description: &str) -> Result<Option<Vec<StepDraft>>, PlannerError> {
    let words: Vec<&str> = description
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.'))
        .map(|word| word.trim_end_matches('.'))
        .filter(|word| !word.is_empty())
        .collect();

    let Some((verb_index, side)) = words.iter().enumerate().find_map(|(index, word)| {
        match word.to_ascii_lowercase().as_str() {
            "buy" => Some((index, "BUY")),
            "sell" => Some((index, "SELL")),
            _ => None,
        }
    }) else {
        return Ok(None);
    };

    let mut rest = words[verb_index + 1..].iter();
    let quantity = rest
        .by_ref()
        .find_map(|word| word.parse::<f64>().ok())
        .filter(|quantity| quantity.is_finite() && *quantity > 0.0);
    let symbol = rest
        .find(|word| !TRADE_FILLER.contains(&word.to_ascii_lowercase().as_str()))
        .filter(|word| word.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|word| word.to_ascii_uppercase());

    let (Some(quantity), Some(symbol)) = (quantity, symbol) else {
        return Err(PlannerError::Validation(
            "trade goal needs a positive quantity and a symbol, e.g. \"buy 10 NVDA\"".into(),
        ));
    };

    let quantity = quantity_value(quantity);
    Ok(Some(vec![
        StepDraft::new("get_market_data")
            .with("symbol", symbol.clone())
            .with("timeframe", "1d"),
        StepDraft::new("execute_trade")
            .with("symbol", symbol)
            .with("action", side)
            .with("quantity", quantity)
            .with("order_type", "MARKET"),
    ]))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantity_value(quantity: f64) -> Value {
    if quantity.fract() == 0.0 && quantity <= u64::MAX as f64 {
        Value::from(quantity as u64)
    } else {
        Value::from(quantity)
    }
}

fn analysis_drafts(description: &str, lowered: &str) -> Vec<StepDraft> {
    let analysis_type = if lowered.contains("sentiment") {
        "sentiment"
    } else {
        "trend_forecast"
    };
    let topic = text_after_marker(description, lowered, &TOPIC_MARKERS)
        .unwrap_or_else(|| trim_trailing_punctuation(description).to_string());
    let key = format!("reports/{}.json", slug(&topic));

    vec![
        StepDraft::new("analyze_news")
            .with("data_source", "news_feed")
            .with("topic", topic.clone())
            .with("analysis_type", analysis_type),
        StepDraft::new("store_object")
            .with("bucket", REPORTS_BUCKET)
            .with("key", key)
            .with(
                "content",
                json!({"topic": topic, "analysis_type": analysis_type}),
            ),
    ]
}

fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug.to_string()
    }
}
