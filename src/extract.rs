//! Record extractor: classifies tweets and pulls out photo candidates.
//!
//! Classification is per record, then per attachment. The `no_image`
//! contribution of a record follows the branch structure exactly:
//! - no `extended_entities`: one
//! - `extended_entities` without a `media` list: one
//! - a `media` list: one per ineligible attachment (so an empty list adds
//!   nothing)

use crate::model::{Candidate, InputRecord};
use serde_json::Value;

const PHOTO: &str = "photo";

/// Outcome for a single attachment in the `media` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Eligible(Candidate),
    Ineligible,
}

/// Outcome for a whole input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NoContainer,
    EmptyMedia,
    PerAttachment(Vec<Attachment>),
}

impl Classification {
    /// How many `no_image` increments this record contributes.
    pub fn no_image(&self) -> u64 {
        match self {
            Classification::NoContainer | Classification::EmptyMedia => 1,
            Classification::PerAttachment(items) => items
                .iter()
                .filter(|a| matches!(a, Attachment::Ineligible))
                .count() as u64,
        }
    }

    pub fn into_candidates(self) -> impl Iterator<Item = Candidate> {
        let items = match self {
            Classification::PerAttachment(items) => items,
            _ => Vec::new(),
        };
        items.into_iter().filter_map(|a| match a {
            Attachment::Eligible(c) => Some(c),
            Attachment::Ineligible => None,
        })
    }
}

pub fn classify(record: &InputRecord) -> Classification {
    let Some(entities) = record.0.get("extended_entities") else {
        return Classification::NoContainer;
    };
    let Some(media) = entities.get("media").and_then(Value::as_array) else {
        return Classification::EmptyMedia;
    };
    let text = record.full_text();
    Classification::PerAttachment(media.iter().map(|m| classify_attachment(m, text)).collect())
}

fn classify_attachment(media: &Value, text: &str) -> Attachment {
    let Some(url) = media.get("media_url_https").and_then(Value::as_str) else {
        return Attachment::Ineligible;
    };
    if media.get("type").and_then(Value::as_str) != Some(PHOTO) {
        return Attachment::Ineligible;
    }
    // The identifier names the workflow execution; a photo without one
    // cannot be dispatched.
    let Some(id) = media.get("id_str").and_then(Value::as_str) else {
        return Attachment::Ineligible;
    };
    Attachment::Eligible(Candidate {
        image_url: url.to_string(),
        identifier: id.to_string(),
        text: text.to_string(),
    })
}

/// Lazily yields every eligible candidate, in batch order and attachment
/// order within a record.
pub fn candidates(records: &[InputRecord]) -> impl Iterator<Item = Candidate> + '_ {
    records.iter().flat_map(|r| classify(r).into_candidates())
}
