use tl::{HTMLTag, Parser, VDom};

use super::text;
use super::ExtractError;
use crate::table::RawRecord;

const ENTRY_CLASS: &str = "PromoImageSmall";
const DATE_CLASS: &str = "date";
const DESCRIPTION_CLASS: &str = "PromoImageSmall-description";

pub const DATE_NOT_FOUND: &str = "Date not found";

/// One dated block on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub date: String,
    pub body: Option<EntryBody>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// Flattened text of each `<li>` in the description.
    Items(Vec<String>),
    /// Raw markup of a description without list items.
    Markup(String),
}

impl Entry {
    pub fn records(&self) -> impl Iterator<Item = RawRecord> + '_ {
        let items = match &self.body {
            Some(EntryBody::Items(items)) => Some(items.iter().cloned()),
            _ => None,
        };
        let segments = match &self.body {
            Some(EntryBody::Markup(markup)) => {
                Some(text::split_segments(markup).filter_map(text::segment_text))
            }
            _ => None,
        };
        items
            .into_iter()
            .flatten()
            .chain(segments.into_iter().flatten())
            .map(move |description| RawRecord {
                date: self.date.clone(),
                description: Some(description),
            })
    }
}

pub fn find_entries(html: &str) -> Result<Vec<Entry>, ExtractError> {
    let dom = parse_dom(html)?;
    let parser = dom.parser();
    let mut entries = Vec::new();

    for node in dom.nodes().iter() {
        let Some(tag) = node.as_tag() else {
            continue;
        };
        if !is_element(tag, "div", ENTRY_CLASS) {
            continue;
        }

        let date = tag
            .children()
            .all(parser)
            .iter()
            .filter_map(|n| n.as_tag())
            .find(|t| is_element(t, "span", DATE_CLASS))
            .map(|t| text::decode_entities(&t.inner_text(parser)).trim().to_string())
            .unwrap_or_else(|| DATE_NOT_FOUND.to_string());

        let body = tag
            .children()
            .all(parser)
            .iter()
            .filter_map(|n| n.as_tag())
            .find(|t| is_element(t, "div", DESCRIPTION_CLASS))
            .map(|container| describe(container, parser));

        entries.push(Entry { date, body });
    }

    Ok(entries)
}

fn describe<'a>(container: &HTMLTag<'a>, parser: &Parser<'a>) -> EntryBody {
    let items: Vec<String> = container
        .children()
        .all(parser)
        .iter()
        .filter_map(|n| n.as_tag())
        .filter(|t| t.name().as_utf8_str().eq_ignore_ascii_case("li"))
        .map(|li| text::flatten(&li.inner_html(parser)))
        .collect();

    if items.is_empty() {
        EntryBody::Markup(container.inner_html(parser))
    } else {
        EntryBody::Items(items)
    }
}

fn parse_dom(html: &str) -> Result<VDom<'_>, ExtractError> {
    tl::parse(html, tl::ParserOptions::default()).map_err(|e| ExtractError::Parse(e.to_string()))
}

fn is_element(tag: &HTMLTag, name: &str, class: &str) -> bool {
    tag.name().as_utf8_str().eq_ignore_ascii_case(name)
        && tag
            .attributes()
            .class()
            .map(|c| c.as_utf8_str())
            .unwrap_or_default()
            .split_whitespace()
            .any(|c| c == class)
}
