//! Selector-based HTML extraction shared by the registry and index providers.
//!
//! Everything here works on an already-fetched document, so both extraction
//! strategies are testable against fixture markup.

use credence_core::{collapse_whitespace, ProviderFailure, MIN_NAME_LEN};
use scraper::{ElementRef, Html, Node, Selector};

/// Phrases a page uses to say there is nothing to show.
pub const NOT_FOUND_MARKERS: &[&str] = &[
    "não encontrado",
    "nao encontrado",
    "not found",
    "nenhum",
];

/// Label preceding the specialty on profile pages.
pub const SPECIALTY_LABELS: &[&str] = &["Especialidade"];

/// Label preceding the standing on profile pages.
pub const STANDING_LABELS: &[&str] = &["Situação", "Situacao"];

/// Parse one CSS selector, reporting a bad selector as a parse failure.
pub fn parse_selector(raw: &str) -> Result<Selector, ProviderFailure> {
    Selector::parse(raw)
        .map_err(|e| ProviderFailure::parse(format!("invalid selector {:?}: {:?}", raw, e)))
}

/// Parse an ordered selector list, preserving priority.
pub fn parse_selectors<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Selector>, ProviderFailure> {
    raw.iter().map(|s| parse_selector(s.as_ref())).collect()
}

/// Visible text of an element with whitespace collapsed.
///
/// Text nodes are joined with spaces so adjacent cells do not run together.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the whole document body (or root when there is no body).
pub fn document_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    element_text(body.unwrap_or_else(|| document.root_element()))
}

/// First non-empty text among the selectors, in priority order.
///
/// Texts shorter than `min_len` characters are skipped and the scan
/// continues with the next match.
pub fn first_text(scope: ElementRef<'_>, selectors: &[Selector], min_len: usize) -> Option<String> {
    selectors.iter().find_map(|selector| {
        scope
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty() && text.chars().count() >= min_len)
    })
}

/// Whether `digits` appears in `text` as a complete run of digits, so
/// "2401" does not match "CRM 240110".
pub fn contains_digit_run(text: &str, digits: &str) -> bool {
    !digits.is_empty()
        && text
            .split(|c: char| !c.is_ascii_digit())
            .any(|run| run == digits)
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn contains_not_found_marker(text: &str) -> bool {
    NOT_FOUND_MARKERS
        .iter()
        .any(|marker| contains_ignore_case(text, marker))
}

/// Whether a candidate name is plausible: long enough and not a
/// "not found" message.
pub fn is_plausible_name(name: &str) -> bool {
    name.chars().count() >= MIN_NAME_LEN && !contains_not_found_marker(name)
}

/// Value following a text label such as `"Especialidade:"`.
///
/// Finds the innermost element whose text contains the label, then takes
/// either the text after the colon inside that element
/// (`<p>Especialidade: Pediatria</p>`) or the first non-empty sibling
/// (`<dt>Especialidade</dt><dd>Pediatria</dd>`,
/// `<strong>Situação:</strong> Ativo`).
pub fn labeled_value(scope: ElementRef<'_>, labels: &[&str]) -> Option<String> {
    labels
        .iter()
        .find_map(|label| label_holder(scope, label).and_then(value_after_label))
}

fn label_holder<'a>(scope: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| contains_ignore_case(&element_text(*el), label))
        .find(|el| {
            !el.children()
                .filter_map(ElementRef::wrap)
                .any(|child| contains_ignore_case(&element_text(child), label))
        })
}

fn value_after_label(holder: ElementRef<'_>) -> Option<String> {
    let inline = element_text(holder)
        .split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|rest| !rest.is_empty());
    if inline.is_some() {
        return inline;
    }

    holder.next_siblings().find_map(|node| {
        let text = match node.value() {
            Node::Text(text) => collapse_whitespace(text),
            Node::Element(_) => ElementRef::wrap(node).map(element_text)?,
            _ => return None,
        };
        let text = text.trim_start_matches(':').trim().to_string();
        (!text.is_empty()).then_some(text)
    })
}
