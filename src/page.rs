use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised by the markup layer itself. A lookup that simply finds
/// nothing is not an error; these only come from malformed lookups.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Read-only parsed page. Owned by whoever fetched it and dropped right after
/// extraction; nothing caches or shares it.
pub struct PageHandle {
    document: Html,
}

impl PageHandle {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// First element of `tag` whose attributes satisfy every `(name, value)` pair.
    pub fn find_first(
        &self,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<Option<ElementRef<'_>>, PageError> {
        let selector = tag_selector(tag)?;
        Ok(self
            .document
            .select(&selector)
            .find(|element| attrs.iter().all(|(name, value)| attr_matches(element, name, value))))
    }

    /// Every element of `tag` matching `attrs`, in document order.
    pub fn find_all(
        &self,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<Vec<ElementRef<'_>>, PageError> {
        let selector = tag_selector(tag)?;
        Ok(self
            .document
            .select(&selector)
            .filter(|element| attrs.iter().all(|(name, value)| attr_matches(element, name, value)))
            .collect())
    }

    /// First element of `tag` whose normalized text equals `text`.
    pub fn find_first_by_text(
        &self,
        tag: &str,
        text: &str,
    ) -> Result<Option<ElementRef<'_>>, PageError> {
        let selector = tag_selector(tag)?;
        let wanted = normalize_whitespace(text);
        Ok(self
            .document
            .select(&selector)
            .find(|element| normalized_text(*element) == wanted))
    }

    /// First element of `tag` whose normalized text contains `needle`.
    pub fn find_first_containing(
        &self,
        tag: &str,
        needle: &str,
    ) -> Result<Option<ElementRef<'_>>, PageError> {
        let selector = tag_selector(tag)?;
        Ok(self
            .document
            .select(&selector)
            .find(|element| normalized_text(*element).contains(needle)))
    }
}

/// The next sibling element of `element` named `tag`, skipping text nodes and
/// siblings with other names.
pub fn next_sibling_of<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name().eq_ignore_ascii_case(tag))
}

/// Text content with every whitespace run collapsed to one space and the ends trimmed.
pub fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn attribute<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tag_selector(tag: &str) -> Result<Selector, PageError> {
    Selector::parse(tag).map_err(|e| PageError::InvalidSelector {
        selector: tag.to_string(),
        reason: e.to_string(),
    })
}

// `class` matches either the full class list or a single class token, the
// same way a multi-valued attribute is compared in the portal's markup rules.
fn attr_matches(element: &ElementRef<'_>, name: &str, expected: &str) -> bool {
    let Some(actual) = element.value().attr(name) else {
        return false;
    };

    if name.eq_ignore_ascii_case("class") {
        let wanted: Vec<&str> = expected.split_whitespace().collect();
        let classes: Vec<&str> = actual.split_whitespace().collect();
        classes == wanted || (wanted.len() == 1 && classes.contains(&wanted[0]))
    } else {
        actual == expected
    }
}
