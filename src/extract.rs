use regex::Regex;
use std::sync::LazyLock;

use crate::page::{self, PageError, PageHandle};

/// Placeholder stored for any field that could not be found.
pub const SENTINEL: &str = "N/A";

static COST_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)kosten\s+koper|buyer[’']?s\s+costs").expect("cost qualifier pattern is valid")
});

/// Trimmed text of the first `tag` matching `attrs`, or the sentinel.
pub fn extract_by_attributes(
    page: &PageHandle,
    tag: &str,
    attrs: &[(&str, &str)],
) -> Result<String, PageError> {
    Ok(page
        .find_first(tag, attrs)?
        .map(page::normalized_text)
        .unwrap_or_else(sentinel))
}

/// Trimmed text of the first `tag` whose text is exactly `text`, or the sentinel.
pub fn extract_by_text(page: &PageHandle, tag: &str, text: &str) -> Result<String, PageError> {
    Ok(page
        .find_first_by_text(tag, text)?
        .map(page::normalized_text)
        .unwrap_or_else(sentinel))
}

/// Value of `attr_name` on the first `tag` matching `attrs`.
///
/// Yields the sentinel when no element matches or the matched element lacks
/// the attribute.
pub fn extract_attribute_value(
    page: &PageHandle,
    tag: &str,
    attrs: &[(&str, &str)],
    attr_name: &str,
) -> Result<String, PageError> {
    Ok(page
        .find_first(tag, attrs)?
        .and_then(|element| page::attribute(element, attr_name))
        .map(|value| value.trim().to_string())
        .unwrap_or_else(sentinel))
}

/// Looks up a `<dt>` whose text contains `label` and returns the text of the
/// `<dd>` that follows it.
///
/// Substring matching lets "Bouwjaar" hit "Bouwjaar (oorspronkelijk)". Only the
/// first matching term is considered; if it has no following `<dd>` sibling the
/// result is the sentinel.
pub fn extract_by_label(page: &PageHandle, label: &str) -> Result<String, PageError> {
    let Some(term) = page.find_first_containing("dt", label)? else {
        return Ok(sentinel());
    };

    Ok(page::next_sibling_of(term, "dd")
        .map(page::normalized_text)
        .unwrap_or_else(sentinel))
}

/// Removes the "kosten koper" / "buyer's costs" qualifier from a price.
///
/// Idempotent: removal repeats until no qualifier is left, then whitespace is
/// collapsed. The sentinel passes through untouched and a price that was
/// nothing but the qualifier becomes the sentinel.
pub fn clean_price(price: &str) -> String {
    if price == SENTINEL {
        return sentinel();
    }

    let mut cleaned = price.to_string();
    while COST_QUALIFIER.is_match(&cleaned) {
        cleaned = COST_QUALIFIER.replace_all(&cleaned, "").into_owned();
    }

    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() { sentinel() } else { cleaned }
}

fn sentinel() -> String {
    SENTINEL.to_string()
}
