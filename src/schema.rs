use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::extract::{self, SENTINEL};
use crate::page::{PageError, PageHandle};

/// How one field is located on a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Text of the first `tag` matching every attribute pair.
    Structural {
        tag: &'static str,
        attrs: &'static [(&'static str, &'static str)],
    },
    /// Text of the first `tag` whose text is exactly `text`.
    ExactText {
        tag: &'static str,
        text: &'static str,
    },
    /// Value of `attr` on the first `tag` matching every attribute pair.
    Attribute {
        tag: &'static str,
        attrs: &'static [(&'static str, &'static str)],
        attr: &'static str,
    },
    /// `<dd>` following the first `<dt>` whose text contains the label.
    Label(&'static str),
}

impl ExtractionRule {
    pub fn resolve(&self, page: &PageHandle) -> Result<String, PageError> {
        match *self {
            Self::Structural { tag, attrs } => extract::extract_by_attributes(page, tag, attrs),
            Self::ExactText { tag, text } => extract::extract_by_text(page, tag, text),
            Self::Attribute { tag, attrs, attr } => {
                extract::extract_attribute_value(page, tag, attrs, attr)
            }
            Self::Label(label) => extract::extract_by_label(page, label),
        }
    }
}

/// Post-processing applied to a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    CleanPrice,
}

impl Transform {
    pub fn apply(self, value: String) -> String {
        match self {
            Self::None => value,
            Self::CleanPrice => extract::clean_price(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub rule: ExtractionRule,
    pub transform: Transform,
}

impl FieldRule {
    const fn new(name: &'static str, rule: ExtractionRule) -> Self {
        Self {
            name,
            rule,
            transform: Transform::None,
        }
    }

    const fn cleaned(name: &'static str, rule: ExtractionRule, transform: Transform) -> Self {
        Self {
            name,
            rule,
            transform,
        }
    }

    const fn label(name: &'static str, label: &'static str) -> Self {
        Self::new(name, ExtractionRule::Label(label))
    }

    pub fn extract(&self, page: &PageHandle) -> Result<String, PageError> {
        Ok(self.transform.apply(self.rule.resolve(page)?))
    }
}

/// Name of the only field that is never the sentinel.
pub const URL_FIELD: &str = "url";

const PRICE_ATTRS: &[(&str, &str)] = &[("class", "flex border-b border-neutral-20 pb-2 md:py-2")];

// `price_per_m2` reads the same element as `price` on purpose: the portal
// markup has not been confirmed to expose a distinct per-m² element, so the
// field stays an uncleaned copy until it is.
static FIELD_RULES: &[FieldRule] = &[
    FieldRule::new(
        "address",
        ExtractionRule::Structural {
            tag: "span",
            attrs: &[("class", "block text-2xl font-bold md:text-3xl lg:text-4xl")],
        },
    ),
    FieldRule::new(
        "square_meters",
        ExtractionRule::Structural {
            tag: "span",
            attrs: &[("class", "md:font-bold")],
        },
    ),
    FieldRule::new(
        "postal_code",
        ExtractionRule::Attribute {
            tag: "div",
            attrs: &[("city", "Amsterdam")],
            attr: "postcode",
        },
    ),
    FieldRule::cleaned(
        "price",
        ExtractionRule::Structural {
            tag: "dd",
            attrs: PRICE_ATTRS,
        },
        Transform::CleanPrice,
    ),
    FieldRule::new(
        "price_per_m2",
        ExtractionRule::Structural {
            tag: "dd",
            attrs: PRICE_ATTRS,
        },
    ),
    FieldRule::label("monthly_hoa_fee", "VvE bijdrage"),
    FieldRule::label("building_year", "Bouwjaar"),
    FieldRule::label("num_rooms", "Aantal kamers"),
    FieldRule::label("status", "Status"),
    FieldRule::label("outdoor_space", "Gebouwgebonden buitenruimte"),
    FieldRule::label("total_volume", "Inhoud"),
    FieldRule::label("num_bathrooms", "Aantal badkamers"),
    FieldRule::label("energy_label", "Energielabel"),
    FieldRule::label("insulation", "Isolatie"),
    FieldRule::label("heating", "Verwarming"),
    FieldRule::label("hot_water", "Warm Water"),
    FieldRule::label("ownership_status", "Eigendomssituatie"),
    FieldRule::label("charges", "Lasten"),
    FieldRule::label("location", "Ligging"),
    FieldRule::label("balcony_terrace", "Balkon/dakterras"),
];

/// Extraction rules for every field except `url`, in column order.
///
/// Adding a column means adding one entry here; record construction, CSV
/// headers and JSON keys all follow this table.
pub fn field_rules() -> &'static [FieldRule] {
    FIELD_RULES
}

/// Full column list: `url` followed by every rule's field name.
pub fn field_names() -> Vec<&'static str> {
    std::iter::once(URL_FIELD)
        .chain(FIELD_RULES.iter().map(|rule| rule.name))
        .collect()
}

/// One scraped listing. Every schema field is present, missing data is the sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    fields: Vec<(&'static str, String)>,
}

impl ListingRecord {
    /// Record for `url` with every other field set to the sentinel.
    pub fn empty(url: &str) -> Self {
        let fields = field_names()
            .into_iter()
            .map(|name| {
                let value = if name == URL_FIELD { url } else { SENTINEL };
                (name, value.to_string())
            })
            .collect();
        Self { fields }
    }

    /// Builds a record from `url` followed by already extracted `(name, value)` pairs.
    pub(crate) fn from_fields(
        url: &str,
        fields: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Self {
        let fields = std::iter::once((URL_FIELD, url.to_string()))
            .chain(fields)
            .collect();
        Self { fields }
    }

    pub fn url(&self) -> &str {
        self.get(URL_FIELD).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(name, value)| (*name, value.as_str()))
    }

    /// True when nothing besides the url was extracted.
    pub fn is_empty(&self) -> bool {
        self.iter()
            .all(|(name, value)| name == URL_FIELD || value == SENTINEL)
    }
}

/// Shorthand for [`ListingRecord::empty`].
pub fn empty_record(url: &str) -> ListingRecord {
    ListingRecord::empty(url)
}

// Serialized as a map so JSON keeps the column order.
impl Serialize for ListingRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
