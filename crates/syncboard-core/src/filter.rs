// ── Derived view: filtering and ordering ──
//
// Turns a cache snapshot plus filter parameters into the ordered list a
// UI renders. Pure: the same snapshot and parameters always produce the
// same list.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::Entity;
use crate::store::{Collection, Snapshot};

/// Parameter name that targets the free-text query.
pub const QUERY_PARAM: &str = "query";

// ── FilterValue ──────────────────────────────────────────────────

/// One filter slot: inactive, or requiring a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    #[default]
    All,
    Only(String),
}

impl FilterValue {
    /// Parse user input. Blank input and `all` (any case) mean inactive.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(trimmed.to_owned())
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Only(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(v) => Some(v),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for FilterValue {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Option<String>> for FilterValue {
    fn from(raw: Option<String>) -> Self {
        raw.map_or(Self::All, Self::from)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(v) => f.write_str(v),
        }
    }
}

// ── FilterParams ─────────────────────────────────────────────────

/// Free-text query plus categorical filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub query: FilterValue,
    #[serde(default)]
    pub fields: BTreeMap<String, FilterValue>,
}

impl FilterParams {
    /// All filters inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one parameter by name. `query` targets the free-text filter;
    /// anything else must be one of `E::FILTER_FIELDS`.
    pub fn set<E: Entity>(
        &mut self,
        name: &str,
        value: impl Into<FilterValue>,
    ) -> Result<(), CoreError> {
        let value = value.into();
        let name = name.trim().to_ascii_lowercase();

        if name == QUERY_PARAM || name == "search" {
            self.query = value;
            return Ok(());
        }

        if !E::FILTER_FIELDS.contains(&name.as_str()) {
            return Err(CoreError::UnknownFilter {
                kind: E::KIND,
                field: name,
                expected: std::iter::once(QUERY_PARAM)
                    .chain(E::FILTER_FIELDS.iter().copied())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        if value.is_active() {
            self.fields.insert(name, value);
        } else {
            self.fields.remove(&name);
        }
        Ok(())
    }

    /// Builder form of [`set`](Self::set).
    pub fn with<E: Entity>(
        mut self,
        name: &str,
        value: impl Into<FilterValue>,
    ) -> Result<Self, CoreError> {
        self.set::<E>(name, value)?;
        Ok(self)
    }

    /// Whether no filter is active.
    pub fn is_match_all(&self) -> bool {
        !self.query.is_active() && self.fields.values().all(|v| !v.is_active())
    }

    /// Value of a categorical filter; inactive if never set.
    pub fn field(&self, name: &str) -> &FilterValue {
        const ALL: &FilterValue = &FilterValue::All;
        self.fields.get(name).unwrap_or(ALL)
    }
}

// ── Filtering and ordering ───────────────────────────────────────

/// Filter and order a collection.
///
/// A record passes when the query (if any) is a case-insensitive
/// substring of one of its search fields and every active categorical
/// filter equals the record's value, ignoring case. Passing records are
/// ordered pinned first, then by display name; the sort is stable, so
/// equal names keep collection order.
pub fn filter_view<E: Entity>(collection: &Collection<E>, params: &FilterParams) -> Vec<Arc<E>> {
    let query = params.query.as_str().map(str::to_lowercase);
    let wanted: Vec<(&str, String)> = params
        .fields
        .iter()
        .filter_map(|(name, value)| value.as_str().map(|v| (name.as_str(), v.to_lowercase())))
        .collect();

    let mut items: Vec<Arc<E>> = collection
        .iter()
        .filter(|e| match query {
            None => true,
            Some(ref q) => e
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(q.as_str())),
        })
        .filter(|e| {
            wanted.iter().all(|(name, want)| {
                e.filter_value(name)
                    .is_some_and(|have| have.to_lowercase() == *want)
            })
        })
        .cloned()
        .collect();

    items.sort_by(|a, b| {
        let pinned_a = a.pinned().unwrap_or(false);
        let pinned_b = b.pinned().unwrap_or(false);
        pinned_b
            .cmp(&pinned_a)
            .then_with(|| collate(a.display_name(), b.display_name()))
    });
    items
}

/// Compare names for display order.
///
/// Letters compare by base form first, ignoring case and common Latin
/// accents; ties are broken by accents (plain first), then by case
/// (lowercase first) at the first difference. Names equal under all three
/// compare `Equal`.
pub fn collate(a: &str, b: &str) -> Ordering {
    let base = |s: &str| s.chars().flat_map(char::to_lowercase).map(strip_accent).collect::<Vec<_>>();
    let lower = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();

    base(a)
        .cmp(&base(b))
        .then_with(|| lower(a).cmp(&lower(b)))
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .find(|(ca, cb)| ca != cb)
                .map_or(Ordering::Equal, |(ca, cb)| {
                    match (ca.is_lowercase(), cb.is_lowercase()) {
                        (true, false) => Ordering::Less,
                        (false, true) => Ordering::Greater,
                        _ => ca.cmp(&cb),
                    }
                })
        })
}

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'ł' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' | 'ţ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

// ── Memoized view ────────────────────────────────────────────────

struct Memo<E: Entity> {
    snapshot: Snapshot<E>,
    params: FilterParams,
    items: Arc<Vec<Arc<E>>>,
}

/// Caches the last derived list. Recomputes only when the snapshot (by
/// identity) or the parameters (by value) change.
pub struct DerivedView<E: Entity> {
    memo: Option<Memo<E>>,
    computations: u64,
}

impl<E: Entity> DerivedView<E> {
    pub fn new() -> Self {
        Self {
            memo: None,
            computations: 0,
        }
    }

    pub fn get(&mut self, snapshot: &Snapshot<E>, params: &FilterParams) -> Arc<Vec<Arc<E>>> {
        if let Some(memo) = &self.memo {
            if Arc::ptr_eq(&memo.snapshot, snapshot) && memo.params == *params {
                return Arc::clone(&memo.items);
            }
        }

        let items = Arc::new(filter_view(snapshot, params));
        self.computations += 1;
        self.memo = Some(Memo {
            snapshot: Arc::clone(snapshot),
            params: params.clone(),
            items: Arc::clone(&items),
        });
        items
    }

    /// How many times the list has been recomputed.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

impl<E: Entity> Default for DerivedView<E> {
    fn default() -> Self {
        Self::new()
    }
}
