//! Sort key collation
//!
//! Ordering rules:
//! - A missing key sorts as -infinity
//! - `Character`: case-insensitive lexicographic, ties broken by raw bytes.
//!   The fold is Unicode lowercase and does not depend on the process locale.
//! - `Numeric`: parse-then-compare; unparseable keys sort after every number
//!   and among themselves by `Character` rules
//!
//! Integers and floats compare by exact value, with no rounding through f64,
//! so mixed columns stay transitive above 2^53. The numeric fallback keeps
//! the ordering total even when a column mixes numbers and text.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::{TableError, TableResult};
use crate::schema::ColumnId;

/// Comparison semantics for sort keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    /// Lexicographic, case-insensitive first
    #[default]
    Character,
    /// Parsed as 64-bit integer or float
    Numeric,
}

/// A parsed numeric key
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(Number::Int(i));
        }
        match trimmed.parse::<f64>() {
            Ok(f) if !f.is_nan() => Some(Number::Float(f)),
            _ => None,
        }
    }

    fn cmp(self, other: Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            // NaN never parses; -0.0 and 0.0 must stay equal
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Number::Int(a), Number::Float(b)) => int_float_cmp(a, b),
            (Number::Float(a), Number::Int(b)) => int_float_cmp(b, a).reverse(),
        }
    }
}

/// Exact comparison of an integer against a non-NaN float
fn int_float_cmp(i: i64, f: f64) -> Ordering {
    // 2^63, exactly representable
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    if f >= I64_END {
        return Ordering::Less;
    }
    if f < -I64_END {
        return Ordering::Greater;
    }
    // f lies in [-2^63, 2^63) here, so the truncation fits in i64 exactly
    let whole = f.trunc() as i64;
    i.cmp(&whole).then_with(|| {
        let fract = f.fract();
        if fract > 0.0 {
            Ordering::Less
        } else if fract < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl Collation {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Collation::Character => "character",
            Collation::Numeric => "numeric",
        }
    }

    /// Total comparison of two optional keys (missing = -infinity)
    pub fn compare(&self, a: Option<&str>, b: Option<&str>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => self
                .try_compare(a, b)
                .unwrap_or_else(|_| Self::fallback(a, b)),
        }
    }

    /// Strict comparison; `ComparisonFailure` when a numeric key does not parse
    pub fn try_compare(&self, a: &str, b: &str) -> TableResult<Ordering> {
        match self {
            Collation::Character => Ok(character_cmp(a, b)),
            Collation::Numeric => match (Number::parse(a), Number::parse(b)) {
                (Some(x), Some(y)) => Ok(x.cmp(y)),
                _ => Err(TableError::ComparisonFailure {
                    collation: self.as_str(),
                    left: a.to_string(),
                    right: b.to_string(),
                }),
            },
        }
    }

    /// Safe ordering used when `try_compare` fails
    fn fallback(a: &str, b: &str) -> Ordering {
        match (Number::parse(a), Number::parse(b)) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => character_cmp(a, b),
        }
    }
}

fn character_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Active sort for a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column the key is extracted from
    pub column: ColumnId,
    /// Direction
    pub ascending: bool,
    /// Comparison semantics
    pub collation: Collation,
}

impl SortSpec {
    /// Ascending sort on `column`
    pub fn asc(column: ColumnId, collation: Collation) -> Self {
        Self {
            column,
            ascending: true,
            collation,
        }
    }

    /// Descending sort on `column`
    pub fn desc(column: ColumnId, collation: Collation) -> Self {
        Self {
            column,
            ascending: false,
            collation,
        }
    }

    /// Comparator for this spec
    pub fn comparator(&self) -> KeyComparator {
        KeyComparator::new(*self)
    }
}

/// Direction-aware key comparator that counts fallback comparisons
///
/// Display order is the order in which `compare(row[i], row[i + 1]) != Greater`.
#[derive(Debug)]
pub struct KeyComparator {
    spec: SortSpec,
    fallbacks: Cell<usize>,
    first_failure: RefCell<Option<TableError>>,
}

impl KeyComparator {
    /// Comparator for `spec`
    pub fn new(spec: SortSpec) -> Self {
        Self {
            spec,
            fallbacks: Cell::new(0),
            first_failure: RefCell::new(None),
        }
    }

    /// Spec this comparator applies
    pub fn spec(&self) -> &SortSpec {
        &self.spec
    }

    /// Compare two keys in display order
    pub fn compare(&self, a: Option<&str>, b: Option<&str>) -> Ordering {
        let ordering = match (a, b) {
            (Some(x), Some(y)) => match self.spec.collation.try_compare(x, y) {
                Ok(ordering) => ordering,
                Err(err) => {
                    self.fallbacks.set(self.fallbacks.get() + 1);
                    let mut first = self.first_failure.borrow_mut();
                    if first.is_none() {
                        *first = Some(err);
                    }
                    Collation::fallback(x, y)
                }
            },
            _ => self.spec.collation.compare(a, b),
        };
        if self.spec.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }

    /// Number of comparisons that needed the fallback ordering
    pub fn fallbacks(&self) -> usize {
        self.fallbacks.get()
    }

    /// First comparison failure seen, if any
    pub fn take_failure(&self) -> Option<TableError> {
        self.first_failure.borrow_mut().take()
    }
}
