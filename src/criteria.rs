//! Search criteria construction
//!
//! Turns a partially filled [`VesselForm`] into the query sent to the
//! backend. Two designs are supported and selected through
//! [`SearchStrategy`]:
//!
//! - `FuzzyRangeOr`: a disjunction of regex and range clauses, serialized in
//!   the document-store dialect (`$or`, `$and`, `$regex`, `$gt`, `$lt`).
//! - `FlatEquality`: a flat object of the populated fields, only accepted
//!   when the name is long enough.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::errors::ConsoleError;
use crate::models::{Field, VesselForm};

/// Match rule applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Case-insensitive regular expression
    Regex(String),
    GreaterThan(f64),
    LessThan(f64),
}

impl Serialize for Term {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Term::Regex(pattern) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$regex", pattern)?;
                map.serialize_entry("$options", "i")?;
                map.end()
            }
            Term::GreaterThan(bound) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$gt", bound)?;
                map.end()
            }
            Term::LessThan(bound) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$lt", bound)?;
                map.end()
            }
        }
    }
}

/// Conjunction of field terms and nested clauses
///
/// An empty clause matches every document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clause {
    terms: BTreeMap<Field, Term>,
    all_of: Vec<Clause>,
}

impl Clause {
    fn single(field: Field, term: Term) -> Self {
        let mut clause = Self::default();
        clause.terms.insert(field, term);
        clause
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.all_of.is_empty()
    }

    pub fn term(&self, field: Field) -> Option<&Term> {
        self.terms.get(&field)
    }

    pub fn all_of(&self) -> &[Clause] {
        &self.all_of
    }

    /// Match values starting with `value`, if the field was populated
    pub fn with_prefix(mut self, field: Field, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.terms
                .insert(field, Term::Regex(format!("^{}.*", value)));
        }
        self
    }

    /// Match values containing `value`, if the field was populated
    pub fn with_regex(mut self, field: Field, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.terms
                .insert(field, Term::Regex(format!(".*{}.*", value)));
        }
        self
    }

    /// Match values strictly within `width / 2` of `value`, if the field was populated
    pub fn with_range(mut self, field: Field, value: Option<f64>, width: f64) -> Self {
        if let Some(value) = value {
            let half = width / 2.0;
            self.all_of
                .push(Self::single(field, Term::GreaterThan(value - half)));
            self.all_of
                .push(Self::single(field, Term::LessThan(value + half)));
        }
        self
    }

    /// Lower and upper bounds of the range on `field`, if any
    pub fn range(&self, field: Field) -> Option<(f64, f64)> {
        let mut lower = None;
        let mut upper = None;
        for clause in &self.all_of {
            match clause.term(field) {
                Some(Term::GreaterThan(bound)) => lower = Some(*bound),
                Some(Term::LessThan(bound)) => upper = Some(*bound),
                _ => {}
            }
        }
        lower.zip(upper)
    }
}

impl Serialize for Clause {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = self.terms.len() + usize::from(!self.all_of.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, term) in &self.terms {
            map.serialize_entry(field.key(), term)?;
        }
        if !self.all_of.is_empty() {
            map.serialize_entry("$and", &self.all_of)?;
        }
        map.end()
    }
}

/// Disjunction of clauses, any of which selects a vessel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    any_of: Vec<Clause>,
}

impl Predicate {
    pub fn any_of(&self) -> &[Clause] {
        &self.any_of
    }

    /// Candidate vessels: a name prefix, or a name substring combined with
    /// proximity on one of the dimensions.
    ///
    /// Empty clauses are dropped since a single one would match everything,
    /// repeated candidates are kept once.
    pub fn fuzzy_range_or(form: &VesselForm, range_width: f64) -> Self {
        let name = form.text(Field::Name);
        let by_dimension = |field| {
            Clause::default()
                .with_regex(Field::Name, name)
                .with_range(field, form.number(field), range_width)
        };

        let candidates = [
            Clause::default().with_prefix(Field::Name, name),
            by_dimension(Field::Width),
            by_dimension(Field::Length),
            by_dimension(Field::Draft),
        ];

        let mut any_of: Vec<Clause> = Vec::with_capacity(candidates.len());
        for clause in candidates {
            if !clause.is_empty() && !any_of.contains(&clause) {
                any_of.push(clause);
            }
        }
        Self { any_of }
    }

    /// Serialized form used in the `query` parameter
    pub fn to_query_string(&self) -> Result<String, ConsoleError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Predicate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$or", &self.any_of)?;
        map.end()
    }
}

/// Flat field-equality query, sent as a request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatQuery {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<f64>,
}

/// Query ready to be dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    Predicate(Predicate),
    Flat(FlatQuery),
}

/// Selectable search design
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStrategy {
    FuzzyRangeOr { range_width: f64 },
    FlatEquality { min_name_length: usize },
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::FuzzyRangeOr { range_width: 2.0 }
    }
}

impl SearchStrategy {
    /// Build the query for a form, rejecting input that must not reach the backend
    pub fn build(&self, form: &VesselForm) -> Result<SearchRequest, ConsoleError> {
        match *self {
            SearchStrategy::FuzzyRangeOr { range_width } => {
                let predicate = Predicate::fuzzy_range_or(form, range_width);
                if predicate.any_of.is_empty() {
                    return Err(ConsoleError::InvalidInput(
                        "No search criteria given".to_string(),
                    ));
                }
                Ok(SearchRequest::Predicate(predicate))
            }
            SearchStrategy::FlatEquality { min_name_length } => {
                let name = form.text(Field::Name).unwrap_or_default();
                if name.chars().count() < min_name_length {
                    return Err(ConsoleError::InvalidInput(format!(
                        "Vessel name must have at least {} characters",
                        min_name_length
                    )));
                }
                Ok(SearchRequest::Flat(FlatQuery {
                    name: name.to_string(),
                    width: form.number(Field::Width),
                    length: form.number(Field::Length),
                    draft: form.number(Field::Draft),
                }))
            }
        }
    }
}
