//! Reusable fetch requests and the stateful query runner.
//!
//! # Responsibility
//! - Model query outcomes as a closed set of states, distinguishing "ran
//!   and matched nothing" from "the fetch itself failed".
//! - Provide a re-executable query holder with an observable result slot.
//!
//! # Invariants
//! - `Found` never carries an empty collection; a zero-row fetch yields
//!   `ExecutedNoMatch`.
//! - `perform` overwrites the prior outcome; no history is retained and no
//!   concurrency guard exists against overlapping calls.

use crate::model::record::Identifiable;
use crate::store::{IdOf, Persisted, RecordOf, RecordStore, RefOf, StoreError};

/// A reusable "attribute == value" fetch request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSpec<Id> {
    pub attribute: &'static str,
    pub value: Id,
    pub limit: Option<usize>,
}

impl<Id> FetchSpec<Id> {
    pub fn new(attribute: &'static str, value: Id) -> Self {
        Self {
            attribute,
            value,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One or more fetched records. Non-emptiness is structural: the first
/// record is held apart from the rest, so an empty instance cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundRecords<Ref, R> {
    head: Persisted<Ref, R>,
    tail: Vec<Persisted<Ref, R>>,
}

impl<Ref, R> FoundRecords<Ref, R> {
    /// Builds from fetched rows; `None` when the input is empty.
    pub fn from_rows(rows: Vec<Persisted<Ref, R>>) -> Option<Self> {
        let mut rows = rows.into_iter();
        let head = rows.next()?;
        Some(Self {
            head,
            tail: rows.collect(),
        })
    }

    /// The first matched record. Always present.
    pub fn first(&self) -> &Persisted<Ref, R> {
        &self.head
    }

    /// Number of matched records, at least 1.
    pub fn count(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persisted<Ref, R>> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    pub fn into_rows(self) -> Vec<Persisted<Ref, R>> {
        let mut rows = Vec::with_capacity(1 + self.tail.len());
        rows.push(self.head);
        rows.extend(self.tail);
        rows
    }
}

/// Result slot of a query runner.
#[derive(Debug)]
pub enum QueryOutcome<Ref, R> {
    /// Initial state, before any execution.
    NotYetExecuted,
    /// The fetch matched one or more records.
    Found(FoundRecords<Ref, R>),
    /// The fetch ran and matched nothing, at the given epoch-millisecond
    /// timestamp. Informational, not a failure.
    ExecutedNoMatch(i64),
    /// The fetch itself failed.
    Failed(StoreError),
}

impl<Ref, R> QueryOutcome<Ref, R> {
    pub fn is_executed(&self) -> bool {
        !matches!(self, Self::NotYetExecuted)
    }

    pub fn found(&self) -> Option<&FoundRecords<Ref, R>> {
        match self {
            Self::Found(records) => Some(records),
            _ => None,
        }
    }
}

/// Reusable, re-executable query holder with an observable result slot.
///
/// External observation is callback-based: an optional observer fires after
/// every `perform`, and the current outcome can be polled at any time.
pub struct QueryRunner<'s, S: RecordStore> {
    store: &'s S,
    spec: FetchSpec<IdOf<S>>,
    outcome: QueryOutcome<RefOf<S>, RecordOf<S>>,
    observer: Option<Box<dyn FnMut(&QueryOutcome<RefOf<S>, RecordOf<S>>) + 's>>,
}

impl<'s, S: RecordStore> QueryRunner<'s, S> {
    pub fn new(store: &'s S, spec: FetchSpec<IdOf<S>>) -> Self {
        Self {
            store,
            spec,
            outcome: QueryOutcome::NotYetExecuted,
            observer: None,
        }
    }

    /// Specialization fixed to "fetch by primary key, limit 1".
    pub fn single_record(store: &'s S, identifier: IdOf<S>) -> Self {
        let spec = FetchSpec::new(
            <RecordOf<S> as Identifiable>::IDENTIFIER_ATTRIBUTE,
            identifier,
        )
        .with_limit(1);
        Self::new(store, spec)
    }

    /// Installs an observer notified after every execution.
    pub fn observe(
        &mut self,
        observer: impl FnMut(&QueryOutcome<RefOf<S>, RecordOf<S>>) + 's,
    ) {
        self.observer = Some(Box::new(observer));
    }

    /// Executes the fetch once, synchronously, overwriting the outcome.
    pub fn perform(&mut self, at_epoch_ms: i64) -> &QueryOutcome<RefOf<S>, RecordOf<S>> {
        self.outcome = match self.store.fetch_by_identifier(
            self.spec.attribute,
            &self.spec.value,
            self.spec.limit,
        ) {
            Ok(rows) => match FoundRecords::from_rows(rows) {
                Some(found) => QueryOutcome::Found(found),
                None => QueryOutcome::ExecutedNoMatch(at_epoch_ms),
            },
            Err(err) => QueryOutcome::Failed(err),
        };

        if let Some(observer) = self.observer.as_mut() {
            observer(&self.outcome);
        }
        &self.outcome
    }

    /// Current outcome, without executing.
    pub fn outcome(&self) -> &QueryOutcome<RefOf<S>, RecordOf<S>> {
        &self.outcome
    }

    pub fn spec(&self) -> &FetchSpec<IdOf<S>> {
        &self.spec
    }
}
