//! Mutators and the rules that rewrite mutations into canonical ones.

use serde::Serialize;

use crate::MutatorValue;

/// A named compile-time switch with a finite set of values.
///
/// Declared with `#pragma anki mutator [instanced] NAME VALUE0 [VALUE1 ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Mutator {
    /// Name of the mutator, also the name of the macro it defines.
    pub(crate) name: String,
    /// Strictly increasing values.
    pub(crate) values: Vec<MutatorValue>,
    /// Whether the mutator drives the size of instanced inputs.
    pub(crate) instance_count: bool,
}

impl Mutator {
    /// Name of the mutator.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared values, sorted and without duplicates.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[MutatorValue] {
        &self.values
    }

    /// Whether this mutator's value is the array size of instanced inputs.
    #[inline]
    #[must_use]
    pub const fn is_instance_count(&self) -> bool {
        self.instance_count
    }

    /// Whether `value` is one of the declared values.
    #[inline]
    #[must_use]
    pub fn has_value(&self, value: MutatorValue) -> bool {
        self.values.binary_search(&value).is_ok()
    }
}

/// One mutator assignment of a [`MutationRewrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct RewriteRecord {
    /// Index of the mutator in declaration order.
    pub mutator_index: usize,
    /// Value the mutator must have for the rule to apply.
    pub value_from: MutatorValue,
    /// Value the mutator is set to when the rule applies.
    pub value_to: MutatorValue,
}

/// Maps one assignment of a subset of mutators to another.
///
/// Declared with `#pragma anki rewrite_mutation NAME_A V0 NAME_B V1 to NAME_A V2 NAME_B V3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct MutationRewrite {
    /// Records sorted by mutator declaration order.
    pub(crate) records: Vec<RewriteRecord>,
}

impl MutationRewrite {
    /// The records of the rule, sorted by mutator declaration order.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[RewriteRecord] {
        &self.records
    }

    /// Whether every record's mutator currently has its `value_from`.
    #[inline]
    #[must_use]
    pub fn matches(&self, mutation: &[MutatorValue]) -> bool {
        self.records
            .iter()
            .all(|record| mutation.get(record.mutator_index) == Some(&record.value_from))
    }

    /// Sets every record's mutator to its `value_to`.
    #[inline]
    pub fn apply(&self, mutation: &mut [MutatorValue]) {
        for record in &self.records {
            if let Some(value) = mutation.get_mut(record.mutator_index) {
                *value = record.value_to;
            }
        }
    }
}

/// Iterates every combination of mutator values.
///
/// The last mutator varies fastest, so the order is lexicographic in declaration order.
#[derive(Debug, Clone)]
pub struct Mutations<'program> {
    /// Mutators being enumerated.
    mutators: &'program [Mutator],
    /// Index into each mutator's values of the next combination, `None` once exhausted.
    cursor: Option<Vec<usize>>,
}

impl<'program> Mutations<'program> {
    /// Starts at the first value of every mutator.
    pub(crate) fn new(mutators: &'program [Mutator]) -> Self {
        Self {
            mutators,
            cursor: Some(vec![0; mutators.len()]),
        }
    }
}

impl Iterator for Mutations<'_> {
    type Item = Vec<MutatorValue>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        let mutation = self
            .mutators
            .iter()
            .zip(cursor.iter())
            .filter_map(|(mutator, &idx)| mutator.values.get(idx).copied())
            .collect();

        // Odometer increment, the last mutator being the fastest digit.
        let mut exhausted = true;
        for (mutator, idx) in self.mutators.iter().zip(cursor.iter_mut()).rev() {
            *idx += 1;
            if *idx < mutator.values.len() {
                exhausted = false;
                break;
            }
            *idx = 0;
        }
        if exhausted {
            self.cursor = None;
        }

        Some(mutation)
    }
}
