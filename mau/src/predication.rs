//! Predication and merge.
//!
//! Every container goes through `Idle -> CandidateGathering -> Resolved` once per traversal. Tables whose rule
//! is enabled offer candidate writes; resolution commits the highest-priority candidate, or leaves the container
//! untouched if nobody offered one. Equal priorities from different tables are a hardware ambiguity: the lower
//! table wins and a [`Diagnostic::PredicationTie`] is raised.

use itertools::Itertools;
use linked_hash_map::LinkedHashMap;

use crate::diagnostic::{self, Diagnostic};
use crate::phv::{ContainerId, Phv};

/// Whether and how strongly a table's writes are committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredicationRule {
    /// Whether the table's writes are candidates at all.
    pub enabled: bool,
    /// Higher wins.
    pub priority: u8,
}

/// A candidate write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Table offering the write.
    pub table: usize,
    /// Priority of the table.
    pub priority: u8,
    /// Value written.
    pub value: u32,
}

/// Merge state of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeState {
    /// No candidate yet.
    Idle,
    /// Candidates offered so far, in offer order.
    CandidateGathering(Vec<Candidate>),
    /// Committed write, `None` keeping the incoming value.
    Resolved(Option<Candidate>),
}

impl Default for MergeState {
    fn default() -> Self { Self::Idle }
}

impl MergeState {
    fn offer(&mut self, candidate: Candidate) {
        match self {
            Self::Idle => *self = Self::CandidateGathering(vec![candidate]),
            Self::CandidateGathering(candidates) => candidates.push(candidate),
            Self::Resolved(_) => log::debug!("late candidate from table {} dropped", candidate.table),
        }
    }

    fn resolve(&mut self, container: ContainerId, diagnostics: &mut Vec<Diagnostic>) -> Option<Candidate> {
        let winner = match self {
            Self::Idle => None,
            Self::CandidateGathering(candidates) => {
                let top = candidates.iter().map(|c| c.priority).max();
                let tied = candidates
                    .iter()
                    .filter(|c| Some(c.priority) == top)
                    .sorted_by_key(|c| c.table)
                    .collect::<Vec<_>>();
                let tables = tied.iter().map(|c| c.table).dedup().collect::<Vec<_>>();
                if tables.len() > 1 {
                    diagnostic::raise(diagnostics, Diagnostic::PredicationTie { container, tables });
                }
                tied.first().copied().copied()
            }
            Self::Resolved(winner) => *winner,
        };
        *self = Self::Resolved(winner);
        winner
    }
}

/// Candidate writes of one traversal.
#[derive(Debug, Clone, Default)]
pub struct Merge {
    containers: LinkedHashMap<ContainerId, MergeState>,
}

impl Merge {
    /// Offers a write of `table`. Ignored unless the table's rule is enabled.
    pub fn offer(&mut self, container: ContainerId, table: usize, rule: PredicationRule, value: u32) {
        if !rule.enabled {
            return;
        }
        self.containers.entry(container).or_insert_with(MergeState::default).offer(Candidate {
            table,
            priority: rule.priority,
            value,
        });
    }

    /// State of a container.
    pub fn state(&self, container: ContainerId) -> MergeState {
        self.containers.get(&container).cloned().unwrap_or_default()
    }

    /// Resolves every container and applies the winners to a copy of the incoming header vector.
    pub fn resolve(&mut self, incoming: &Phv, diagnostics: &mut Vec<Diagnostic>) -> Phv {
        let mut phv = incoming.clone();
        for (container, state) in self.containers.iter_mut() {
            if let Some(winner) = state.resolve(*container, diagnostics) {
                phv.set(*container, winner.value);
            }
        }
        phv
    }
}
