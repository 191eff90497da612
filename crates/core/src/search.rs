//! Finishability search: can the points target still be reached within the
//! card limit if a given card is bought now?
//!
//! For a candidate card the search enumerates "branches", each assuming a
//! different subset of the still-open prerequisite cards gets bought, and
//! fills every branch greedily with the most valuable remaining cards. The
//! best branch is an estimate of the highest score reachable after buying
//! the candidate.

use std::collections::HashSet;

use tracing::trace;

use crate::rules::{CardId, RuleSet};

/// Every subset of `items`, in binary counting order: the empty subset comes
/// first and the full set last.
pub fn power_set<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let mut subsets: Vec<Vec<T>> = vec![Vec::new()];
    for item in items {
        let extended: Vec<Vec<T>> = subsets
            .iter()
            .map(|subset| {
                let mut subset = subset.clone();
                subset.push(item.clone());
                subset
            })
            .collect();
        subsets.extend(extended);
    }
    subsets
}

/// Best-finish estimator for one recalculation pass.
///
/// `fixed` holds owned and planned cards, `remaining_slots` the purchases
/// left under the card limit and `missing_before` the points still needed
/// on top of the score and the planned cards.
pub struct FinishabilitySearch<'a> {
    rules: &'a RuleSet,
    fixed: HashSet<CardId>,
    remaining_slots: u32,
    missing_before: i64,
}

impl<'a> FinishabilitySearch<'a> {
    /// Prepare a search; `remaining_slots` includes the candidate itself.
    pub fn new(
        rules: &'a RuleSet,
        fixed: HashSet<CardId>,
        remaining_slots: u32,
        missing_before: i64,
    ) -> Self {
        Self {
            rules,
            fixed,
            remaining_slots,
            missing_before,
        }
    }

    fn missing(&self, points: u32) -> i64 {
        self.missing_before - i64::from(points)
    }

    fn cost(&self, id: &str) -> u32 {
        self.rules.cost_of(id)
    }

    fn satisfied(&self, id: &str, taken: &HashSet<&CardId>) -> bool {
        match self.rules.prerequisite_of(id) {
            None => true,
            Some(prerequisite) => self.fixed.contains(prerequisite) || taken.contains(prerequisite),
        }
    }

    /// Points short of the target if `candidate` is bought now, or `None`
    /// when some branch still reaches the target.
    pub fn shortfall(&self, candidate: &CardId) -> Option<u32> {
        if self.remaining_slots == 0 {
            return None;
        }

        let variable: Vec<&CardId> = self
            .rules
            .prerequisite_card_ids()
            .iter()
            .filter(|id| !self.fixed.contains(*id) && *id != candidate)
            .filter(|id| {
                self.rules
                    .dependents_of(id.as_str())
                    .iter()
                    .any(|dependent| !self.fixed.contains(dependent))
            })
            .collect();

        let mut branches = power_set(&variable);
        branches.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut best = 0;
        for subset in &branches {
            let Some(score) = self.branch_score(candidate, subset) else {
                continue;
            };
            if self.missing(score) <= 0 {
                trace!(%candidate, score, "Target reachable");
                return None;
            }
            best = best.max(score);
        }

        let missing = self.missing(best);
        trace!(%candidate, best, missing, branches = branches.len(), "Target unreachable");
        Some(u32::try_from(missing).unwrap_or(u32::MAX))
    }

    /// Value collected by a branch that buys `candidate` and `subset`, or
    /// `None` if the subset does not fit or cannot be bought.
    fn branch_score(&self, candidate: &CardId, subset: &[&CardId]) -> Option<u32> {
        let mut taken: HashSet<&CardId> = HashSet::new();
        taken.insert(candidate);
        let mut slots = self.remaining_slots - 1;
        let mut score = self.cost(candidate.as_str());

        let planned: HashSet<&CardId> = subset.iter().copied().chain([candidate]).collect();
        for id in subset {
            if slots == 0 || !self.satisfied(id.as_str(), &planned) {
                return None;
            }
            taken.insert(*id);
            slots -= 1;
            score += self.cost(id.as_str());
        }

        let order: Vec<&CardId> = self
            .rules
            .descending()
            .iter()
            .filter(|id| !self.fixed.contains(*id))
            .collect();

        let mut position = 0;
        while slots > 0 && position < order.len() {
            let id = order[position];
            position += 1;
            if taken.contains(id) {
                continue;
            }
            if self.satisfied(id.as_str(), &taken) {
                taken.insert(id);
                slots -= 1;
                score += self.cost(id.as_str());
                continue;
            }

            let Some(chain) = self.best_chain(&order, &taken, slots) else {
                continue;
            };
            let run: Vec<&CardId> = order[position..]
                .iter()
                .copied()
                .filter(|other| {
                    !taken.contains(other) && self.rules.prerequisite_of(other.as_str()).is_none()
                })
                .take(chain.len())
                .collect();

            let chain_value: u32 = chain.iter().map(|id| self.cost(id.as_str())).sum();
            let run_value: u32 = run.iter().map(|id| self.cost(id.as_str())).sum();
            // Compare average value per step without dividing.
            let steps = if run.is_empty()
                || u64::from(chain_value) * run.len() as u64
                    > u64::from(run_value) * chain.len() as u64
            {
                chain
            } else {
                run
            };
            for step in steps {
                taken.insert(step);
                slots -= 1;
                score += self.cost(step.as_str());
            }
        }

        Some(score)
    }

    /// Cards needed to buy `id`: its unsatisfied prerequisites, root first,
    /// followed by the card itself.
    fn chain<'o>(
        &self,
        id: &'o CardId,
        order: &[&'o CardId],
        taken: &HashSet<&CardId>,
    ) -> Vec<&'o CardId> {
        let mut chain = vec![id];
        let mut current = id;
        while !self.satisfied(current.as_str(), taken) {
            let Some(prerequisite) = self.rules.prerequisite_of(current.as_str()) else {
                break;
            };
            let Some(next) = order.iter().copied().find(|other| *other == prerequisite) else {
                break;
            };
            chain.push(next);
            current = next;
        }
        chain.reverse();
        chain
    }

    /// Complete prerequisite chain with the highest value per step that
    /// fits into `slots`.
    fn best_chain<'o>(
        &self,
        order: &[&'o CardId],
        taken: &HashSet<&CardId>,
        slots: u32,
    ) -> Option<Vec<&'o CardId>> {
        let mut best: Option<(Vec<&'o CardId>, u32)> = None;
        for id in order.iter().copied() {
            if taken.contains(id) || self.satisfied(id.as_str(), taken) {
                continue;
            }
            let chain = self.chain(id, order, taken);
            if chain.len() as u64 > u64::from(slots)
                || chain.iter().any(|step| taken.contains(step))
            {
                continue;
            }
            let value: u32 = chain.iter().map(|step| self.cost(step.as_str())).sum();
            let better = match &best {
                None => true,
                Some((current, current_value)) => {
                    u64::from(value) * current.len() as u64
                        > u64::from(*current_value) * chain.len() as u64
                }
            };
            if better {
                best = Some((chain, value));
            }
        }
        best.map(|(chain, _)| chain)
    }
}
