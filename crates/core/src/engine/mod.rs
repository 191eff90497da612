//! Per-card state machine over a player's situation.

#![allow(missing_docs)]

mod situation;
mod state;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, info, warn};

pub use situation::{Situation, SituationRecord};
pub use state::{CardRuntimeState, CardState, StateArgument};

use crate::{
    credit::CreditLedger,
    funds::{recalc_total_funds, FundsSnapshot, FundsTotals},
    rules::{CardId, RuleSet},
    search::FinishabilitySearch,
};

/// Computes and updates the state of every card for one player.
///
/// The engine owns the player's [`Situation`] and shares the immutable
/// [`RuleSet`]. Every mutation runs the credit ledger before the state
/// recalculation, so states always see current credit sums.
#[derive(Debug, Clone)]
pub struct StateEngine {
    rules: Arc<RuleSet>,
    situation: Situation,
}

impl StateEngine {
    /// Build the engine for `record` and compute the initial card states.
    pub fn new(rules: Arc<RuleSet>, record: SituationRecord) -> Self {
        let owned = record.owned.clone();
        let mut engine = Self {
            rules,
            situation: Situation::new(record),
        };
        engine.initialize_states(owned);
        engine
    }

    /// Rebuild every card state from `owned`, dropping all planned cards.
    ///
    /// Unknown and duplicate ids are skipped, so the owned list written back
    /// to the record only holds cards of the current rules.
    pub fn initialize_states(
        &mut self,
        owned: Vec<CardId>,
    ) -> &HashMap<CardId, CardRuntimeState> {
        let rules = Arc::clone(&self.rules);
        let situation = &mut self.situation;

        situation.cards = rules
            .cards()
            .iter()
            .map(|card| (card.id.clone(), CardRuntimeState::new(card.id.clone())))
            .collect();
        situation.planned.clear();
        situation.planned_value = 0;
        situation.score = 0;
        situation.num_owned = 0;
        situation.record.owned.clear();

        for id in owned {
            let Some(definition) = rules.card(id.as_str()) else {
                warn!(card = %id, rules = rules.id(), "Ignoring unknown owned card");
                continue;
            };
            let Some(card) = situation.cards.get_mut(&id) else {
                continue;
            };
            if card.state == CardState::Owned {
                warn!(card = %id, "Ignoring duplicate owned card");
                continue;
            }
            card.set_state(CardState::Owned, None);
            situation.score += definition.cost;
            situation.num_owned += 1;
            for (target, amount) in &definition.credits {
                if let Some(target) = situation.cards.get_mut(target) {
                    target.set_credit(&id, *amount);
                }
            }
            situation.record.owned.push(id);
        }

        self.refresh_funds();
        self.recalculate();
        &self.situation.cards
    }

    /// Rebuild the situation from its record, as after a fresh load.
    pub fn reload(&mut self) {
        let owned = self.situation.record.owned.clone();
        self.initialize_states(owned);
    }

    /// Refresh the state of every card that is neither owned nor planned.
    ///
    /// Cards are visited by ascending nominal value. Once one card is found
    /// safe to buy, every more expensive card is too, so the finishability
    /// search is skipped for the rest of the pass.
    pub fn recalculate(&mut self) {
        let rules = Arc::clone(&self.rules);
        let remaining_funds = self.remaining_funds();
        let language = self.situation.record.language.clone();
        let search = self.finishability_search(&rules);
        let mut discouraged_possible = search.is_some();

        for id in rules.ascending() {
            let Some(card) = self.situation.cards.get(id) else {
                continue;
            };
            if card.state.is_fixed() {
                continue;
            }

            let blocking = rules.prerequisite_of(id.as_str()).filter(|prerequisite| {
                self.situation.cards.get(*prerequisite).map(|card| card.state)
                    != Some(CardState::Owned)
            });
            let current_cost = i64::from(card.current_cost(rules.cost_of(id.as_str())));

            let (state, argument) = if let Some(prerequisite) = blocking {
                let name = rules.display_name(prerequisite.as_str(), &language);
                (CardState::PrereqFailed, Some(StateArgument::Name(name.to_string())))
            } else if current_cost > remaining_funds {
                (CardState::Unaffordable, None)
            } else if let Some(search) = search.as_ref().filter(|_| discouraged_possible) {
                match search.shortfall(id) {
                    Some(missing) => (
                        CardState::Discouraged,
                        Some(StateArgument::Points(missing)),
                    ),
                    None => {
                        discouraged_possible = false;
                        (CardState::Absent, None)
                    }
                }
            } else {
                (CardState::Absent, None)
            };

            if let Some(card) = self.situation.cards.get_mut(id) {
                let previous = card.state;
                if card.set_state(state, argument) {
                    debug!(card = %id, from = ?previous, to = ?state, "Card state changed");
                }
            }
        }
    }

    /// Revalue the funds; the mining yield only counts while a card granting
    /// it is owned.
    fn refresh_funds(&mut self) {
        let mining_bonus_owned = self.mining_bonus_available();
        self.situation.funds = recalc_total_funds(
            &self.situation.record.funds,
            &self.rules,
            mining_bonus_owned,
        );
    }

    fn finishability_search<'r>(&self, rules: &'r RuleSet) -> Option<FinishabilitySearch<'r>> {
        let limit = rules.card_limit()?;
        let target = self.points_target()?;
        let used = self.situation.num_owned + self.situation.num_planned();
        if limit <= used {
            return None;
        }
        let fixed: HashSet<CardId> = self
            .situation
            .cards
            .values()
            .filter(|card| card.state.is_fixed())
            .map(|card| card.id.clone())
            .collect();
        let missing_before = i64::from(target)
            - i64::from(self.situation.score)
            - i64::from(self.situation.planned_value);
        Some(FinishabilitySearch::new(
            rules,
            fixed,
            limit - used,
            missing_before,
        ))
    }

    /// Mark a card for purchase. Returns the card and every card whose
    /// projected credit changed, or nothing if the card cannot be planned.
    pub fn plan_card(&mut self, id: &str) -> Vec<CardId> {
        let rules = Arc::clone(&self.rules);
        let Some(definition) = rules.card(id) else {
            return Vec::new();
        };
        let situation = &mut self.situation;
        match situation.cards.get_mut(id) {
            Some(card) if card.state.is_plannable() => {
                card.set_state(CardState::Planned, None);
            }
            _ => return Vec::new(),
        }
        situation.planned.push(definition.id.clone());
        situation.planned_value += definition.cost;

        let mut affected = vec![definition.id.clone()];
        for (target, amount) in &definition.credits {
            if let Some(card) = situation.cards.get_mut(target) {
                card.set_planned_credit(&definition.id, *amount);
                affected.push(target.clone());
            }
        }
        CreditLedger::new(&rules, &mut situation.cards).recalc_after_change(id);
        debug!(card = id, planned = situation.planned.len(), "Card planned");

        self.recalculate();
        affected
    }

    /// Withdraw a planned card. Returns the card and every card whose
    /// projected credit changed, or nothing if the card was not planned.
    pub fn unplan_card(&mut self, id: &str) -> Vec<CardId> {
        let rules = Arc::clone(&self.rules);
        let Some(definition) = rules.card(id) else {
            return Vec::new();
        };
        let situation = &mut self.situation;
        match situation.cards.get_mut(id) {
            Some(card) if card.state == CardState::Planned => {
                card.set_state(CardState::Absent, None);
            }
            _ => return Vec::new(),
        }
        situation.planned.retain(|planned| planned.as_str() != id);
        situation.planned_value -= definition.cost;

        let mut affected = vec![definition.id.clone()];
        for target in definition.credits.keys() {
            if let Some(card) = situation.cards.get_mut(target) {
                card.remove_planned_credit(id);
                affected.push(target.clone());
            }
        }
        let mut ledger = CreditLedger::new(&rules, &mut situation.cards);
        if situation.planned.is_empty() {
            ledger.reset_all();
        } else {
            ledger.recalc_after_change(id);
        }
        debug!(card = id, planned = situation.planned.len(), "Card unplanned");

        self.recalculate();
        affected
    }

    /// Buy every planned card. Returns the bought cards in planning order.
    pub fn buy_planned_cards(&mut self) -> Vec<CardId> {
        let rules = Arc::clone(&self.rules);
        let situation = &mut self.situation;
        if situation.planned.is_empty() {
            return Vec::new();
        }

        let bought = std::mem::take(&mut situation.planned);
        for id in &bought {
            let Some(definition) = rules.card(id.as_str()) else {
                continue;
            };
            if let Some(card) = situation.cards.get_mut(id) {
                card.set_state(CardState::Owned, None);
            }
            situation.score += definition.cost;
            situation.num_owned += 1;
            for (target, amount) in &definition.credits {
                if let Some(card) = situation.cards.get_mut(target) {
                    card.set_credit(id, *amount);
                    card.remove_planned_credit(id.as_str());
                }
            }
            situation.record.owned.push(id.clone());
        }
        situation.planned_value = 0;
        CreditLedger::new(&rules, &mut situation.cards).reset_all();
        info!(
            count = bought.len(),
            score = situation.score,
            "Bought planned cards"
        );

        self.refresh_funds();
        self.recalculate();
        bought
    }

    /// Give up an owned card.
    ///
    /// Credit the card granted to other cards is not withdrawn here; callers
    /// persist the record and [`reload`](Self::reload) to resynchronise.
    pub fn discard(&mut self, id: &str) -> bool {
        let cost = self.rules.cost_of(id);
        let situation = &mut self.situation;
        match situation.cards.get_mut(id) {
            Some(card) if card.state == CardState::Owned => {
                card.set_state(CardState::Absent, None);
            }
            _ => return false,
        }
        situation.score -= cost;
        situation.num_owned -= 1;
        situation.record.owned.retain(|owned| owned.as_str() != id);
        info!(card = id, score = situation.score, "Card discarded");

        self.refresh_funds();
        self.recalculate();
        true
    }

    /// Replace the player's funds and refresh affordability.
    pub fn set_funds(&mut self, funds: FundsSnapshot) -> FundsTotals {
        self.situation.record.funds = funds;
        self.refresh_funds();
        debug!(total = self.situation.funds.total, "Funds updated");
        self.recalculate();
        self.situation.funds
    }

    /// Choose a points target; `None` falls back to the rules' first choice.
    pub fn set_points_target(&mut self, target: Option<u32>) {
        self.situation.record.points_target = target;
        self.recalculate();
    }

    /// Switch the language used for state explanations.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.situation.record.language = language.into();
        self.recalculate();
    }

    pub fn set_card_filter(&mut self, active: bool) {
        self.situation.record.card_filter_active = active;
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn situation(&self) -> &Situation {
        &self.situation
    }

    /// The persisted part of the situation.
    pub fn record(&self) -> &SituationRecord {
        &self.situation.record
    }

    /// Snapshot of a card's runtime state.
    pub fn card(&self, id: &str) -> Option<CardRuntimeState> {
        self.situation.cards.get(id).cloned()
    }

    pub fn card_state(&self, id: &str) -> Option<CardState> {
        self.situation.cards.get(id).map(|card| card.state)
    }

    pub fn score(&self) -> u32 {
        self.situation.score
    }

    /// Nominal cost minus all active credit, floored at zero.
    pub fn current_cost(&self, id: &str) -> Option<u32> {
        let card = self.situation.cards.get(id)?;
        Some(card.current_cost(self.rules.cost_of(id)))
    }

    pub fn num_owned_cards(&self) -> u32 {
        self.situation.num_owned
    }

    pub fn num_planned_cards(&self) -> u32 {
        self.situation.num_planned()
    }

    /// Nominal value of all planned cards.
    pub fn planned_value(&self) -> u32 {
        self.situation.planned_value
    }

    pub fn planned_cards(&self) -> &[CardId] {
        &self.situation.planned
    }

    pub fn total_funds(&self) -> u32 {
        self.situation.funds.total
    }

    pub fn max_mining_yield(&self) -> u32 {
        self.situation.funds.max_mining_yield
    }

    /// Whether the player owns a card granting the mining bonus.
    pub fn mining_bonus_available(&self) -> bool {
        self.rules.has_mining_bonus()
            && self.rules.cards().iter().any(|card| {
                card.mining_bonus && self.card_state(card.id.as_str()) == Some(CardState::Owned)
            })
    }

    /// Funds left after paying the current cost of every planned card.
    /// Negative when the plan exceeds the funds.
    pub fn remaining_funds(&self) -> i64 {
        let planned_cost: i64 = self
            .situation
            .planned
            .iter()
            .filter_map(|id| self.current_cost(id.as_str()))
            .map(i64::from)
            .sum();
        i64::from(self.situation.funds.total) - planned_cost
    }

    /// The points target in effect for the discouragement check.
    pub fn points_target(&self) -> Option<u32> {
        self.situation
            .record
            .points_target
            .or_else(|| self.rules.points_targets().first().copied())
    }

    /// Card states in declaration order. With the card filter active, cards
    /// that cannot be bought this turn are left out.
    pub fn visible_cards(&self) -> Vec<CardRuntimeState> {
        let filter = self.situation.record.card_filter_active;
        self.rules
            .cards()
            .iter()
            .filter_map(|definition| self.situation.cards.get(&definition.id))
            .filter(|card| {
                !filter
                    || !matches!(
                        card.state,
                        CardState::PrereqFailed | CardState::Unaffordable
                    )
            })
            .cloned()
            .collect()
    }

    /// Number of owned cards per thematic group.
    pub fn owned_groups(&self) -> BTreeMap<String, u32> {
        let mut groups = BTreeMap::new();
        for definition in self.rules.cards() {
            if self.card_state(definition.id.as_str()) != Some(CardState::Owned) {
                continue;
            }
            for group in &definition.groups {
                *groups.entry(group.clone()).or_insert(0) += 1;
            }
        }
        groups
    }
}
