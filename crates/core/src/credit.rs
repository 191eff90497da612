//! Credit bookkeeping for rulesets where a card's credit is exclusive.
//!
//! With multi-use credits (the default) every owned card credits all of its
//! targets in full and the ledger does nothing. Otherwise an owned card's
//! credit goes to the planned target it helps most, and every other target
//! only keeps whatever exceeds that amount.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    engine::{CardRuntimeState, CardState},
    rules::{CardId, RuleSet},
};

/// Recomputes effective owned credit over a situation's card states.
pub(crate) struct CreditLedger<'a> {
    rules: &'a RuleSet,
    cards: &'a mut HashMap<CardId, CardRuntimeState>,
}

impl<'a> CreditLedger<'a> {
    pub(crate) fn new(
        rules: &'a RuleSet,
        cards: &'a mut HashMap<CardId, CardRuntimeState>,
    ) -> Self {
        Self { rules, cards }
    }

    fn state_of(&self, id: &str) -> Option<CardState> {
        self.cards.get(id).map(|card| card.state)
    }

    /// Set the credit `target` receives from `source`, keeping its sum current.
    pub(crate) fn change_credit(&mut self, target: &CardId, source: &CardId, amount: u32) {
        if let Some(card) = self.cards.get_mut(target) {
            if card.credit_received.get(source) != Some(&amount) {
                trace!(%target, %source, amount, "Credit changed");
            }
            card.set_credit(source, amount);
        }
    }

    /// Redistribute the credit of every owned card that credits `changed`.
    pub(crate) fn recalc_after_change(&mut self, changed: &str) {
        if self.rules.multi_use_credits_enabled() {
            return;
        }
        let rules = self.rules;
        let Some(sources) = rules.credits_received_by(changed) else {
            return;
        };

        for giving in sources.keys() {
            if self.state_of(giving.as_str()) != Some(CardState::Owned) {
                continue;
            }
            let Some(definition) = rules.card(giving.as_str()) else {
                continue;
            };

            // Equal amounts keep the first target in map order.
            let mut winner: Option<(&CardId, u32)> = None;
            for (target, amount) in &definition.credits {
                if self.state_of(target.as_str()) != Some(CardState::Planned) {
                    continue;
                }
                match winner {
                    Some((_, best)) if best >= *amount => {}
                    _ => winner = Some((target, *amount)),
                }
            }

            for (target, full) in &definition.credits {
                if self.state_of(target.as_str()) == Some(CardState::Owned) {
                    continue;
                }
                let effective = match winner {
                    Some((winning, amount)) if winning != target => full.saturating_sub(amount),
                    _ => *full,
                };
                self.change_credit(target, giving, effective);
            }
        }
    }

    /// Rebuild all owned credit from scratch as if nothing were planned.
    pub(crate) fn reset_all(&mut self) {
        if self.rules.multi_use_credits_enabled() {
            return;
        }
        let owned: Vec<CardId> = self
            .cards
            .values()
            .filter(|card| card.state == CardState::Owned)
            .map(|card| card.id.clone())
            .collect();

        for card in self.cards.values_mut() {
            card.clear_credit();
        }
        for source in &owned {
            let Some(definition) = self.rules.card(source.as_str()) else {
                continue;
            };
            for (target, amount) in &definition.credits {
                self.change_credit(target, source, *amount);
            }
        }
    }
}
