//! Immutable, derived view over a rule data file.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use super::models::{
    CardDefinition, CardId, CommodityDefinition, CommodityId, GameOptions, RawRules,
};

/// Inconsistencies detected while building a [`RuleSet`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleSetError {
    /// A card or commodity has an empty identifier.
    #[error("rule data contains an empty {0} id")]
    EmptyId(&'static str),
    /// Two cards share the same identifier.
    #[error("card '{0}' is defined more than once")]
    DuplicateCard(CardId),
    /// Two commodities share the same identifier.
    #[error("commodity '{0}' is defined more than once")]
    DuplicateCommodity(CommodityId),
    /// A commodity can never be held.
    #[error("commodity '{0}' has a maximum count of zero")]
    EmptyCommodity(CommodityId),
    /// A prerequisite points at a card that does not exist.
    #[error("card '{card}' requires unknown card '{prerequisite}'")]
    UnknownPrerequisite {
        /// Card declaring the prerequisite.
        card: CardId,
        /// Missing prerequisite id.
        prerequisite: CardId,
    },
    /// Prerequisites loop back onto themselves.
    #[error("prerequisite chain of card '{0}' is cyclic")]
    PrerequisiteCycle(CardId),
    /// A credit map references a card that does not exist.
    #[error("card '{source_card}' grants credit to unknown card '{target}'")]
    UnknownCreditTarget {
        /// Card granting the credit.
        source_card: CardId,
        /// Missing target id.
        target: CardId,
    },
    /// A card grants credit to itself.
    #[error("card '{0}' grants credit to itself")]
    SelfCredit(CardId),
}

/// Card and commodity definitions plus everything derived from them.
///
/// A rule set is fully determined by the rule data and the chosen game
/// options and never changes after construction.
#[derive(Debug, Clone)]
pub struct RuleSet {
    id: String,
    title: String,
    cards: Vec<CardDefinition>,
    index: HashMap<CardId, usize>,
    commodities: Vec<CommodityDefinition>,
    credits_received: HashMap<CardId, BTreeMap<CardId, u32>>,
    max_credits_received: HashMap<CardId, u32>,
    ascending: Vec<CardId>,
    descending: Vec<CardId>,
    with_prerequisites: Vec<CardId>,
    prerequisite_ids: Vec<CardId>,
    dependents: HashMap<CardId, Vec<CardId>>,
    has_mining_bonus: bool,
    multi_use_credits: bool,
    card_limit: Option<u32>,
    points_targets: Vec<u32>,
}

impl RuleSet {
    /// Validate raw rule data and derive the lookup tables.
    pub fn new(raw: RawRules, options: &GameOptions) -> Result<Self, RuleSetError> {
        let RawRules {
            id,
            title,
            options: declared,
            cards,
            commodities,
            ..
        } = raw;

        let mut index = HashMap::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            if card.id.as_str().is_empty() {
                return Err(RuleSetError::EmptyId("card"));
            }
            if index.insert(card.id.clone(), position).is_some() {
                return Err(RuleSetError::DuplicateCard(card.id.clone()));
            }
        }

        let mut seen_commodities = HashSet::with_capacity(commodities.len());
        for commodity in &commodities {
            if commodity.id.as_str().is_empty() {
                return Err(RuleSetError::EmptyId("commodity"));
            }
            if !seen_commodities.insert(commodity.id.clone()) {
                return Err(RuleSetError::DuplicateCommodity(commodity.id.clone()));
            }
            if commodity.max == 0 {
                return Err(RuleSetError::EmptyCommodity(commodity.id.clone()));
            }
        }

        let mut dependents: HashMap<CardId, Vec<CardId>> = HashMap::new();
        for card in &cards {
            if let Some(prerequisite) = &card.prerequisite {
                if !index.contains_key(prerequisite) {
                    return Err(RuleSetError::UnknownPrerequisite {
                        card: card.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
                dependents
                    .entry(prerequisite.clone())
                    .or_default()
                    .push(card.id.clone());
            }
        }
        for card in &cards {
            let mut steps = 0;
            let mut current = card.prerequisite.as_ref();
            while let Some(prerequisite) = current {
                steps += 1;
                if prerequisite == &card.id || steps > cards.len() {
                    return Err(RuleSetError::PrerequisiteCycle(card.id.clone()));
                }
                current = cards[index[prerequisite]].prerequisite.as_ref();
            }
        }

        let mut credits_received: HashMap<CardId, BTreeMap<CardId, u32>> = cards
            .iter()
            .map(|card| (card.id.clone(), BTreeMap::new()))
            .collect();
        for card in &cards {
            for (target, amount) in &card.credits {
                if target == &card.id {
                    return Err(RuleSetError::SelfCredit(card.id.clone()));
                }
                let received = credits_received.get_mut(target).ok_or_else(|| {
                    RuleSetError::UnknownCreditTarget {
                        source_card: card.id.clone(),
                        target: target.clone(),
                    }
                })?;
                received.insert(card.id.clone(), *amount);
            }
        }
        let max_credits_received = credits_received
            .iter()
            .map(|(id, sources)| (id.clone(), sources.values().sum()))
            .collect();

        let mut ascending: Vec<&CardDefinition> = cards.iter().collect();
        ascending.sort_by_key(|card| card.cost);
        let ascending = ascending.into_iter().map(|card| card.id.clone()).collect();
        // Equal costs keep declaration order in both directions.
        let mut descending: Vec<&CardDefinition> = cards.iter().collect();
        descending.sort_by(|a, b| b.cost.cmp(&a.cost));
        let descending = descending.into_iter().map(|card| card.id.clone()).collect();

        let with_prerequisites = cards
            .iter()
            .filter(|card| card.prerequisite.is_some())
            .map(|card| card.id.clone())
            .collect();
        let prerequisite_ids = cards
            .iter()
            .filter(|card| dependents.contains_key(&card.id))
            .map(|card| card.id.clone())
            .collect();
        let has_mining_bonus = cards.iter().any(|card| card.mining_bonus);

        Ok(Self {
            id,
            title,
            cards,
            index,
            commodities,
            credits_received,
            max_credits_received,
            ascending,
            descending,
            with_prerequisites,
            prerequisite_ids,
            dependents,
            has_mining_bonus,
            multi_use_credits: options
                .multi_use_credits
                .unwrap_or(declared.multi_use_credits),
            card_limit: options.card_limit.or(declared.card_limit),
            points_targets: declared.points_targets,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// All card definitions in declaration order.
    pub fn cards(&self) -> &[CardDefinition] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&CardDefinition> {
        self.index.get(id).map(|position| &self.cards[*position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nominal cost of a card, zero for unknown ids.
    pub fn cost_of(&self, id: &str) -> u32 {
        self.card(id).map(|card| card.cost).unwrap_or(0)
    }

    /// Display name in `language`, falling back to English and then the id.
    pub fn display_name<'a>(&'a self, id: &'a str, language: &str) -> &'a str {
        self.card(id)
            .map(|card| card.display_name(language))
            .unwrap_or(id)
    }

    pub fn commodities(&self) -> &[CommodityDefinition] {
        &self.commodities
    }

    pub fn commodity(&self, id: &str) -> Option<&CommodityDefinition> {
        self.commodities
            .iter()
            .find(|commodity| commodity.id.as_str() == id)
    }

    /// Source card → credit granted, for every card crediting `id`.
    pub fn credits_received_by(&self, id: &str) -> Option<&BTreeMap<CardId, u32>> {
        self.credits_received.get(id)
    }

    /// Sum of all inbound credit a card could ever receive.
    pub fn max_credits_received(&self, id: &str) -> u32 {
        self.max_credits_received.get(id).copied().unwrap_or(0)
    }

    /// Every card id ordered by nominal cost; ties keep declaration order.
    pub fn card_ids_by_nominal_value(&self, ascending: bool) -> Vec<CardId> {
        if ascending {
            self.ascending.clone()
        } else {
            self.descending.clone()
        }
    }

    pub(crate) fn ascending(&self) -> &[CardId] {
        &self.ascending
    }

    /// Not simply the ascending list reversed: equal costs keep declaration
    /// order.
    pub(crate) fn descending(&self) -> &[CardId] {
        &self.descending
    }

    pub fn prerequisite_of(&self, id: &str) -> Option<&CardId> {
        self.card(id).and_then(|card| card.prerequisite.as_ref())
    }

    /// Cards that require another card to be owned first.
    pub fn cards_with_prerequisites(&self) -> &[CardId] {
        &self.with_prerequisites
    }

    /// Cards that are the prerequisite of at least one other card.
    pub fn prerequisite_card_ids(&self) -> &[CardId] {
        &self.prerequisite_ids
    }

    /// Cards that name `id` as their prerequisite.
    pub fn dependents_of(&self, id: &str) -> &[CardId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_mining_bonus(&self) -> bool {
        self.has_mining_bonus
    }

    pub fn multi_use_credits_enabled(&self) -> bool {
        self.multi_use_credits
    }

    pub fn card_limit(&self) -> Option<u32> {
        self.card_limit
    }

    pub fn points_targets(&self) -> &[u32] {
        &self.points_targets
    }
}
