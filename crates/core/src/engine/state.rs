#![allow(missing_docs)]

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::rules::CardId;

/// Displayable state of a civilization card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardState {
    /// Bought in an earlier turn.
    Owned,
    /// Marked for purchase this turn.
    Planned,
    /// Can be bought.
    Absent,
    /// Can be bought, but doing so makes the points target unreachable.
    Discouraged,
    /// Its prerequisite card is not owned.
    PrereqFailed,
    /// Costs more than the remaining funds.
    Unaffordable,
}

impl CardState {
    /// Owned and planned states only change through explicit player actions.
    pub fn is_fixed(self) -> bool {
        matches!(self, Self::Owned | Self::Planned)
    }

    /// Whether a card in this state may be marked for purchase.
    pub fn is_plannable(self) -> bool {
        matches!(self, Self::Absent | Self::Discouraged)
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Owned => "owned",
            Self::Planned => "planned",
            Self::Absent => "absent",
            Self::Discouraged => "discouraged",
            Self::PrereqFailed => "prerequisite missing",
            Self::Unaffordable => "unaffordable",
        };
        f.write_str(label)
    }
}

/// Explanation attached to a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateArgument {
    /// Points still missing to the target.
    Points(u32),
    /// Display name of the blocking prerequisite.
    Name(String),
}

impl fmt::Display for StateArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Points(points) => write!(f, "{points} points short"),
            Self::Name(name) => write!(f, "requires {name}"),
        }
    }
}

/// Mutable per-card state within a situation.
///
/// `sum_credit_received` always equals the sum of `credit_received`, and
/// `sum_planned_credit` the sum of `planned_credit`; both are only updated
/// through the setters below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRuntimeState {
    pub id: CardId,
    pub state: CardState,
    pub state_argument: Option<StateArgument>,
    /// Credit received from owned cards, by source card.
    pub credit_received: BTreeMap<CardId, u32>,
    pub sum_credit_received: u32,
    /// Credit projected from planned cards, by source card.
    pub planned_credit: BTreeMap<CardId, u32>,
    pub sum_planned_credit: u32,
}

impl CardRuntimeState {
    pub fn new(id: CardId) -> Self {
        Self {
            id,
            state: CardState::Absent,
            state_argument: None,
            credit_received: BTreeMap::new(),
            sum_credit_received: 0,
            planned_credit: BTreeMap::new(),
            sum_planned_credit: 0,
        }
    }

    /// Owned plus projected credit.
    pub fn total_credit(&self) -> u32 {
        self.sum_credit_received + self.sum_planned_credit
    }

    /// Nominal cost minus all active credit, floored at zero.
    pub fn current_cost(&self, nominal: u32) -> u32 {
        nominal.saturating_sub(self.total_credit())
    }

    pub(crate) fn set_state(&mut self, state: CardState, argument: Option<StateArgument>) -> bool {
        let changed = self.state != state || self.state_argument != argument;
        self.state = state;
        self.state_argument = argument;
        changed
    }

    pub(crate) fn set_credit(&mut self, source: &CardId, amount: u32) {
        let previous = self.credit_received.insert(source.clone(), amount).unwrap_or(0);
        self.sum_credit_received = self.sum_credit_received - previous + amount;
    }

    pub(crate) fn clear_credit(&mut self) {
        self.credit_received.clear();
        self.sum_credit_received = 0;
    }

    pub(crate) fn set_planned_credit(&mut self, source: &CardId, amount: u32) {
        let previous = self.planned_credit.insert(source.clone(), amount).unwrap_or(0);
        self.sum_planned_credit = self.sum_planned_credit - previous + amount;
    }

    pub(crate) fn remove_planned_credit(&mut self, source: &str) {
        if let Some(previous) = self.planned_credit.remove(source) {
            self.sum_planned_credit -= previous;
        }
    }
}
