use std::sync::Arc;

use civcalc_core::{
    recalc_total_funds, rules::RawRules, CardId, CardState, FundsSnapshot, GameOptions, RuleSet,
    SituationRecord, StateArgument, StateEngine,
};
use serde_json::json;

const DEMO_RULES: &str = include_str!("../../../data/rules/demo.json");

fn demo_rules() -> Arc<RuleSet> {
    let raw: RawRules = serde_json::from_str(DEMO_RULES).expect("demo rules parse");
    Arc::new(RuleSet::new(raw, &GameOptions::default()).expect("demo rules are consistent"))
}

fn two_card_rules() -> Arc<RuleSet> {
    let raw: RawRules = serde_json::from_value(json!({
        "id": "two",
        "title": "Two Cards",
        "options": { "card_limit": 2, "points_targets": [25] },
        "cards": [
            { "id": "a", "names": { "en": "A" }, "cost": 10 },
            { "id": "b", "names": { "en": "B" }, "cost": 20, "prerequisite": "a" }
        ]
    }))
    .expect("rule json");
    Arc::new(RuleSet::new(raw, &GameOptions::default()).expect("rule set"))
}

fn engine_with(rules: &Arc<RuleSet>, owned: &[&str], funds: FundsSnapshot) -> StateEngine {
    let mut record = SituationRecord::new("Ada", rules.id());
    record.owned = owned.iter().map(|id| CardId::from(*id)).collect();
    record.funds = funds;
    StateEngine::new(Arc::clone(rules), record)
}

fn treasury(value: i32) -> FundsSnapshot {
    let mut funds = FundsSnapshot::default();
    funds.set_treasury(value);
    funds
}

fn rich() -> FundsSnapshot {
    let mut funds = FundsSnapshot::default();
    funds.set_count("gold", 5);
    funds.set_count("bronze", 6);
    funds.set_count("cloth", 7);
    funds
}

fn assert_consistent(engine: &StateEngine) {
    let rules = engine.rules();
    let mut owned_value = 0;
    for definition in rules.cards() {
        let card = engine.card(definition.id.as_str()).expect("every card has a state");
        assert_eq!(
            card.sum_credit_received,
            card.credit_received.values().sum::<u32>(),
            "{}",
            card.id
        );
        assert_eq!(
            card.sum_planned_credit,
            card.planned_credit.values().sum::<u32>(),
            "{}",
            card.id
        );
        if card.state == CardState::Owned {
            owned_value += definition.cost;
        }
    }
    assert_eq!(engine.score(), owned_value);

    let mut again = engine.clone();
    again.recalculate();
    assert_eq!(again.situation().cards(), engine.situation().cards());
}

#[test]
fn unowned_prerequisite_blocks_dependent() {
    let rules = two_card_rules();
    let engine = engine_with(&rules, &[], treasury(30));
    assert_eq!(engine.card_state("a"), Some(CardState::Absent));
    let b = engine.card("b").expect("b");
    assert_eq!(b.state, CardState::PrereqFailed);
    assert_eq!(b.state_argument, Some(StateArgument::Name("A".into())));
    assert_consistent(&engine);
}

#[test]
fn owned_prerequisite_leaves_room_to_finish() {
    let rules = two_card_rules();
    let engine = engine_with(&rules, &["a"], treasury(30));
    assert_eq!(engine.score(), 10);
    assert_eq!(engine.card_state("b"), Some(CardState::Absent));
    assert_consistent(&engine);
}

#[test]
fn two_wine_commodities_pool_their_value() {
    let raw: RawRules = serde_json::from_value(json!({
        "id": "wine",
        "title": "Wine",
        "cards": [],
        "commodities": [
            { "id": "x", "base": 3, "max": 9, "wine": true },
            { "id": "y", "base": 4, "max": 9, "wine": true }
        ]
    }))
    .expect("rule json");
    let rules = RuleSet::new(raw, &GameOptions::default()).expect("rule set");
    let mut funds = FundsSnapshot::default();
    funds.set_count("x", 2);
    funds.set_count("y", 1);
    assert_eq!(recalc_total_funds(&funds, &rules, false).total, 30);
}

#[test]
fn mining_yield_requires_owning_the_bonus_card() {
    let rules = demo_rules();
    let mut funds = FundsSnapshot::default();
    funds.set_count("ochre", 3);
    funds.use_mining_bonus = true;

    let engine = engine_with(&rules, &[], funds.clone());
    assert!(!engine.mining_bonus_available());
    assert_eq!(engine.max_mining_yield(), 7);
    assert_eq!(engine.total_funds(), 9);
    assert_consistent(&engine);

    let mut engine = engine_with(&rules, &["metalworking", "mining"], funds);
    assert!(engine.mining_bonus_available());
    assert_eq!(engine.total_funds(), 16);

    assert!(engine.discard("mining"));
    assert_eq!(engine.total_funds(), 9);
}

#[test]
fn demo_rules_cover_every_feature() {
    let rules = demo_rules();
    assert_eq!(rules.card_limit(), Some(8));
    assert!(rules.has_mining_bonus());
    assert_eq!(rules.max_credits_received("philosophy"), 55);
    assert_eq!(
        rules.prerequisite_card_ids(),
        [
            CardId::from("mysticism"),
            CardId::from("metalworking"),
            CardId::from("philosophy")
        ]
    );
}

#[test]
fn target_one_point_out_of_reach_discourages_cheapest_card() {
    let rules = demo_rules();
    let mut engine = engine_with(
        &rules,
        &["pottery", "cloth_making", "mysticism", "literacy", "agriculture"],
        rich(),
    );
    assert_eq!(engine.score(), 390);
    assert_eq!(engine.total_funds(), 225 + 216 + 245);

    engine.set_points_target(Some(1001));
    let metalworking = engine.card("metalworking").expect("card");
    assert_eq!(metalworking.state, CardState::Discouraged);
    assert_eq!(metalworking.state_argument, Some(StateArgument::Points(1)));
    assert_eq!(engine.card_state("law"), Some(CardState::Absent));
    assert_eq!(engine.card_state("philosophy"), Some(CardState::Absent));
    assert_eq!(engine.card_state("mining"), Some(CardState::PrereqFailed));
    assert_eq!(
        engine.card("monotheism").expect("card").state_argument,
        Some(StateArgument::Name("Philosophy".into()))
    );
    assert_consistent(&engine);

    engine.set_points_target(Some(1000));
    assert_eq!(engine.card_state("metalworking"), Some(CardState::Absent));
    assert_consistent(&engine);
}

#[test]
fn planning_and_buying_through_a_turn() {
    let rules = demo_rules();
    let mut funds = FundsSnapshot::default();
    funds.set_count("salt", 3);
    funds.set_count("ochre", 3);
    funds.set_treasury(20);
    let mut engine = engine_with(&rules, &[], funds);
    assert_eq!(engine.total_funds(), 56);
    assert_eq!(engine.card_state("pottery"), Some(CardState::Unaffordable));
    assert_eq!(engine.card_state("cloth_making"), Some(CardState::Absent));
    assert_eq!(engine.card_state("mysticism"), Some(CardState::Absent));
    assert_consistent(&engine);

    let affected = engine.plan_card("cloth_making");
    assert_eq!(
        affected,
        [
            CardId::from("cloth_making"),
            CardId::from("agriculture"),
            CardId::from("metalworking")
        ]
    );
    assert_eq!(engine.remaining_funds(), 6);
    assert_eq!(engine.card_state("mysticism"), Some(CardState::Unaffordable));
    assert_eq!(engine.current_cost("metalworking"), Some(80));
    assert_consistent(&engine);

    let bought = engine.buy_planned_cards();
    assert_eq!(bought, [CardId::from("cloth_making")]);
    assert_eq!(engine.num_owned_cards(), 1);
    assert_eq!(engine.record().owned, [CardId::from("cloth_making")]);
    assert_eq!(engine.current_cost("metalworking"), Some(80));
    assert_consistent(&engine);

    // Funds are re-entered after paying for the cards.
    let mut funds = rich();
    funds.set_treasury(-10);
    engine.set_funds(funds);
    engine.plan_card("metalworking");
    engine.plan_card("pottery");
    assert_eq!(engine.num_planned_cards(), 2);
    assert_eq!(engine.planned_value(), 150);
    // pottery credits metalworking after it was planned
    assert_eq!(engine.current_cost("metalworking"), Some(70));
    assert_eq!(engine.card_state("mining"), Some(CardState::PrereqFailed));
    assert_consistent(&engine);

    engine.buy_planned_cards();
    assert_eq!(engine.score(), 200);
    assert_eq!(engine.card_state("mining"), Some(CardState::Absent));
    assert_eq!(engine.current_cost("mining"), Some(170));
    assert!(!engine.mining_bonus_available());
    assert_consistent(&engine);

    engine.plan_card("mining");
    engine.buy_planned_cards();
    assert!(engine.mining_bonus_available());
    assert_eq!(engine.owned_groups().get("crafts"), Some(&4));
    assert_consistent(&engine);
}

#[test]
fn reload_after_discard_resynchronises_credit() {
    let rules = demo_rules();
    let mut engine = engine_with(&rules, &["pottery", "metalworking"], rich());
    assert_eq!(engine.current_cost("agriculture"), Some(110));
    assert!(engine.discard("pottery"));
    assert_eq!(engine.score(), 90);
    assert_eq!(engine.current_cost("agriculture"), Some(110));

    engine.reload();
    assert_eq!(engine.current_cost("agriculture"), Some(120));
    assert_consistent(&engine);
}

#[test]
fn exclusive_credits_follow_the_best_planned_target() {
    let raw: RawRules = serde_json::from_str(DEMO_RULES).expect("demo rules parse");
    let options = GameOptions {
        multi_use_credits: Some(false),
        ..GameOptions::default()
    };
    let rules = Arc::new(RuleSet::new(raw, &options).expect("rule set"));
    let mut engine = engine_with(&rules, &["mysticism", "literacy"], rich());
    assert_eq!(engine.current_cost("philosophy"), Some(200));
    assert_eq!(engine.current_cost("law"), Some(135));

    // literacy gives philosophy 20 and law 15; planning law claims 15 of it
    engine.plan_card("law");
    assert_eq!(engine.current_cost("law"), Some(135));
    assert_eq!(engine.current_cost("philosophy"), Some(200 + 15 - 15));
    assert_consistent(&engine);

    engine.plan_card("philosophy");
    // philosophy now wins literacy's credit; law keeps max(0, 15 - 20)
    assert_eq!(engine.current_cost("law"), Some(150));
    assert_consistent(&engine);

    engine.unplan_card("philosophy");
    engine.unplan_card("law");
    assert_eq!(engine.current_cost("law"), Some(135));
    assert_eq!(engine.current_cost("philosophy"), Some(200));
    assert_consistent(&engine);
}
