use std::{fmt::Write as _, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use civcalc_core::{
    AppConfig, CardState, GameOptions, RuleCatalog, SituationRecord, SituationStore, StateEngine,
};
use tracing::{info, warn};

pub struct App {
    config: AppConfig,
    catalog: RuleCatalog,
    store: SituationStore,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let catalog = RuleCatalog::new(config.rules_dir.clone());
        let store = SituationStore::new(config.saves_dir.clone());
        Self {
            config,
            catalog,
            store,
        }
    }

    pub fn list_rules(&self, query: &str) -> Result<String> {
        let rules = self.catalog.rules_matching(query)?;
        if rules.is_empty() {
            return Ok(format!(
                "No rules found in {}\n",
                self.catalog.root_path().display()
            ));
        }
        let mut out = String::new();
        for info in rules {
            let limit = info
                .card_limit
                .map(|limit| format!(", limit {limit}"))
                .unwrap_or_default();
            writeln!(
                out,
                "{:<12} {} ({} cards{limit})",
                info.id,
                info.display_name(),
                info.card_count
            )?;
        }
        Ok(out)
    }

    pub fn list_players(&self) -> Result<String> {
        let mut out = String::new();
        for entry in self.store.entries()? {
            let updated = entry
                .updated_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "{:<16} {:<12} {:>3} cards  {updated}",
                entry.player, entry.rules_id, entry.owned_count
            )?;
        }
        if out.is_empty() {
            out.push_str("No saved situations\n");
        }
        Ok(out)
    }

    pub fn new_situation(
        &self,
        player: &str,
        rules: Option<String>,
        target: Option<u32>,
        card_limit: Option<u32>,
        exclusive_credits: bool,
    ) -> Result<String> {
        if self.store.load(player)?.is_some() {
            bail!("{player} already has a situation; remove it first");
        }
        let rules_id = rules
            .or_else(|| self.config.default_rules.clone())
            .ok_or_else(|| anyhow!("no rules given and no default_rules configured"))?;

        let mut record = SituationRecord::new(player, rules_id);
        record.options = GameOptions {
            card_limit,
            multi_use_credits: exclusive_credits.then_some(false),
        };
        record.points_target = target;
        record.language = self.config.language.clone();

        let engine = self.engine_for(record)?;
        info!(player, rules = engine.rules().id(), "New situation");
        self.save(&engine)?;
        Ok(render(&engine))
    }

    pub fn show(&self, player: &str, filter: bool) -> Result<String> {
        let mut engine = self.open(player)?;
        if engine.record().card_filter_active != filter {
            engine.set_card_filter(filter);
            self.save(&engine)?;
        }
        Ok(render(&engine))
    }

    /// Plans `cards` in order. Planned cards are not persisted unless bought.
    pub fn plan(&self, player: &str, cards: &[String], buy: bool) -> Result<String> {
        let mut engine = self.open(player)?;
        for card in cards {
            let state = engine
                .card_state(card)
                .ok_or_else(|| anyhow!("unknown card {card}"))?;
            if !state.is_plannable() {
                bail!("{card} cannot be planned: {state}");
            }
            engine.plan_card(card);
        }
        if engine.remaining_funds() < 0 {
            warn!(remaining = engine.remaining_funds(), "Plan exceeds funds");
        }

        if !buy {
            return Ok(render(&engine));
        }
        let bought = engine.buy_planned_cards();
        self.save(&engine)?;
        let mut out = String::new();
        for id in &bought {
            writeln!(
                out,
                "Bought {}",
                engine
                    .rules()
                    .display_name(id.as_str(), &engine.record().language)
            )?;
        }
        out.push_str(&render(&engine));
        Ok(out)
    }

    pub fn discard(&self, player: &str, card: &str) -> Result<String> {
        let mut engine = self.open(player)?;
        if !engine.discard(card) {
            bail!("{card} is not owned");
        }
        engine.reload();
        self.save(&engine)?;
        Ok(render(&engine))
    }

    pub fn funds(
        &self,
        player: &str,
        treasury: Option<&str>,
        counts: &[String],
        mining_bonus: Option<bool>,
    ) -> Result<String> {
        let mut engine = self.open(player)?;
        let mut funds = engine.record().funds.clone();
        if let Some(input) = treasury {
            funds.set_treasury_input(input);
        }
        for entry in counts {
            let (commodity, count) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("expected commodity=count, got {entry}"))?;
            let commodity = commodity.trim();
            if engine.rules().commodity(commodity).is_none() {
                bail!("unknown commodity {commodity}");
            }
            funds.set_count_input(commodity, count);
        }
        if let Some(enabled) = mining_bonus {
            if enabled && !engine.mining_bonus_available() {
                bail!("the mining bonus needs an owned card granting it");
            }
            funds.use_mining_bonus = enabled;
        }
        engine.set_funds(funds);
        self.save(&engine)?;
        Ok(render(&engine))
    }

    pub fn remove(&self, player: &str) -> Result<String> {
        if self.store.remove(player)? {
            Ok(format!("Removed {player}\n"))
        } else {
            Ok(format!("No situation stored for {player}\n"))
        }
    }

    fn open(&self, player: &str) -> Result<StateEngine> {
        let record = self
            .store
            .load(player)?
            .ok_or_else(|| anyhow!("no situation stored for {player}"))?;
        self.engine_for(record)
    }

    fn engine_for(&self, record: SituationRecord) -> Result<StateEngine> {
        let rules = self
            .catalog
            .load(&record.rules_id, &record.options)
            .with_context(|| format!("failed to load rules {}", record.rules_id))?;
        Ok(StateEngine::new(Arc::new(rules), record))
    }

    fn save(&self, engine: &StateEngine) -> Result<()> {
        let mut record = engine.record().clone();
        self.store.save(&mut record)?;
        Ok(())
    }
}

fn render(engine: &StateEngine) -> String {
    let rules = engine.rules();
    let language = engine.record().language.as_str();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} · {} · {}",
        engine.record().player,
        rules.title(),
        engine.record().rules_id
    );
    let target = engine
        .points_target()
        .map(|target| target.to_string())
        .unwrap_or_else(|| "-".to_string());
    let limit = rules
        .card_limit()
        .map(|limit| limit.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "score {} / {target}  cards {} (+{}) / {limit}  funds {}  remaining {}",
        engine.score(),
        engine.num_owned_cards(),
        engine.num_planned_cards(),
        engine.total_funds(),
        engine.remaining_funds()
    );
    if engine.mining_bonus_available() && engine.max_mining_yield() > 0 {
        let used = if engine.record().funds.use_mining_bonus {
            "counted"
        } else {
            "not counted"
        };
        let _ = writeln!(out, "mining yield {} ({used})", engine.max_mining_yield());
    }
    out.push('\n');

    for card in engine.visible_cards() {
        let nominal = rules.cost_of(card.id.as_str());
        let marker = match card.state {
            CardState::Owned => '*',
            CardState::Planned => '+',
            CardState::Absent => ' ',
            CardState::Discouraged => '!',
            CardState::PrereqFailed | CardState::Unaffordable => '-',
        };
        let cost = if card.state == CardState::Owned {
            String::new()
        } else {
            format!("{:>4}", card.current_cost(nominal))
        };
        let argument = card
            .state_argument
            .as_ref()
            .map(|argument| format!(" ({argument})"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{marker} {:<24} {nominal:>4} {cost:>4}  {}{argument}",
            rules.display_name(card.id.as_str(), language),
            card.state
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DEMO_RULES: &str = include_str!("../../../data/rules/demo.json");

    fn app() -> Result<(TempDir, App)> {
        let dir = TempDir::new()?;
        let rules_dir = dir.path().join("rules");
        fs::create_dir_all(&rules_dir)?;
        fs::write(rules_dir.join("demo.json"), DEMO_RULES)?;
        let config = AppConfig {
            rules_dir,
            saves_dir: dir.path().join("saves"),
            language: "en".to_string(),
            default_rules: Some("demo".to_string()),
        };
        Ok((dir, App::new(config)))
    }

    #[test]
    fn lists_demo_rules() -> Result<()> {
        let (_dir, app) = app()?;
        let out = app.list_rules("")?;
        assert!(out.contains("demo"));
        assert!(out.contains("limit 8"));
        assert!(app.list_rules("nothing-like-this")?.starts_with("No rules"));
        Ok(())
    }

    #[test]
    fn turn_is_persisted_between_commands() -> Result<()> {
        let (_dir, app) = app()?;
        app.new_situation("Ada", None, Some(1000), None, false)?;
        assert!(app.new_situation("Ada", None, None, None, false).is_err());

        app.funds("Ada", Some("20"), &["salt=3".into(), "ochre=3".into()], None)?;
        let out = app.plan("Ada", &["cloth_making".into()], false)?;
        assert!(out.contains("remaining 6"));
        assert_eq!(app.store.load("Ada")?.expect("saved").owned.len(), 0);

        let out = app.plan("Ada", &["cloth_making".into()], true)?;
        assert!(out.starts_with("Bought Cloth Making"));
        let record = app.store.load("Ada")?.expect("saved");
        assert_eq!(record.owned.len(), 1);
        assert_eq!(record.points_target, Some(1000));

        assert!(app.plan("Ada", &["cloth_making".into()], false).is_err());
        assert!(app.funds("Ada", None, &["unobtainium=1".into()], None).is_err());
        assert!(app.funds("Ada", None, &[], Some(true)).is_err());
        assert!(!app.store.load("Ada")?.expect("saved").funds.use_mining_bonus);

        app.discard("Ada", "cloth_making")?;
        assert!(app.store.load("Ada")?.expect("saved").owned.is_empty());
        assert!(app.list_players()?.contains("Ada"));
        Ok(())
    }
}
