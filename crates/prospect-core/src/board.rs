// The scouting board: roster + league config + annotation store, with a
// cached entity list that any edit invalidates.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::aggregate::{aggregate, PlayerEntity};
use crate::annotations::{apply_command, Annotation, AnnotationCommand, AnnotationStore};
use crate::league::{map_league_config, LeagueConfig};
use crate::roster::{map_players, RawPlayerRecord};
use crate::source::Row;

pub struct ScoutingBoard<S> {
    records: Vec<RawPlayerRecord>,
    league: LeagueConfig,
    store: S,
    cache: Option<Vec<PlayerEntity>>,
}

impl<S: AnnotationStore> ScoutingBoard<S> {
    pub fn new(records: Vec<RawPlayerRecord>, league: LeagueConfig, store: S) -> Self {
        Self {
            records,
            league,
            store,
            cache: None,
        }
    }

    /// Build from decoded Players-tab and Config-tab rows.
    pub fn from_rows(player_rows: &[Row], config_rows: &[Row], store: S) -> Self {
        let records = map_players(player_rows);
        let league = map_league_config(config_rows);
        info!(
            "board loaded: {} players, {} league factors, season length {}",
            records.len(),
            league.factors.len(),
            league.season_length
        );
        Self::new(records, league, store)
    }

    /// Swap in freshly fetched source data.
    pub fn refresh_source(&mut self, records: Vec<RawPlayerRecord>, league: LeagueConfig) {
        self.records = records;
        self.league = league;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            debug!("entity cache invalidated");
        }
    }

    /// True when the source produced no player rows at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn league(&self) -> &LeagueConfig {
        &self.league
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The aggregated board, recomputed if the cache is stale.
    pub fn players(&mut self) -> Result<&[PlayerEntity]> {
        if self.cache.is_none() {
            let snapshot = self.store.snapshot()?;
            self.cache = Some(aggregate(&self.records, &self.league, &snapshot));
        }
        Ok(self.cache.as_deref().unwrap_or_default())
    }

    pub fn player(&mut self, name: &str) -> Result<Option<&PlayerEntity>> {
        Ok(self.players()?.iter().find(|e| e.record.name == name))
    }

    /// Apply a scout edit to `name` and invalidate the cached board.
    pub fn execute(
        &mut self,
        name: &str,
        command: &AnnotationCommand,
        now: DateTime<Utc>,
    ) -> Result<Annotation> {
        if !self.records.iter().any(|r| r.name == name) {
            bail!("no player named '{name}' on the board");
        }
        let annotation = apply_command(&self.store, name, command, now)?;
        self.invalidate();
        Ok(annotation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::MemoryStore;
    use crate::overrides::LiveStats;
    use chrono::TimeZone;

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn player_rows() -> Vec<Row> {
        rows(&[
            &["Tier", "AvgRank", "InTierRank", "V1Rank", "JohnRank", "Name", "Country", "League", "GP", "G", "A", "P", "PPG"],
            &["1", "1.0", "1", "1", "1", "P1", "CAN", "NCAA", "38", "32", "32", "64", "1.68"],
            &["2", "7.2", "3", "6", "8", "P2", "CAN", "OHL", "66", "33", "63", "96", "1.45"],
        ])
    }

    fn config_rows() -> Vec<Row> {
        rows(&[
            &["SeasonLengthNHL", "82"],
            &["League", "NHLeFactor"],
            &["NCAA", "0.41"],
            &["OHL", "0.30"],
        ])
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn from_rows_scores_population() {
        let mut board = ScoutingBoard::from_rows(&player_rows(), &config_rows(), MemoryStore::new());
        let players = board.players().unwrap();
        assert_eq!(players.len(), 2);
        assert!((players[0].metrics.composite_score - 93.7).abs() < 1e-9);
        assert!((players[1].metrics.composite_score - 36.2).abs() < 1e-9);
    }

    #[test]
    fn execute_invalidates_and_recomputes() {
        let mut board = ScoutingBoard::from_rows(&player_rows(), &config_rows(), MemoryStore::new());
        let before = board.player("P1").unwrap().unwrap().metrics.stats_score;
        assert!((before - 100.0).abs() < 1e-9);

        board
            .execute(
                "P2",
                &AnnotationCommand::SaveStats(LiveStats { gp: 10, g: 20, a: 20, p: 40 }),
                now(),
            )
            .unwrap();

        let p1 = board.player("P1").unwrap().unwrap().metrics.stats_score;
        assert!((p1 - 57.4).abs() < 1e-9);
        assert!(board.player("P2").unwrap().unwrap().has_live_stats);

        board.execute("P2", &AnnotationCommand::ClearStats, now()).unwrap();
        let p1 = board.player("P1").unwrap().unwrap().metrics.stats_score;
        assert!((p1 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn execute_rejects_unknown_player() {
        let mut board = ScoutingBoard::from_rows(&player_rows(), &config_rows(), MemoryStore::new());
        let err = board
            .execute("Nobody", &AnnotationCommand::ToggleWatch, now())
            .unwrap_err();
        assert!(err.to_string().contains("Nobody"));
        assert!(board.store().snapshot().unwrap().is_empty());
    }

    #[test]
    fn tags_show_up_after_execute() {
        let mut board = ScoutingBoard::from_rows(&player_rows(), &config_rows(), MemoryStore::new());
        board.players().unwrap();
        board.execute("P1", &AnnotationCommand::AddTag("Elite".into()), now()).unwrap();
        assert_eq!(board.player("P1").unwrap().unwrap().tags, vec!["Elite"]);
    }

    #[test]
    fn refresh_source_replaces_roster() {
        let mut board = ScoutingBoard::from_rows(&player_rows(), &config_rows(), MemoryStore::new());
        assert_eq!(board.players().unwrap().len(), 2);
        board.refresh_source(Vec::new(), LeagueConfig::default());
        assert!(board.is_empty());
        assert!(board.players().unwrap().is_empty());
    }
}
