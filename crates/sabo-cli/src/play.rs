//! # Record and Simulate Subcommands
//!
//! - `record` — submit one result, by winner or by score.
//! - `simulate` — play every remaining playable match until the
//!   tournament stops moving.
//!
//! Whatever the engine wrote is saved even when the call fails part-way:
//! a slot collision still leaves the source match completed, and `audit`
//! needs to see that.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sabo_bracket::{
    AdvanceError, AdvancementEngine, AdvancementOutcome, MatchStore, MemoryMatchStore,
};
use sabo_core::{EntrantId, MatchId, SlotPosition};
use sabo_state::{MatchStatus, Score};

use crate::state::TournamentState;

/// Arguments for `sabo record`.
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Match key, e.g. `A-WB-R1-M3` or `X-CF-R1-M1`.
    pub match_id: MatchId,

    /// The winning entrant.
    #[arg(required_unless_present = "score", conflicts_with = "score")]
    pub winner: Option<EntrantId>,

    /// Final score as `player1-player2`, e.g. `7-3`. The higher side wins.
    #[arg(long)]
    pub score: Option<Score>,
}

/// Arguments for `sabo simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Pick winners at random from this seed. Without it player1 always
    /// wins.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many matches.
    #[arg(long)]
    pub limit: Option<usize>,
}

// ─── Record ─────────────────────────────────────────────────────────

/// Execute `sabo record`.
pub fn run_record(args: &RecordArgs, state_path: &Path) -> Result<u8> {
    let mut state = TournamentState::load(state_path)?;
    let engine = state.engine()?;
    let before = engine.events().len();

    let result = match (&args.winner, args.score) {
        (_, Some(score)) => engine.record_scored_result(&args.match_id, score),
        (Some(winner), None) => engine.record_result(&args.match_id, winner),
        (None, None) => anyhow::bail!("give a winner or --score"),
    };

    let changed = engine.events().len() != before;
    state.absorb(engine);
    if changed {
        state.save(state_path)?;
    }

    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(0)
        }
        Err(AdvanceError::SlotCollision {
            collision,
            partial: Some(partial),
        }) => {
            print_outcome(&partial);
            Err(anyhow::anyhow!(
                "result saved but advancement stopped: {collision} (run `sabo audit`)"
            ))
        }
        Err(e) => Err(e).with_context(|| format!("could not record {}", args.match_id)),
    }
}

fn print_outcome(outcome: &AdvancementOutcome) {
    println!(
        "OK: {} won by {} over {}",
        outcome.completed, outcome.winner, outcome.loser
    );
    for fill in &outcome.placements {
        println!("  {} → {} ({})", fill.entrant, fill.slot, fill.status);
    }
    for stage in &outcome.resolved {
        println!("  {stage} resolved");
    }
    if let Some(champion) = &outcome.champion {
        println!("Champion: {champion}");
    }
}

// ─── Simulate ───────────────────────────────────────────────────────

/// Execute `sabo simulate`.
pub fn run_simulate(args: &SimulateArgs, state_path: &Path) -> Result<u8> {
    let mut state = TournamentState::load(state_path)?;
    let engine = state.engine()?;

    let result = simulate(&engine, args.seed, args.limit.unwrap_or(usize::MAX));
    state.absorb(engine);
    state.save(state_path)?;

    let played = result?;
    println!("OK: played {played} matches");
    if let Some(champion) = state
        .matches
        .iter()
        .find(|m| m.id() == sabo_bracket::topology::CROSS_FINAL)
        .and_then(|m| m.winner())
    {
        println!("Champion: {champion}");
    }
    Ok(0)
}

/// Play `Ready` matches in key order, wave by wave, until none are left
/// or `limit` is reached.
pub fn simulate(
    engine: &AdvancementEngine<MemoryMatchStore>,
    seed: Option<u64>,
    limit: usize,
) -> Result<usize> {
    let mut rng = seed.map(StdRng::seed_from_u64);
    let mut played = 0;
    loop {
        let ready: Vec<_> = engine
            .store()
            .all()
            .into_iter()
            .filter(|m| m.status() == MatchStatus::Ready)
            .collect();
        if ready.is_empty() {
            return Ok(played);
        }
        for m in ready {
            if played >= limit {
                return Ok(played);
            }
            let position = match rng.as_mut().map(|rng| rng.gen_bool(0.5)) {
                Some(true) => SlotPosition::Player2,
                _ => SlotPosition::Player1,
            };
            let Some(winner) = m.player(position).cloned() else {
                continue;
            };
            tracing::debug!(match_id = %m.id(), winner = %winner, "simulated result");
            engine
                .record_result(&m.id(), &winner)
                .with_context(|| format!("simulating {}", m.id()))?;
            played += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabo_bracket::{topology, SeedingPlan};

    fn e(s: &str) -> EntrantId {
        EntrantId::new(s).unwrap()
    }

    fn init(dir: &Path) -> std::path::PathBuf {
        let plan = SeedingPlan::ordered((1..=32).map(|i| e(&format!("p{i:02}"))).collect())
            .unwrap();
        let path = dir.join("t.json");
        TournamentState::create("Club Open", plan)
            .unwrap()
            .save(&path)
            .unwrap();
        path
    }

    fn record(path: &Path, id: &str, winner: Option<&str>, score: Option<&str>) -> Result<u8> {
        let args = RecordArgs {
            match_id: id.parse().unwrap(),
            winner: winner.map(e),
            score: score.map(|s| s.parse().unwrap()),
        };
        run_record(&args, path)
    }

    #[test]
    fn record_by_winner_advances_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path());
        assert_eq!(record(&path, "A-WB-R1-M1", Some("p02"), None).unwrap(), 0);

        let state = TournamentState::load(&path).unwrap();
        let store = state.store().unwrap();
        let wb2: MatchId = "A-WB-R2-M1".parse().unwrap();
        let la1: MatchId = "A-LA-R1-M1".parse().unwrap();
        assert_eq!(store.get(&wb2).unwrap().player1(), Some(&e("p02")));
        assert_eq!(store.get(&la1).unwrap().player1(), Some(&e("p01")));
        state.engine().unwrap().events().verify_chain().unwrap();
    }

    #[test]
    fn record_by_score_picks_the_leader() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path());
        record(&path, "B-WB-R1-M2", None, Some("3-7")).unwrap();

        let store = TournamentState::load(&path).unwrap().store().unwrap();
        let m = store.get(&"B-WB-R1-M2".parse().unwrap()).unwrap();
        assert_eq!(m.winner(), Some(&e("p20")));
        assert_eq!(m.score(), Some(Score::new(3, 7)));
    }

    #[test]
    fn rejected_result_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path());
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(record(&path, "A-WB-R1-M1", Some("p09"), None).is_err());
        assert!(record(&path, "A-WB-R2-M1", Some("p01"), None).is_err());
        assert!(record(&path, "A-WB-R1-M1", None, Some("5-5")).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn collision_is_saved_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path());

        // Squat the winner's destination directly in the file.
        let mut state = TournamentState::load(&path).unwrap();
        let store = state.store().unwrap();
        let squat = "A-WB-R2-M1"
            .parse::<MatchId>()
            .unwrap()
            .slot_ref(SlotPosition::Player1);
        store.try_set_player(&squat, &e("ghost")).unwrap();
        state.matches = store.snapshot();
        state.save(&path).unwrap();

        let err = record(&path, "A-WB-R1-M1", Some("p01"), None).unwrap_err();
        assert!(err.to_string().contains("sabo audit"));

        let store = TournamentState::load(&path).unwrap().store().unwrap();
        let m = store.get(&"A-WB-R1-M1".parse().unwrap()).unwrap();
        assert_eq!(m.status(), MatchStatus::Completed);
        // The loser still reached Losers Branch A.
        let la1 = store.get(&"A-LA-R1-M1".parse().unwrap()).unwrap();
        assert_eq!(la1.player1(), Some(&e("p02")));
    }

    #[test]
    fn simulate_finishes_with_group_a_first_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path());
        let args = SimulateArgs {
            seed: None,
            limit: None,
        };
        assert_eq!(run_simulate(&args, &path).unwrap(), 0);

        let store = TournamentState::load(&path).unwrap().store().unwrap();
        let cf = store.get(&topology::CROSS_FINAL).unwrap();
        assert_eq!(cf.winner(), Some(&e("p01")));
    }

    #[test]
    fn simulate_respects_limit_and_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(dir.path());
        let state = TournamentState::load(&path).unwrap();

        let engine = state.engine().unwrap();
        assert_eq!(simulate(&engine, Some(9), 20).unwrap(), 20);
        let done = engine.store().all().iter().filter(|m| m.is_completed()).count();
        assert_eq!(done, 20);

        let a = state.engine().unwrap();
        let b = state.engine().unwrap();
        assert_eq!(simulate(&a, Some(42), usize::MAX).unwrap(), 55);
        assert_eq!(simulate(&b, Some(42), usize::MAX).unwrap(), 55);
        let winners = |engine: &AdvancementEngine<MemoryMatchStore>| {
            engine
                .store()
                .snapshot()
                .iter()
                .map(|m| m.winner().cloned())
                .collect::<Vec<_>>()
        };
        assert_eq!(winners(&a), winners(&b));
    }
}
