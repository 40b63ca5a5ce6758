//! # CLI End-to-End
//!
//! A whole tournament driven through the subcommand handlers against a
//! state file in a temp directory: init from YAML, a few manual results,
//! simulate the rest, then the read views and a clean audit.

use std::path::Path;

use sabo_bracket::topology::CROSS_FINAL;
use sabo_bracket::{MatchStore, Phase, Progress, Standings};
use sabo_cli::init::{run_init, InitArgs};
use sabo_cli::play::{run_record, run_simulate, RecordArgs, SimulateArgs};
use sabo_cli::reconcile::{run_audit, AuditArgs};
use sabo_cli::report::{run_events, run_status, EventsArgs};
use sabo_cli::state::TournamentState;
use sabo_core::EntrantId;

fn e(s: &str) -> EntrantId {
    EntrantId::new(s).unwrap()
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let entrants: Vec<String> = (1..=32).map(|i| format!("p{i:02}")).collect();
    let path = dir.join("club-open.yaml");
    std::fs::write(
        &path,
        format!(
            "name: Club Open\nentrants: [{}]\nseeding:\n  mode: ordered\n",
            entrants.join(", ")
        ),
    )
    .unwrap();
    path
}

// ---------------------------------------------------------------------------
// 1. Init, record, simulate
// ---------------------------------------------------------------------------

#[test]
fn full_tournament_through_the_cli() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join(".sabo").join("tournament.json");

    let init = InitArgs {
        config: write_config(dir.path()),
        force: false,
    };
    assert_eq!(run_init(&init, &state).unwrap(), 0);

    // An upset in Group B round 1, by score.
    let upset = RecordArgs {
        match_id: "B-WB-R1-M1".parse().unwrap(),
        winner: None,
        score: Some("2-7".parse().unwrap()),
    };
    assert_eq!(run_record(&upset, &state).unwrap(), 0);

    let args = SimulateArgs {
        seed: None,
        limit: None,
    };
    assert_eq!(run_simulate(&args, &state).unwrap(), 0);

    let doc = TournamentState::load(&state).unwrap();
    let progress = Progress::from_matches(&doc.matches);
    assert_eq!(progress.phase, Phase::Finished);

    let standings = Standings::from_matches(&doc.matches);
    assert_eq!(standings.champion, Some(e("p01")));
    assert_eq!(standings.runner_up, Some(e("p09")));
    // p18 beat p17 and took over Group B's top line.
    assert!(standings.semifinalists.contains(&e("p18")));

    let store = doc.store().unwrap();
    assert!(store.get(&CROSS_FINAL).unwrap().is_completed());

    assert_eq!(run_status(&state).unwrap(), 0);
    assert_eq!(run_events(&EventsArgs { json: false }, &state).unwrap(), 0);
    assert_eq!(run_audit(&AuditArgs { json: false }, &state).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// 2. Errors leave the state file intact
// ---------------------------------------------------------------------------

#[test]
fn double_submission_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("t.json");
    run_init(
        &InitArgs {
            config: write_config(dir.path()),
            force: false,
        },
        &state,
    )
    .unwrap();

    let args = RecordArgs {
        match_id: "A-WB-R1-M4".parse().unwrap(),
        winner: Some(e("p07")),
        score: None,
    };
    run_record(&args, &state).unwrap();
    let after_first = std::fs::read_to_string(&state).unwrap();

    let err = run_record(&args, &state).unwrap_err();
    assert!(format!("{err:#}").contains("A-WB-R1-M4"));
    assert_eq!(std::fs::read_to_string(&state).unwrap(), after_first);
}
