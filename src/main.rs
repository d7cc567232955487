//! Quiz Duel - command-line driver
//!
//! Validates quiz files and replays scripted duels.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use cli::{Cli, Command};
use quiz_duel::{ManualClock, QuizConfig, ReplayScript, SessionManager};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check { quiz, players } => run_check(&quiz, &players),
        Command::Replay {
            quiz,
            script,
            players,
            json,
        } => run_replay(&quiz, &script, &players, json),
    }
}

/// Load and resolve a quiz, then print a summary
#[instrument(skip(quiz), fields(quiz = %quiz.display()))]
fn run_check(quiz: &Path, players: &[String]) -> Result<()> {
    let settings = QuizConfig::from_file(quiz)?.resolve(players)?;

    println!("Quiz OK");
    println!(
        "  players: {}",
        settings
            .players()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  capture window: {}s, answer window: {}s",
        settings.time_limits().capture().as_secs(),
        settings.time_limits().answer().as_secs()
    );
    for round in settings.rounds() {
        let points: u64 = round.questions().iter().map(|q| u64::from(*q.points())).sum();
        println!(
            "  round {}: {} questions, {} points",
            round.id(),
            round.questions().len(),
            points
        );
    }
    Ok(())
}

/// Run a scripted duel and print its event log and final scores
#[instrument(skip_all, fields(quiz = %quiz.display(), script = %script.display()))]
fn run_replay(quiz: &Path, script: &Path, players: &[String], json: bool) -> Result<()> {
    let settings = QuizConfig::from_file(quiz)?.resolve(players)?;
    let script = ReplayScript::from_file(script)?;

    let start = DateTime::<Utc>::UNIX_EPOCH;
    let clock = Arc::new(ManualClock::new(start));
    let manager = SessionManager::with_clock(clock.clone());
    let session_id = manager.create_session(settings);

    for step in script.timed_actions(start) {
        clock.set(step.at);
        match manager.apply(session_id, step.action.clone()) {
            Ok(outcome) => info!(
                action = %step.action,
                phase = %outcome.state().phase(),
                events = outcome.events().len(),
                "Step applied"
            ),
            Err(e) => warn!(action = %step.action, error = %e, "Step rejected"),
        }
    }

    let state = manager.state(session_id)?;
    let events = manager.events(session_id)?;
    let scores = manager.scores(session_id)?;

    if json {
        let report = serde_json::json!({
            "phase": state.phase(),
            "version": state.version(),
            "events": events,
            "scores": scores,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for record in &events {
            println!(
                "v{:<3} {:<22} {}",
                record.version(),
                record.event().kind(),
                serde_json::to_string(record.event())?
            );
        }
        println!("Final phase: {}", state.phase());
        for (player, score) in &scores {
            println!("  {}: {}", player, score);
        }
    }
    Ok(())
}
