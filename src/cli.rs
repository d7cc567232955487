//! Command-line interface for quiz_duel.

use clap::{Parser, Subcommand};

/// Quiz Duel - buzzer-style quiz sessions
#[derive(Parser, Debug)]
#[command(name = "quiz_duel")]
#[command(about = "Validate quizzes and replay scripted duels", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a quiz file, resolve it and print a summary
    Check {
        /// Path to the quiz TOML file
        quiz: std::path::PathBuf,

        /// Roster overriding the quiz's own (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        players: Vec<String>,
    },

    /// Replay a scripted duel against a manual clock
    Replay {
        /// Path to the quiz TOML file
        quiz: std::path::PathBuf,

        /// Path to the script TOML file
        script: std::path::PathBuf,

        /// Roster overriding the quiz's own (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        players: Vec<String>,

        /// Print the event log and scores as JSON
        #[arg(long)]
        json: bool,
    },
}
