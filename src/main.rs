use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use echess::diagnostics::DiagnosticRenderer;
use echess::domain::{PieceKind, parse_square};
use echess::models::WorkerOutput;
use echess::{
    BoardCommand, BoardSession, BoardWorker, GameRules, GameState, Occupancy,
    SessionConfig,
};

#[derive(Parser)]
#[command(name = "echess", version, about = "Occupancy-sensing chess board simulator")]
struct Cli {
    /// TOML session config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a virtual board by hand: take/put pieces square by square
    Simulate {
        /// Start from this position instead of the configured one
        #[arg(long)]
        fen: Option<String>,
    },
    /// Feed recorded sensor readings, one per line, and print events as JSON
    Replay {
        file: PathBuf,
        #[arg(long)]
        fen: Option<String>,
    },
    /// Print the JSON schema of the config file
    Schema,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Command::Simulate { fen } => simulate(&config, fen.as_deref()),
        Command::Replay { file, fen } => replay(&config, &file, fen.as_deref()),
        Command::Schema => {
            let schema = echess::config::config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn new_game(config: &SessionConfig, fen: Option<&str>) -> Result<GameState> {
    let fen = fen.unwrap_or(&config.start_fen);
    GameState::from_fen(fen).with_context(|| format!("starting position {}", fen))
}

fn simulate(config: &SessionConfig, fen: Option<&str>) -> Result<()> {
    let game = new_game(config, fen)?;
    let mut physical = game.expected_occupancy();
    let mut session = BoardSession::new(game, config);
    let renderer = DiagnosticRenderer::new(config.flip_board);

    println!("Chess board simulator");
    println!("---------------------");
    print!("{}", renderer.render_session(&session));

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim().to_lowercase();
        let parts: Vec<&str> = input.split_whitespace().collect();

        let events = match parts.as_slice() {
            [] => continue,
            ["take" | "t", square] | ["put" | "p", square] => {
                let Some(square) = parse_square(square) else {
                    println!("Invalid square notation. Use a1-h8");
                    continue;
                };
                physical = if matches!(parts[0], "take" | "t") {
                    physical.without(square)
                } else {
                    physical.with(square)
                };
                session.observe(physical, Instant::now())
            }
            ["promote", piece] => {
                let piece: PieceKind = match piece.parse() {
                    Ok(piece) => piece,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                match session.supply_promotion_choice(piece) {
                    Ok(events) => events,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                }
            }
            ["confirm" | "c"] => session.confirm(),
            ["reset"] => session.reset(physical),
            ["new"] => {
                let game = new_game(config, None)?;
                physical = game.expected_occupancy();
                session.start_new_game(game, physical)
            }
            ["show" | "s"] => Vec::new(),
            ["quit" | "exit" | "q"] => break,
            _ => {
                println!(
                    "Commands: take <sq>, put <sq>, promote <piece>, confirm, reset, new, show, quit"
                );
                continue;
            }
        };

        for event in events {
            println!("{}", serde_json::to_string(&event)?);
        }
        print!("{}", renderer.render_session(&session));
    }
    Ok(())
}

fn replay(config: &SessionConfig, file: &Path, fen: Option<&str>) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading replay file {}", file.display()))?;
    let mut commands = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if let Some(command) = parse_replay_line(line)
            .with_context(|| format!("{}:{}", file.display(), number + 1))?
        {
            commands.push(command);
        }
    }
    info!(readings = commands.len(), "replaying");

    let game = new_game(config, fen)?;
    let mut worker = BoardWorker::spawn(BoardSession::new(game, config));
    for command in commands {
        if !worker.send(command) {
            bail!("board worker stopped early");
        }
    }
    worker.stop();

    for output in worker.drain() {
        match output {
            WorkerOutput::Event(event) => println!("{}", serde_json::to_string(&event)?),
            WorkerOutput::Snapshot(snapshot) => {
                println!("{}", serde_json::to_string(&snapshot)?);
            }
            WorkerOutput::Error(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

/// One replay line: a bitboard (hex with 0x, or decimal), or one of
/// `reset <bitboard>`, `confirm`, `promote <piece>`, `new [fen]`. Blank
/// lines and `#` comments are skipped.
fn parse_replay_line(line: &str) -> Result<Option<BoardCommand>> {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word {
        "reset" => BoardCommand::Reset {
            bitboard: parse_bitboard(rest)?,
        },
        "confirm" => BoardCommand::Confirm,
        "promote" => BoardCommand::SupplyPromotion {
            piece: rest.parse().map_err(anyhow::Error::msg)?,
        },
        "new" => BoardCommand::StartNewGame {
            fen: (!rest.is_empty()).then(|| rest.to_string()),
        },
        _ => BoardCommand::UpdatePhysical {
            bitboard: parse_bitboard(line)?,
        },
    };
    Ok(Some(command))
}

fn parse_bitboard(text: &str) -> Result<Occupancy> {
    let text = text.trim();
    let bits = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse::<u64>(),
    }
    .with_context(|| format!("invalid bitboard '{}'", text))?;
    Ok(Occupancy::new(bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay_lines() {
        assert!(parse_replay_line("   # comment").unwrap().is_none());
        assert_eq!(
            parse_replay_line("0xFFFF00000000FFFF").unwrap(),
            Some(BoardCommand::UpdatePhysical {
                bitboard: Occupancy::new(0xFFFF_0000_0000_FFFF)
            })
        );
        assert_eq!(
            parse_replay_line("65535 # white only").unwrap(),
            Some(BoardCommand::UpdatePhysical {
                bitboard: Occupancy::new(0xFFFF)
            })
        );
        assert_eq!(
            parse_replay_line("promote n").unwrap(),
            Some(BoardCommand::SupplyPromotion {
                piece: PieceKind::Knight
            })
        );
        assert_eq!(
            parse_replay_line("new").unwrap(),
            Some(BoardCommand::StartNewGame { fen: None })
        );
        assert!(parse_replay_line("0xZZ").is_err());
    }
}
