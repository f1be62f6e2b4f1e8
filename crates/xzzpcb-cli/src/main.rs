//! `xzzpcb` — CLI du décodeur XZZPCB
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation
//! (logger, couleur), et délégation à `xzzpcb_cli` (lib).

#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use xzzpcb_cli as cli;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "xzzpcb", version, about = "XZZPCB CLI — décoder, inspecter, débrouiller", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Sous-commandes
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Décoder un fichier XZZPCB et émettre la carte en JSON
    Dump {
        /// Fichier d'entrée (ou - pour stdin)
        input: Option<PathBuf>,
        /// Fichier de sortie (stdout si omis)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON indenté
        #[arg(long)]
        pretty: bool,
    },

    /// Décoder un fichier et afficher un résumé (entités, couches, incidents)
    Inspect {
        /// Fichier d'entrée (ou - pour stdin)
        input: Option<PathBuf>,
    },

    /// Écrire une copie débrouillée (préfixe XOR retiré) d'un fichier
    Xor {
        /// Fichier d'entrée
        input: PathBuf,
        /// Fichier de sortie
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn input_from_opt(p: Option<PathBuf>) -> cli::Input {
    match p {
        Some(path) if path.as_os_str() == "-" => cli::Input::Stdin,
        Some(path) => cli::Input::Path(path),
        None => cli::Input::Stdin,
    }
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool) {
    #[cfg(feature = "trace")]
    {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        std::env::set_var(
            "RUST_LOG",
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
        );
        cli::init_logger();
    }
    #[cfg(not(feature = "trace"))]
    {
        let _ = (verbose, quiet);
    }
}

fn init_color(choice: ColorChoice) {
    // `owo-colors` détecte le TTY tout seul ; on ne force que sur demande.
    match choice {
        ColorChoice::Auto => {}
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        }
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        }
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> Result<()> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    let command = match opt.cmd {
        Command::Dump { input, output, pretty } => cli::Command::Dump(cli::DumpTask {
            input: input_from_opt(input),
            output: match output {
                Some(p) => cli::Output::Path(p),
                None => cli::Output::Stdout,
            },
            pretty,
        }),
        Command::Inspect { input } => {
            cli::Command::Inspect(cli::InspectTask { input: input_from_opt(input) })
        }
        Command::Xor { input, output } => cli::Command::Xor(cli::XorTask { input, output }),
    };

    let code = cli::execute(command).context("échec d'exécution de la commande")?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
