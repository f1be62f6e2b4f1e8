//! xzzpcb-cli — bibliothèque interne du binaire `xzzpcb`
//!
//! But : fournir une API propre et testable pour le CLI sans mélanger
//! la logique d'E/S et le parsing d'arguments (laissé à `main.rs`).
//!
//! Points clés :
//! - `dump` : fichier XZZPCB → JSON (stdout ou fichier, écriture atomique)
//! - `inspect` : résumé des entités, couches et diagnostics
//! - `xor` : copie débrouillée d'un fichier
//! - Traces (`feature = "trace"`) et couleurs (`feature = "color"`) optionnelles

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use xzzpcb_core::{is_copper, LAYER_OUTLINE, LAYER_PART_OUTLINE, LAYER_PINS, LAYER_SILKSCREEN};
use xzzpcb_format::{decode_with_progress, Board, Entity, Progress};

#[cfg(feature = "color")]
use owo_colors::OwoColorize;

/* ───────────────────────────── Types publics ───────────────────────────── */

/// Représente une commande haut-niveau (sans parsing CLI — réservé à main.rs).
#[derive(Clone, Debug)]
pub enum Command {
    /// Décoder un fichier et émettre la carte en JSON.
    Dump(DumpTask),
    /// Décoder un fichier et afficher un résumé.
    Inspect(InspectTask),
    /// Écrire une copie débrouillée (XOR retiré) d'un fichier.
    Xor(XorTask),
}

#[derive(Clone, Debug, Default)]
pub struct DumpTask {
    pub input: Input,   // chemin ou stdin
    pub output: Output, // chemin ou stdout
    pub pretty: bool,   // JSON indenté
}

#[derive(Clone, Debug, Default)]
pub struct InspectTask {
    pub input: Input,
}

#[derive(Clone, Debug)]
pub struct XorTask {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Entrée binaire : fichier ou `-` (=stdin).
#[derive(Clone, Debug)]
pub enum Input {
    Path(PathBuf),
    Stdin,
}
impl Default for Input {
    fn default() -> Self {
        Self::Stdin
    }
}

/// Sortie générique.
#[derive(Clone, Debug)]
pub enum Output {
    Path(PathBuf),
    Stdout,
}
impl Default for Output {
    fn default() -> Self {
        Self::Stdout
    }
}

/* ───────────────────────────── Initialisation ───────────────────────────── */

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp_secs()
            .try_init();
    }
}

/* ───────────────────────────── Exécution ───────────────────────────── */

/// Exécute une commande. Retourne un code de sortie.
pub fn execute(cmd: Command) -> Result<i32> {
    match cmd {
        Command::Dump(t) => {
            dump_entry(t)?;
            Ok(0)
        }
        Command::Inspect(t) => {
            inspect_entry(t)?;
            Ok(0)
        }
        Command::Xor(t) => {
            xor_entry(t)?;
            Ok(0)
        }
    }
}

fn decode_input(input: &Input) -> Result<Board> {
    let bytes = read_bytes(input).context("lecture de l'entrée")?;
    let board = decode_with_progress(&bytes, |p: Progress| {
        log::debug!("{}: {}%", p.stage, p.percent);
    });
    for diag in &board.diagnostics {
        log::warn!("{diag}");
    }
    Ok(board)
}

fn dump_entry(task: DumpTask) -> Result<()> {
    let board = decode_input(&task.input)?;
    let json = if task.pretty {
        serde_json::to_string_pretty(&board)
    } else {
        serde_json::to_string(&board)
    }
    .context("sérialisation JSON de la carte")?;

    match task.output {
        Output::Stdout => {
            let mut w = io::BufWriter::new(io::stdout().lock());
            w.write_all(json.as_bytes())?;
            w.write_all(b"\n")?;
            w.flush()?;
        }
        Output::Path(ref p) => {
            write_bytes_atomic(p, json.as_bytes())
                .with_context(|| format!("écriture de {}", display(p)))?;
            status_ok("DUMP", &display(p));
        }
    }
    Ok(())
}

fn inspect_entry(task: InspectTask) -> Result<()> {
    let board = decode_input(&task.input)?;
    let mut out = io::BufWriter::new(io::stdout().lock());
    write!(out, "{}", render_summary(&board))?;
    out.flush()?;
    Ok(())
}

fn xor_entry(task: XorTask) -> Result<()> {
    let mut bytes =
        fs::read(&task.input).with_context(|| format!("lecture de {}", display(&task.input)))?;
    match xzzpcb_format::xor::deobfuscate_in_place(&mut bytes) {
        Some(end) => status_ok("XOR", &format!("préfixe de {end} octets débrouillé")),
        None => status_info("XOR", "fichier déjà en clair, copie telle quelle"),
    }
    write_bytes_atomic(&task.output, &bytes)
        .with_context(|| format!("écriture de {}", display(&task.output)))?;
    status_ok("XOR", &display(&task.output));
    Ok(())
}

/* ───────────────────────────── Résumé ───────────────────────────── */

/// Résumé texte d'une carte : compteurs, couches, diagnostics.
pub fn render_summary(board: &Board) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{}", board.stats());

    let mut layers: BTreeMap<u32, usize> = BTreeMap::new();
    for e in &board.entities {
        match e {
            Entity::Arc(a) => *layers.entry(a.layer).or_default() += 1,
            Entity::Segment(seg) => *layers.entry(seg.layer).or_default() += 1,
            Entity::Via(_) | Entity::Text(_) | Entity::Part(_) => {}
        }
    }
    if !layers.is_empty() {
        let _ = writeln!(s, "couches (arcs + segments):");
        for (layer, count) in &layers {
            let _ = writeln!(s, "  {:>3} ({}): {count}", layer, layer_label(*layer));
        }
    }
    if !board.diagnostics.is_empty() {
        let _ = writeln!(s, "incidents:");
        for d in &board.diagnostics {
            let _ = writeln!(s, "  {d}");
        }
    }
    s
}

fn layer_label(layer: u32) -> &'static str {
    match layer {
        l if is_copper(l) => "cuivre",
        LAYER_SILKSCREEN => "sérigraphie",
        LAYER_OUTLINE => "contour",
        LAYER_PART_OUTLINE => "contours composants",
        LAYER_PINS => "broches",
        _ => "inconnue",
    }
}

/* ───────────────────────────── E/S ───────────────────────────── */

fn read_bytes(input: &Input) -> Result<Vec<u8>> {
    match input {
        Input::Path(p) => {
            fs::read(p).with_context(|| format!("lecture de {}", display(p)))
        }
        Input::Stdin => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("lecture de stdin")?;
            Ok(buf)
        }
    }
}

/// Écriture atomique : fichier temporaire voisin puis `rename`.
fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("chemin de sortie sans nom de fichier"))?;
    let tmp = path.with_file_name(format!(".{}.tmp", name.to_string_lossy()));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/* ───────────────────────────── Statuts ───────────────────────────── */

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    eprintln!("{} {msg}", tag.green().bold());
    #[cfg(not(feature = "color"))]
    eprintln!("{tag} {msg}");
}

fn status_info(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    eprintln!("{} {msg}", tag.cyan());
    #[cfg(not(feature = "color"))]
    eprintln!("{tag} {msg}");
}

/* ───────────────────────────── Tests ───────────────────────────── */
