//! xzzpcb-format — Décodeur du conteneur binaire XZZPCB
//!
//! Format (little-endian partout) :
//! ```text
//! [0x00..0x44]  en-tête ; octet 0x10 = clé XOR (0x00 si fichier clair)
//!               u32 @ 0x40 = taille de la région principale
//! [0x44..]      région principale : suite de blocs [tag u8][taille u32][payload]
//!               entrecoupés de mots de bourrage nuls (u32 = 0)
//! ```
//!
//! Tags connus :
//! - 0x01 arc, 0x02 via, 0x05 segment, 0x06 texte sérigraphie
//! - 0x07 part : payload chiffré DES-ECB/PKCS#7 (clé fixe), contenant
//!   un en-tête puis des sous-blocs (arc, ligne, libellé, broches)
//! - 0x03 / 0x09 ignorés (préfixés par leur taille), 0x04 / 0x08 marques nues
//!
//! Un fichier peut être intégralement « brouillé » : XOR octet-à-octet
//! avec la clé stockée à 0x10, jusqu'à la sentinelle
//! `76 36 76 36 35 35 35 76 36 76 36` (fin du préfixe brouillé).
//!
//! API :
//! - [`decode`] / [`decode_with_progress`] : octets → [`Board`]
//! - [`read_file`] : chemin → [`Board`]
//! - le décodeur ne panique jamais et n'échoue jamais : les incidents
//!   sont consignés dans [`Board::diagnostics`]
//!
//! L'entrée est toujours traitée comme hostile : toute lecture est
//! bornée, toute troncature produit un préfixe cohérent du résultat.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod board;
pub mod crypto;
pub mod diag;
pub mod progress;
pub mod xor;

mod decode;
mod part;

pub use board::{
    Arc, Board, BoardStats, Entity, Part, PartArc, PartHeader, PartLabel, PartLine, PartSubBlock,
    Pin, Segment, Text, Via,
};
pub use crypto::{DecryptError, DES_KEY};
pub use decode::{decode, decode_with_progress};
pub use diag::{DiagKind, Diagnostic};
pub use progress::{Progress, Stage};

use std::path::Path;

use xzzpcb_core::{CoreError, CoreResult};

/// Lit et décode un fichier XZZPCB depuis le disque.
///
/// Seules les erreurs d'E/S échouent ; un contenu malformé produit une
/// [`Board`] partielle avec diagnostics, comme [`decode`].
pub fn read_file<P: AsRef<Path>>(path: P) -> CoreResult<Board> {
    let buf = std::fs::read(path).map_err(|e| CoreError::corrupted(format!("io read error: {e}")))?;
    Ok(decode(&buf))
}
