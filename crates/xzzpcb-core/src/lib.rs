//! xzzpcb-core — primitives partagées (no_std-ready)
//!
//! Fournit :
//! - IO mémoire (little-endian) : `ByteWriter`, `ByteReader` borné
//! - Constantes de couches XZZPCB (`LAYER_SILKSCREEN`, …) + `is_copper()`
//! - Erreurs `CoreError` + alias `CoreResult<T>`
//!
//! Tout le format XZZPCB est little-endian ; le lecteur valide chaque
//! accès (`offset + largeur ≤ len`) et échoue avec
//! `CoreError::UnexpectedEof` plutôt que de paniquer — l'entrée est
//! toujours considérée comme hostile.
//!
//! Features :
//! - `std` (par défaut) : impl `std::error::Error` & tests
//! - `serde` : derive (dé)sérialisation sur les structures utiles

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(feature = "std")]
use std::{borrow::Cow, string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{borrow::Cow, string::String, vec::Vec};

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Couches XZZPCB ─────────────────────────── */

/// Dernier index de couche cuivre (les couches `0..=16` sont du cuivre).
pub const LAYER_COPPER_MAX: u32 = 16;

/// Couche sérigraphie.
pub const LAYER_SILKSCREEN: u32 = 17;

/// Couche contour de carte.
pub const LAYER_OUTLINE: u32 = 28;

/// Couche contours de composants.
pub const LAYER_PART_OUTLINE: u32 = 29;

/// Couche broches.
pub const LAYER_PINS: u32 = 32;

/// Vrai si `layer` désigne une couche cuivre.
pub const fn is_copper(layer: u32) -> bool { layer <= LAYER_COPPER_MAX }

/* ─────────────────────────── Byte Writer (LE) ─────────────────────────── */

/// Buffer d'écriture (croît automatiquement).
///
/// Sert surtout à fabriquer des flux XZZPCB synthétiques (fixtures de
/// tests, outillage) ; le décodeur lui-même ne s'en sert pas.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Crée un writer vide.
    pub fn new() -> Self { Self { buf: Vec::new() } }
    /// Accès en lecture au contenu.
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Longueur courante.
    pub fn len(&self) -> usize { self.buf.len() }
    /// Vrai si rien n'a été écrit.
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    /// Récupère le buffer (consomme).
    pub fn into_vec(self) -> Vec<u8> { self.buf }
    /// Ajoute des octets bruts.
    pub fn write_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }
    /// Écrit un octet.
    pub fn write_u8(&mut self, v: u8) { self.buf.push(v); }
    /// Écrit un u16 little-endian.
    pub fn write_u16_le(&mut self, v: u16) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un u32 little-endian.
    pub fn write_u32_le(&mut self, v: u32) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un i32 little-endian.
    pub fn write_i32_le(&mut self, v: i32) { self.buf.extend_from_slice(&v.to_le_bytes()); }
}

/* ─────────────────────────── Byte Reader (LE) ─────────────────────────── */

/// Lecteur séquentiel borné sur un slice d'octets (helpers LE).
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Construit un lecteur.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }

    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }

    /// Taille du slice sous-jacent.
    pub fn len(&self) -> usize { self.data.len() }

    /// Vrai si le slice sous-jacent est vide.
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Taille restante.
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }

    /// Positionne le curseur à un offset absolu (≤ len).
    pub fn seek(&mut self, pos: usize) -> CoreResult<()> {
        if pos > self.data.len() {
            return Err(CoreError::UnexpectedEof {
                needed: (pos - self.data.len()) as u64,
                at: self.off as u64,
            });
        }
        self.off = pos;
        Ok(())
    }

    /// Avance de `n` octets sans les retourner.
    pub fn skip(&mut self, n: usize) -> CoreResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Lit `n` octets (ou erreur si EOF).
    pub fn read_bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::UnexpectedEof { needed: n as u64, at: self.off as u64 });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.data[start..self.off])
    }

    /// Lit un octet.
    pub fn read_u8(&mut self) -> CoreResult<u8> {
        let b = self.read_bytes(1)?;
        Ok(b[0])
    }

    /// Lit un u16 LE.
    pub fn read_u16_le(&mut self) -> CoreResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Lit un u32 LE.
    pub fn read_u32_le(&mut self) -> CoreResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Lit un i32 LE.
    pub fn read_i32_le(&mut self) -> CoreResult<i32> { Ok(self.read_u32_le()? as i32) }

    /// Regarde le u32 LE sous le curseur sans avancer (None si < 4 octets).
    pub fn peek_u32_le(&self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let b = &self.data[self.off..self.off + 4];
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Lit `n` octets comme chaîne UTF-8, avec remplacement U+FFFD.
    ///
    /// Les libellés XZZPCB peuvent contenir du GB2312 ; on ne refuse
    /// jamais une chaîne, les séquences invalides deviennent `�`.
    pub fn read_str_lossy(&mut self, n: usize) -> CoreResult<String> {
        if n == 0 {
            return Ok(String::new());
        }
        let b = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(b).into_owned())
    }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de bas niveau communes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoreError {
    /// Fin de buffer inattendue.
    UnexpectedEof { /// Nombre d'octets demandés.
        needed: u64, /// Offset où l'erreur s'est produite.
        at: u64
    },
    /// Données corrompues (format).
    Corrupted(Cow<'static, str>),
}

impl CoreError {
    /// Construit une erreur « corrompu ».
    pub fn corrupted(msg: impl Into<Cow<'static, str>>) -> Self { CoreError::Corrupted(msg.into()) }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnexpectedEof { needed, at } => {
                write!(f, "unexpected EOF: need {needed} bytes at {at}")
            }
            CoreError::Corrupted(msg) => write!(f, "corrupted: {msg}"),
        }
    }
}

/// Implémente `std::error::Error` uniquement avec la feature `std`.
#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        is_copper, ByteReader, ByteWriter, CoreError, CoreResult, LAYER_COPPER_MAX,
        LAYER_OUTLINE, LAYER_PART_OUTLINE, LAYER_PINS, LAYER_SILKSCREEN,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
