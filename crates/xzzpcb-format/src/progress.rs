//! Rapport de progression coopératif.
//!
//! Le décodeur est strictement synchrone ; la progression est son seul
//! effet observable. Le callback est invoqué aux bornes d'étapes et
//! tous les [`BLOCK_INTERVAL`] blocs pendant le parcours de la région
//! principale. Le décodeur n'exploite jamais sa valeur de retour.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Étape courante du décodage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stage {
    /// Préparation du buffer.
    Init,
    /// Débrouillage XOR.
    Deobfuscate,
    /// Lecture de l'en-tête (taille de la région principale).
    Header,
    /// Parcours des blocs de la région principale.
    Walk,
    /// Terminé.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "initialisation",
            Stage::Deobfuscate => "débrouillage",
            Stage::Header => "en-tête",
            Stage::Walk => "parcours",
            Stage::Done => "terminé",
        };
        f.write_str(s)
    }
}

/// Un point de progression transmis au callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Progress {
    /// Avancement estimé, `0..=100`.
    pub percent: u8,
    /// Étape en cours.
    pub stage: Stage,
}

/// Nombre de blocs entre deux rapports pendant le parcours.
pub const BLOCK_INTERVAL: usize = 100;
