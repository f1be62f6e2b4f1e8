//! Diagnostics de décodage.
//!
//! Politique d'erreur du décodeur : tout est **récupéré localement**.
//! Un dépassement interrompt seulement le niveau d'imbrication courant,
//! un tag inconnu arrête le walker courant, un échec DES laisse la part
//! vide — et chaque incident est consigné ici plutôt que propagé.

use core::fmt;

use xzzpcb_core::CoreError;

use crate::crypto::DecryptError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Un incident consigné pendant le décodage.
///
/// `at` est l'offset dans le flux où l'incident a eu lieu : absolu dans
/// le fichier pour les blocs externes, relatif au payload déchiffré
/// pour l'intérieur d'une part.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// Offset de l'incident.
    pub at: u64,
    /// Nature de l'incident.
    pub kind: DiagKind,
}

/// Nature d'un incident de décodage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiagKind {
    /// Lecture au-delà de la fin du buffer.
    Overrun { /// Nombre d'octets demandés.
        needed: u64
    },
    /// Tag de bloc externe hors de l'ensemble connu.
    UnknownTag { /// Octet de tag rencontré.
        tag: u8
    },
    /// Sous-tag inconnu dans le payload d'une part.
    UnknownSubTag { /// Octet de tag rencontré.
        tag: u8
    },
    /// Échec du déchiffrement DES d'une part.
    Decrypt(DecryptError),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagKind::Overrun { needed } => {
                write!(f, "dépassement à l'offset {}: {needed} octet(s) demandé(s)", self.at)
            }
            DiagKind::UnknownTag { tag } => {
                write!(f, "tag de bloc inconnu 0x{tag:02X} à l'offset {}", self.at)
            }
            DiagKind::UnknownSubTag { tag } => {
                write!(f, "sous-tag de part inconnu 0x{tag:02X} à l'offset {}", self.at)
            }
            DiagKind::Decrypt(err) => {
                write!(f, "déchiffrement impossible à l'offset {}: {err}", self.at)
            }
        }
    }
}

/// Consigne un dépassement à partir d'une `CoreError` de lecture.
///
/// Seul `UnexpectedEof` peut sortir des lectures du décodeur ; les
/// autres variantes ne produisent pas de diagnostic.
pub(crate) fn push_overrun(diags: &mut Vec<Diagnostic>, err: CoreError) {
    if let CoreError::UnexpectedEof { needed, at } = err {
        diags.push(Diagnostic { at, kind: DiagKind::Overrun { needed } });
    }
}
