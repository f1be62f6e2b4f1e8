//! Débrouillage XOR du fichier entier.
//!
//! Certains fichiers XZZPCB sont intégralement « brouillés » : chaque
//! octet du préfixe est XORé avec un octet-clé stocké (brouillé avec
//! lui-même, donc lisible) à l'offset `0x10`. La fin du préfixe est
//! marquée par une sentinelle de 11 octets stockée en clair ; sans
//! sentinelle, tout le buffer est brouillé. Un fichier en clair porte
//! `0x00` à l'offset `0x10`.

/// Offset de l'octet-clé XOR dans l'en-tête.
pub const XOR_KEY_OFFSET: usize = 0x10;

/// Sentinelle bornant le préfixe brouillé.
pub const XOR_SENTINEL: [u8; 11] =
    [0x76, 0x36, 0x76, 0x36, 0x35, 0x35, 0x35, 0x76, 0x36, 0x76, 0x36];

/// Taille minimale d'un en-tête exploitable.
const MIN_LEN: usize = 0x44;

/// Vrai si le buffer porte la marque de brouillage.
pub fn is_obfuscated(data: &[u8]) -> bool {
    data.len() >= MIN_LEN && data[XOR_KEY_OFFSET] != 0x00
}

/// Position de la première occurrence de la sentinelle.
pub fn sentinel_pos(data: &[u8]) -> Option<usize> {
    data.windows(XOR_SENTINEL.len()).position(|w| w == XOR_SENTINEL)
}

/// Débrouille le buffer en place, au plus une fois.
///
/// Retourne la fin du préfixe traité, ou `None` si le fichier était
/// déjà en clair (octet `0x10` nul) ou trop court. Appliquer deux fois
/// restaurerait l'original ; le garde sur `0x10` l'empêche, puisque
/// l'octet-clé lui-même redevient `0x00` après débrouillage.
pub fn deobfuscate_in_place(data: &mut [u8]) -> Option<usize> {
    if !is_obfuscated(data) {
        return None;
    }
    let key = data[XOR_KEY_OFFSET];
    let end = sentinel_pos(data).unwrap_or(data.len());
    for b in &mut data[..end] {
        *b ^= key;
    }
    Some(end)
}
