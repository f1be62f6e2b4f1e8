//! Déchiffrement DES des payloads de parts.
//!
//! Les blocs DATA (tag 0x07) sont chiffrés en DES-ECB avec une clé fixe
//! embarquée dans le logiciel d'origine, padding PKCS#7. Un échec n'est
//! jamais fatal : l'appelant conserve le ciphertext et continue.

use des::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyInit};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

type DesEcbDec = ecb::Decryptor<des::Des>;

/// Clé DES fixe des payloads de parts (`DC FC 12 AC 00 00 00 00`).
pub const DES_KEY: [u8; 8] = [0xDC, 0xFC, 0x12, 0xAC, 0x00, 0x00, 0x00, 0x00];

/// Échec de déchiffrement d'un payload de part.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecryptError {
    /// La longueur du ciphertext n'est pas un multiple de 8.
    #[error("longueur de ciphertext invalide: {len} (multiple de 8 attendu)")]
    BadLength { /// Longueur fautive.
        len: usize
    },
    /// Le padding PKCS#7 du dernier bloc est invalide.
    #[error("padding PKCS#7 invalide")]
    BadPadding,
}

/// Déchiffre un payload de part (DES-ECB, clé fixe, PKCS#7 retiré).
///
/// Un ciphertext vide produit un plaintext vide sans passer par DES.
pub fn decrypt(ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }
    if ciphertext.len() % 8 != 0 {
        return Err(DecryptError::BadLength { len: ciphertext.len() });
    }
    DesEcbDec::new(&DES_KEY.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| DecryptError::BadPadding)
}

/// Chiffre un payload comme l'outil d'origine (fixtures de tests).
#[cfg(test)]
pub(crate) fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    use des::cipher::BlockEncryptMut;
    ecb::Encryptor::<des::Des>::new(&DES_KEY.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use des::cipher::BlockEncrypt;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrip() {
        let plain = b"part payload \xD6\xD0 with bytes".to_vec();
        let ct = encrypt(&plain);
        assert_eq!(ct.len() % 8, 0);
        assert_eq!(decrypt(&ct).unwrap(), plain);
    }

    #[test]
    fn empty_ciphertext_is_empty_plaintext() {
        assert_eq!(decrypt(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn length_not_multiple_of_eight() {
        let err = decrypt(&[0u8; 7]).unwrap_err();
        assert_eq!(err, DecryptError::BadLength { len: 7 });
    }

    #[test]
    fn bad_padding_is_reported() {
        // chiffre un bloc brut (sans padding) finissant par 0x00 :
        // 0x00 n'est jamais un octet de padding PKCS#7 valide
        let cipher = des::Des::new(&DES_KEY.into());
        let mut block = [1u8, 2, 3, 4, 5, 6, 7, 0].into();
        cipher.encrypt_block(&mut block);
        let err = decrypt(block.as_slice()).unwrap_err();
        assert_eq!(err, DecryptError::BadPadding);
    }
}
