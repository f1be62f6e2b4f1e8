//! Parcours de la région principale et parseurs de blocs externes.
//!
//! Après débrouillage, le u32 LE à l'offset `0x40` donne la taille de
//! la région principale qui commence à `0x44`. La région est une suite
//! de blocs `[tag u8][taille u32][payload]`, entrecoupée de mots de
//! bourrage nuls. Un tag inconnu arrête le parcours : sans cadre connu,
//! le reste de la région n'est pas récupérable.

use xzzpcb_core::{ByteReader, CoreResult};

use crate::board::{Arc, Board, Entity, Part, Segment, Text, Via};
use crate::crypto;
use crate::diag::{push_overrun, DiagKind, Diagnostic};
use crate::part::decode_part;
use crate::progress::{Progress, Stage, BLOCK_INTERVAL};
use crate::xor;

/// Offset du u32 donnant la taille de la région principale.
pub(crate) const MAIN_SIZE_OFFSET: usize = 0x40;

/// Début de la région principale.
pub(crate) const MAIN_START: usize = 0x44;

const TAG_ARC: u8 = 0x01;
const TAG_VIA: u8 = 0x02;
const TAG_SKIP_03: u8 = 0x03;
const TAG_MARK_04: u8 = 0x04;
const TAG_SEGMENT: u8 = 0x05;
const TAG_TEXT: u8 = 0x06;
const TAG_DATA: u8 = 0x07;
const TAG_MARK_08: u8 = 0x08;
const TAG_SKIP_09: u8 = 0x09;

/// Décode un fichier XZZPCB complet.
///
/// Ne panique jamais et retourne toujours une [`Board`], éventuellement
/// partielle ; voir [`Board::diagnostics`] pour les incidents.
pub fn decode(bytes: &[u8]) -> Board {
    decode_with_progress(bytes, |_| {})
}

/// Variante de [`decode`] avec rapport de progression.
///
/// Le callback reçoit les bornes d'étapes et un point tous les
/// [`BLOCK_INTERVAL`] blocs ; il n'influence jamais le décodage.
pub fn decode_with_progress<F: FnMut(Progress)>(bytes: &[u8], mut progress: F) -> Board {
    progress(Progress { percent: 0, stage: Stage::Init });

    // copie mutable : la passe XOR travaille en place
    let mut buf = bytes.to_vec();
    if let Some(end) = xor::deobfuscate_in_place(&mut buf) {
        log::debug!("préfixe brouillé de {end} octets débrouillé");
    }
    progress(Progress { percent: 5, stage: Stage::Deobfuscate });

    let mut board = Board::default();
    let mut r = ByteReader::new(&buf);

    let main_size = match read_main_size(&mut r) {
        Ok(size) => size,
        Err(err) => {
            push_overrun(&mut board.diagnostics, err);
            progress(Progress { percent: 100, stage: Stage::Done });
            return board;
        }
    };
    progress(Progress { percent: 10, stage: Stage::Header });

    walk(&mut r, main_size, &mut board, &mut progress);

    progress(Progress { percent: 100, stage: Stage::Done });
    board
}

fn read_main_size(r: &mut ByteReader<'_>) -> CoreResult<u32> {
    r.seek(MAIN_SIZE_OFFSET)?;
    let size = r.read_u32_le()?;
    Ok(size)
}

/// Boucle principale sur les blocs tagués.
fn walk<F: FnMut(Progress)>(
    r: &mut ByteReader<'_>,
    main_size: u32,
    board: &mut Board,
    progress: &mut F,
) {
    let end = MAIN_START.saturating_add(main_size as usize).min(r.len());
    let region = end.saturating_sub(MAIN_START);
    let mut blocks = 0usize;

    while r.offset() < end {
        // mots de bourrage nuls entre blocs
        if r.peek_u32_le() == Some(0) {
            let _ = r.skip(4);
            continue;
        }

        let tag_at = r.offset();
        let tag = match r.read_u8() {
            Ok(t) => t,
            Err(err) => {
                push_overrun(&mut board.diagnostics, err);
                break;
            }
        };

        let parsed = match tag {
            TAG_ARC => read_arc(r).map(|a| Some(Entity::Arc(a))),
            TAG_VIA => read_via(r).map(|v| Some(Entity::Via(v))),
            TAG_SEGMENT => read_segment(r).map(|s| Some(Entity::Segment(s))),
            TAG_TEXT => read_text(r).map(|t| Some(Entity::Text(t))),
            TAG_DATA => read_data(r, &mut board.diagnostics).map(|p| Some(Entity::Part(p))),
            TAG_SKIP_03 | TAG_SKIP_09 => skip_block(r).map(|()| None),
            TAG_MARK_04 | TAG_MARK_08 => Ok(None),
            other => {
                log::warn!("tag de bloc inconnu 0x{other:02X} à l'offset {tag_at}, arrêt du parcours");
                board
                    .diagnostics
                    .push(Diagnostic { at: tag_at as u64, kind: DiagKind::UnknownTag { tag: other } });
                break;
            }
        };

        match parsed {
            Ok(Some(entity)) => board.entities.push(entity),
            Ok(None) => {}
            Err(err) => {
                push_overrun(&mut board.diagnostics, err);
                break;
            }
        }

        blocks += 1;
        if blocks % BLOCK_INTERVAL == 0 && region > 0 {
            let done = r.offset().saturating_sub(MAIN_START);
            let percent = 10 + (done * 85 / region) as u8;
            progress(Progress { percent, stage: Stage::Walk });
        }
    }
}

/// Bloc à ignorer : `[taille u32][taille octets]`. Une taille nulle ne
/// consomme que le champ taille.
fn skip_block(r: &mut ByteReader<'_>) -> CoreResult<()> {
    let size = r.read_u32_le()? as usize;
    r.skip(size)
}

/// Replace le curseur à la frontière du bloc. Les octets de queue que
/// le parseur n'a pas consommés sont couverts par `block_size`.
fn seek_block_end(r: &mut ByteReader<'_>, payload_start: usize, block_size: usize) -> CoreResult<()> {
    r.seek(payload_start + block_size)
}

fn read_arc(r: &mut ByteReader<'_>) -> CoreResult<Arc> {
    let block_size = r.read_u32_le()? as usize;
    let start = r.offset();
    let layer = r.read_u32_le()?;
    let cx = r.read_u32_le()?;
    let cy = r.read_u32_le()?;
    let radius = r.read_i32_le()?;
    let angle_start = r.read_i32_le()?;
    let angle_end = r.read_i32_le()?;
    let scale = r.read_i32_le()?;
    let net_index = r.read_i32_le()?;
    seek_block_end(r, start, block_size)?;
    Ok(Arc { layer, cx, cy, r: radius, angle_start, angle_end, scale, net_index })
}

fn read_via(r: &mut ByteReader<'_>) -> CoreResult<Via> {
    let block_size = r.read_u32_le()? as usize;
    let start = r.offset();
    let x = r.read_i32_le()?;
    let y = r.read_i32_le()?;
    let outer_radius = r.read_i32_le()?;
    let inner_radius = r.read_i32_le()?;
    let layer_a = r.read_u32_le()?;
    let layer_b = r.read_u32_le()?;
    let net_index = r.read_u32_le()?;
    let text_len = r.read_u32_le()? as usize;
    let text = r.read_str_lossy(text_len)?;
    seek_block_end(r, start, block_size)?;
    Ok(Via { x, y, outer_radius, inner_radius, layer_a, layer_b, net_index, text })
}

fn read_segment(r: &mut ByteReader<'_>) -> CoreResult<Segment> {
    let block_size = r.read_u32_le()? as usize;
    let start = r.offset();
    let layer = r.read_u32_le()?;
    let x1 = r.read_i32_le()?;
    let y1 = r.read_i32_le()?;
    let x2 = r.read_i32_le()?;
    let y2 = r.read_i32_le()?;
    let scale = r.read_i32_le()?;
    let net_index = r.read_u32_le()?;
    seek_block_end(r, start, block_size)?;
    Ok(Segment { layer, x1, y1, x2, y2, scale, net_index })
}

fn read_text(r: &mut ByteReader<'_>) -> CoreResult<Text> {
    let block_size = r.read_u32_le()? as usize;
    let start = r.offset();
    let _unknown1 = r.read_u32_le()?;
    let pos_x = r.read_u32_le()?;
    let pos_y = r.read_u32_le()?;
    let text_size = r.read_u32_le()?;
    let divider = r.read_u32_le()?;
    let empty = r.read_u32_le()?;
    let one = r.read_u16_le()?;
    let text_len = r.read_u32_le()? as usize;
    let body = r.read_str_lossy(text_len)?;
    seek_block_end(r, start, block_size)?;
    Ok(Text { pos_x, pos_y, text_size, divider, empty, one, body })
}

/// Bloc DATA : ciphertext DES d'une part. L'échec de déchiffrement est
/// consigné et la part émise quand même, ciphertext conservé.
fn read_data(r: &mut ByteReader<'_>, diags: &mut Vec<Diagnostic>) -> CoreResult<Part> {
    let block_size = r.read_u32_le()? as usize;
    let cipher_at = r.offset() as u64;
    let ciphertext = r.read_bytes(block_size)?;

    match crypto::decrypt(ciphertext) {
        Ok(plain) => Ok(decode_part(&plain, diags)),
        Err(err) => {
            log::warn!("part à l'offset {cipher_at}: {err}");
            diags.push(Diagnostic { at: cipher_at, kind: DiagKind::Decrypt(err) });
            Ok(Part { header: None, sub_blocks: Vec::new(), raw: Some(ciphertext.to_vec()) })
        }
    }
}
