//! Test de bout en bout : fichier brouillé complet, part chiffrée DES,
//! et sérialisation JSON du résultat.

use des::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyInit};
use pretty_assertions::assert_eq;
use xzzpcb_core::ByteWriter;
use xzzpcb_format::{decode, DiagKind, Entity, PartSubBlock, Stage, DES_KEY};

fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    ecb::Encryptor::<des::Des>::new(&DES_KEY.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

const SENTINEL: [u8; 11] = [0x76, 0x36, 0x76, 0x36, 0x35, 0x35, 0x35, 0x76, 0x36, 0x76, 0x36];

/// Payload de part : en-tête + une ligne + un tableau de deux broches.
fn part_plaintext() -> Vec<u8> {
    let mut body = ByteWriter::new();
    // ligne de contour
    body.write_u8(0x05);
    body.write_u32_le(28);
    body.write_u32_le(29);
    body.write_u32_le(0);
    body.write_u32_le(0);
    body.write_u32_le(800);
    body.write_u32_le(0);
    body.write_u32_le(12);
    body.write_u32_le(0);
    // broches
    body.write_u8(0x09);
    body.write_u32_le(74); // 73 octets fixes + nom d'un octet
    for (name, drill, net) in [("1", 0u32, 5u32), ("2", 250, 0)] {
        body.write_u32_le(0);
        body.write_u32_le(100);
        body.write_u32_le(200);
        body.write_u32_le(drill);
        body.write_u32_le(0);
        body.write_u32_le(name.len() as u32);
        body.write_bytes(name.as_bytes());
        body.write_u32_le(40);
        body.write_u32_le(40);
        body.write_u8(1);
        body.write_bytes(&[0; 23]);
        body.write_u32_le(net);
        body.write_bytes(&[0; 13]);
    }

    let mut w = ByteWriter::new();
    // en-tête : part_size = reste d'en-tête + corps
    let header_after_size = 4 + 12 + 2 + 4 + 2; // pad, ancre+rotation, visibilité, taille nom, "U7"
    w.write_u32_le((header_after_size + body.len()) as u32);
    w.write_u32_le(0);
    w.write_u32_le(5000);
    w.write_u32_le(6000);
    w.write_u32_le(0);
    w.write_u8(1);
    w.write_u8(0);
    w.write_u32_le(2);
    w.write_bytes(b"U7");
    w.write_bytes(body.as_slice());
    w.into_vec()
}

/// Fichier clair complet : segment + part chiffrée + bourrage.
fn clear_file() -> Vec<u8> {
    let mut region = ByteWriter::new();
    // segment
    region.write_u8(0x05);
    region.write_u32_le(28);
    region.write_u32_le(1);
    region.write_i32_le(10);
    region.write_i32_le(20);
    region.write_i32_le(30);
    region.write_i32_le(40);
    region.write_i32_le(1000);
    region.write_u32_le(3);
    // mot de bourrage
    region.write_u32_le(0);
    // part chiffrée
    let ciphertext = encrypt(&part_plaintext());
    region.write_u8(0x07);
    region.write_u32_le(ciphertext.len() as u32);
    region.write_bytes(&ciphertext);

    let mut w = ByteWriter::new();
    w.write_bytes(&[0u8; 0x40]);
    w.write_u32_le(region.len() as u32);
    w.write_bytes(region.as_slice());
    w.into_vec()
}

fn check_board(board: &xzzpcb_format::Board) {
    assert!(board.diagnostics.is_empty(), "diags: {:?}", board.diagnostics);
    assert_eq!(board.entities.len(), 2);
    match &board.entities[0] {
        Entity::Segment(s) => assert_eq!((s.x1, s.net_index), (10, 3)),
        other => panic!("entité inattendue: {other:?}"),
    }
    match &board.entities[1] {
        Entity::Part(p) => {
            assert_eq!(p.header.as_ref().unwrap().group_name, "U7");
            assert_eq!(p.sub_blocks.len(), 2);
            match &p.sub_blocks[1] {
                PartSubBlock::Pins(pins) => {
                    assert_eq!(pins.len(), 2);
                    assert!(!pins[0].is_thru_hole);
                    assert!(pins[1].is_thru_hole);
                    assert_eq!(pins[0].net_index, 5);
                }
                other => panic!("sous-bloc inattendu: {other:?}"),
            }
        }
        other => panic!("entité inattendue: {other:?}"),
    }
}

#[test]
fn clear_file_decodes() {
    check_board(&decode(&clear_file()));
}

#[test]
fn obfuscated_file_decodes_identically() {
    let clear = clear_file();
    let key = 0x5A;
    let mut obf: Vec<u8> = clear.iter().map(|b| b ^ key).collect();
    obf.extend_from_slice(&SENTINEL);
    obf.extend_from_slice(&[0xAB; 16]); // queue quelconque après la sentinelle

    let board = decode(&obf);
    check_board(&board);
    assert_eq!(board, decode(&clear));
}

#[test]
fn undecryptable_part_is_recoverable() {
    // ciphertext de longueur non multiple de 8 au milieu du flux :
    // la part reste présente, le segment suivant aussi
    let mut region = ByteWriter::new();
    region.write_u8(0x07);
    region.write_u32_le(5);
    region.write_bytes(&[9, 9, 9, 9, 9]);
    region.write_u8(0x05);
    region.write_u32_le(28);
    region.write_u32_le(2);
    region.write_i32_le(0);
    region.write_i32_le(0);
    region.write_i32_le(1);
    region.write_i32_le(1);
    region.write_i32_le(1);
    region.write_u32_le(0);

    let mut w = ByteWriter::new();
    w.write_bytes(&[0u8; 0x40]);
    w.write_u32_le(region.len() as u32);
    w.write_bytes(region.as_slice());

    let board = decode(w.as_slice());
    assert_eq!(board.entities.len(), 2);
    assert!(matches!(board.entities[0], Entity::Part(_)));
    assert!(matches!(board.entities[1], Entity::Segment(_)));
    assert_eq!(board.diagnostics.len(), 1);
    assert!(matches!(board.diagnostics[0].kind, DiagKind::Decrypt(_)));
}

#[test]
fn progress_stages_are_ordered() {
    let mut events = Vec::new();
    let _ = xzzpcb_format::decode_with_progress(&clear_file(), |p| events.push(p));
    let stages: Vec<Stage> = events.iter().map(|p| p.stage).collect();
    assert_eq!(stages[0], Stage::Init);
    assert_eq!(*stages.last().unwrap(), Stage::Done);
    // les pourcentages ne régressent jamais
    assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
}

#[cfg(feature = "serde")]
#[test]
fn board_serializes_to_json() {
    let board = decode(&clear_file());
    let json = serde_json::to_value(&board).unwrap();
    assert_eq!(json["entities"][0]["Segment"]["net_index"], 3);
    assert_eq!(json["entities"][1]["Part"]["header"]["group_name"], "U7");
}
