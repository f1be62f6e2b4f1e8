//! Décodage du payload déchiffré d'une part.
//!
//! Le plaintext d'un bloc DATA commence par un en-tête (taille, ancre,
//! rotation, visibilité, nom de groupe) puis enchaîne des sous-blocs
//! tagués : arcs (0x01), lignes (0x05), libellés (0x06) et tableaux de
//! broches (0x09). La vue est bornée à `part_size + 4` octets ; tout
//! dépassement n'interrompt que la part courante.

use xzzpcb_core::{ByteReader, CoreResult};

use crate::board::{Part, PartArc, PartHeader, PartLabel, PartLine, PartSubBlock, Pin};
use crate::diag::{push_overrun, DiagKind, Diagnostic};

const SUB_TAG_ARC: u8 = 0x01;
const SUB_TAG_LINE: u8 = 0x05;
const SUB_TAG_LABEL: u8 = 0x06;
const SUB_TAG_PINS: u8 = 0x09;

/// Octets consommés après `shape` et gardés tels quels sur chaque broche.
const PIN_RESERVED_LEN: usize = 23;

/// Octets ignorés en queue de chaque broche, après `net_index`.
const PIN_TRAILER_LEN: usize = 13;

/// Décode le plaintext d'un bloc DATA en une [`Part`].
///
/// Ne retourne jamais d'erreur : les incidents sont consignés dans
/// `diags` (offsets relatifs au plaintext) et la part rendue est
/// partielle. Un plaintext vide donne une part vide.
pub(crate) fn decode_part(plain: &[u8], diags: &mut Vec<Diagnostic>) -> Part {
    if plain.is_empty() {
        return Part::default();
    }

    let mut r = ByteReader::new(plain);
    let header = match read_header(&mut r) {
        Ok(h) => h,
        Err(err) => {
            push_overrun(diags, err);
            return Part::default();
        }
    };

    // vue bornée par l'en-tête ; un part_size menteur est rabattu sur
    // la taille réelle du plaintext
    let view_len = (header.part_size as usize).saturating_add(4).min(plain.len());

    let mut sub_blocks = Vec::new();
    while r.offset() < view_len {
        let tag_at = r.offset();
        let tag = match r.read_u8() {
            Ok(t) => t,
            Err(err) => {
                push_overrun(diags, err);
                break;
            }
        };
        let parsed = match tag {
            SUB_TAG_ARC => read_arc(&mut r).map(PartSubBlock::Arc),
            SUB_TAG_LINE => read_line(&mut r).map(PartSubBlock::Line),
            SUB_TAG_LABEL => read_label(&mut r).map(PartSubBlock::Label),
            SUB_TAG_PINS => {
                let (pins, err) = read_pin_array(&mut r, view_len);
                sub_blocks.push(PartSubBlock::Pins(pins));
                match err {
                    None => continue,
                    Some(e) => {
                        push_overrun(diags, e);
                        break;
                    }
                }
            }
            other => {
                log::warn!("sous-tag de part inconnu 0x{other:02X} à l'offset {tag_at}");
                diags.push(Diagnostic {
                    at: tag_at as u64,
                    kind: DiagKind::UnknownSubTag { tag: other },
                });
                break;
            }
        };
        match parsed {
            Ok(sb) => sub_blocks.push(sb),
            Err(err) => {
                push_overrun(diags, err);
                break;
            }
        }
    }

    Part { header: Some(header), sub_blocks, raw: None }
}

/// En-tête de part. Le champ visibilité occupe 2 octets de flux pour 1
/// octet utile ; cet alignement fait partie du format.
fn read_header(r: &mut ByteReader<'_>) -> CoreResult<PartHeader> {
    let part_size = r.read_u32_le()?;
    r.skip(4)?;
    let part_x = r.read_u32_le()?;
    let part_y = r.read_u32_le()?;
    let rotation = r.read_u32_le()?;
    let visibility = r.read_u8()?;
    r.skip(1)?;
    let group_name_size = r.read_u32_le()? as usize;
    let group_name = r.read_str_lossy(group_name_size)?;
    Ok(PartHeader { part_size, part_x, part_y, rotation, visibility, group_name })
}

fn read_arc(r: &mut ByteReader<'_>) -> CoreResult<PartArc> {
    let _block_size = r.read_u32_le()?;
    let layer = r.read_u32_le()?;
    let x = r.read_u32_le()?;
    let y = r.read_u32_le()?;
    let radius = r.read_u32_le()?;
    let angle_start = r.read_u32_le()?;
    let angle_end = r.read_u32_le()?;
    let scale = r.read_u32_le()?;
    let extra = r.read_u32_le()?;
    Ok(PartArc { layer, x, y, radius, angle_start, angle_end, scale, extra })
}

fn read_line(r: &mut ByteReader<'_>) -> CoreResult<PartLine> {
    let _block_size = r.read_u32_le()?;
    let layer = r.read_u32_le()?;
    let x1 = r.read_u32_le()?;
    let y1 = r.read_u32_le()?;
    let x2 = r.read_u32_le()?;
    let y2 = r.read_u32_le()?;
    let scale = r.read_u32_le()?;
    r.skip(4)?;
    Ok(PartLine { layer, x1, y1, x2, y2, scale })
}

fn read_label(r: &mut ByteReader<'_>) -> CoreResult<PartLabel> {
    let _block_size = r.read_u32_le()?;
    let layer = r.read_u32_le()?;
    let x = r.read_u32_le()?;
    let y = r.read_u32_le()?;
    let font_size = r.read_u32_le()?;
    let font_scale = r.read_u32_le()?;
    let font_rotation = r.read_u32_le()?;
    let visibility = r.read_u8()?;
    r.skip(1)?;
    let label_size = r.read_u32_le()? as usize;
    let text = r.read_str_lossy(label_size)?;
    Ok(PartLabel { layer, x, y, font_size, font_scale, font_rotation, visibility, text })
}

/// Tableau de broches. La taille lue après le tag est celle d'UN
/// enregistrement ; on enchaîne tant qu'un enregistrement complet tient
/// dans la vue. Les broches déjà décodées survivent à un dépassement.
fn read_pin_array(r: &mut ByteReader<'_>, view_len: usize) -> (Vec<Pin>, Option<xzzpcb_core::CoreError>) {
    let pin_block_size = match r.read_u32_le() {
        Ok(v) => v as usize,
        Err(err) => return (Vec::new(), Some(err)),
    };
    let mut pins = Vec::new();
    while r.offset().saturating_add(pin_block_size) <= view_len {
        match read_pin(r) {
            Ok(p) => pins.push(p),
            Err(err) => return (pins, Some(err)),
        }
    }
    (pins, None)
}

fn read_pin(r: &mut ByteReader<'_>) -> CoreResult<Pin> {
    let un1 = r.read_u32_le()?;
    let x = r.read_u32_le()?;
    let y = r.read_u32_le()?;
    let inner_diameter = r.read_u32_le()?;
    let rotation = r.read_u32_le()?;
    let name_size = r.read_u32_le()? as usize;
    let name = r.read_str_lossy(name_size)?;
    let width = r.read_u32_le()?;
    let height = r.read_u32_le()?;
    let shape = r.read_u8()?;
    let reserved = r.read_bytes(PIN_RESERVED_LEN)?.to_vec();
    let net_index = r.read_u32_le()?;
    r.skip(PIN_TRAILER_LEN)?;
    Ok(Pin {
        un1,
        x,
        y,
        inner_diameter,
        rotation,
        name,
        width,
        height,
        shape,
        reserved,
        net_index,
        is_thru_hole: inner_diameter != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xzzpcb_core::ByteWriter;

    /// En-tête de part complet ; `part_size` borne les sous-blocs.
    fn write_header(w: &mut ByteWriter, part_size: u32, group_name: &str) {
        w.write_u32_le(part_size);
        w.write_u32_le(0); // padding
        w.write_u32_le(1000);
        w.write_u32_le(2000);
        w.write_u32_le(900_000);
        w.write_u8(1); // visibilité
        w.write_u8(0); // padding d'alignement
        w.write_u32_le(group_name.len() as u32);
        w.write_bytes(group_name.as_bytes());
    }

    fn write_pin(w: &mut ByteWriter, name: &str, inner_diameter: u32, net: u32) {
        w.write_u32_le(0xAA); // un1
        w.write_u32_le(10);
        w.write_u32_le(20);
        w.write_u32_le(inner_diameter);
        w.write_u32_le(0);
        w.write_u32_le(name.len() as u32);
        w.write_bytes(name.as_bytes());
        w.write_u32_le(30); // width
        w.write_u32_le(40); // height
        w.write_u8(2); // shape
        w.write_bytes(&[0xEE; 23]);
        w.write_u32_le(net);
        w.write_bytes(&[0; 13]);
    }

    /// Taille d'un enregistrement de broche pour un nom donné.
    fn pin_record_len(name: &str) -> u32 {
        (73 + name.len()) as u32
    }

    #[test]
    fn empty_plaintext_is_empty_part() {
        let mut diags = Vec::new();
        let part = decode_part(&[], &mut diags);
        assert_eq!(part, Part::default());
        assert!(diags.is_empty());
    }

    #[test]
    fn header_only_part() {
        let mut w = ByteWriter::new();
        write_header(&mut w, 0, "U1");
        let mut diags = Vec::new();
        let part = decode_part(w.as_slice(), &mut diags);
        let header = part.header.unwrap();
        assert_eq!(header.part_x, 1000);
        assert_eq!(header.group_name, "U1");
        assert_eq!(header.visibility, 1);
        assert!(part.sub_blocks.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn line_label_and_pins() {
        let mut body = ByteWriter::new();
        // ligne de contour
        body.write_u8(SUB_TAG_LINE);
        body.write_u32_le(28);
        body.write_u32_le(29); // couche contours de composants
        body.write_u32_le(0);
        body.write_u32_le(0);
        body.write_u32_le(500);
        body.write_u32_le(0);
        body.write_u32_le(10);
        body.write_u32_le(0); // padding de queue
        // libellé
        body.write_u8(SUB_TAG_LABEL);
        body.write_u32_le(0);
        body.write_u32_le(17);
        body.write_u32_le(5);
        body.write_u32_le(6);
        body.write_u32_le(120);
        body.write_u32_le(100);
        body.write_u32_le(0);
        body.write_u8(1);
        body.write_u8(0);
        body.write_u32_le(3);
        body.write_bytes(b"C12");
        // deux broches
        body.write_u8(SUB_TAG_PINS);
        body.write_u32_le(pin_record_len("1"));
        write_pin(&mut body, "1", 0, 4);
        write_pin(&mut body, "2", 300, 0);

        let mut w = ByteWriter::new();
        // part_size couvre l'en-tête après son champ taille + le corps
        let mut probe = ByteWriter::new();
        write_header(&mut probe, 0, "R7");
        let header_after_size = probe.len() - 4;
        write_header(&mut w, (header_after_size + body.len()) as u32, "R7");
        w.write_bytes(body.as_slice());

        let mut diags = Vec::new();
        let part = decode_part(w.as_slice(), &mut diags);
        assert!(diags.is_empty(), "diags: {diags:?}");
        assert_eq!(part.sub_blocks.len(), 3);
        match &part.sub_blocks[0] {
            PartSubBlock::Line(l) => {
                assert_eq!(l.layer, 29);
                assert_eq!(l.x2, 500);
            }
            other => panic!("sous-bloc inattendu: {other:?}"),
        }
        match &part.sub_blocks[1] {
            PartSubBlock::Label(l) => {
                assert_eq!(l.text, "C12");
                assert_eq!(l.font_size, 120);
            }
            other => panic!("sous-bloc inattendu: {other:?}"),
        }
        match &part.sub_blocks[2] {
            PartSubBlock::Pins(pins) => {
                assert_eq!(pins.len(), 2);
                assert_eq!(pins[0].name, "1");
                assert!(!pins[0].is_thru_hole);
                assert_eq!(pins[0].net_index, 4);
                assert_eq!(pins[0].reserved, vec![0xEE; 23]);
                assert_eq!(pins[1].name, "2");
                assert!(pins[1].is_thru_hole);
            }
            other => panic!("sous-bloc inattendu: {other:?}"),
        }
    }

    #[test]
    fn pin_name_length_matches_size_field() {
        // P5 : la chaîne émise a exactement name_size octets
        let mut body = ByteWriter::new();
        body.write_u8(SUB_TAG_PINS);
        body.write_u32_le(pin_record_len("GND_PAD"));
        write_pin(&mut body, "GND_PAD", 0, 2);

        let mut probe = ByteWriter::new();
        write_header(&mut probe, 0, "");
        let header_after_size = probe.len() - 4;

        let mut w = ByteWriter::new();
        write_header(&mut w, (header_after_size + body.len()) as u32, "");
        w.write_bytes(body.as_slice());

        let mut diags = Vec::new();
        let part = decode_part(w.as_slice(), &mut diags);
        match &part.sub_blocks[0] {
            PartSubBlock::Pins(pins) => assert_eq!(pins[0].name.len(), 7),
            other => panic!("sous-bloc inattendu: {other:?}"),
        }
    }

    #[test]
    fn unknown_sub_tag_stops_the_walk() {
        let mut body = ByteWriter::new();
        body.write_u8(0x42);
        body.write_bytes(&[0; 16]);

        let mut probe = ByteWriter::new();
        write_header(&mut probe, 0, "");
        let header_after_size = probe.len() - 4;

        let mut w = ByteWriter::new();
        write_header(&mut w, (header_after_size + body.len()) as u32, "");
        w.write_bytes(body.as_slice());

        let mut diags = Vec::new();
        let part = decode_part(w.as_slice(), &mut diags);
        assert!(part.sub_blocks.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::UnknownSubTag { tag: 0x42 });
    }

    #[test]
    fn truncated_sub_block_keeps_earlier_ones() {
        let mut body = ByteWriter::new();
        body.write_u8(SUB_TAG_LINE);
        body.write_u32_le(28);
        body.write_u32_le(29);
        body.write_u32_le(0);
        body.write_u32_le(0);
        body.write_u32_le(500);
        body.write_u32_le(0);
        body.write_u32_le(10);
        body.write_u32_le(0);
        // arc tronqué : tag + taille, puis plus rien — mais part_size
        // prétend qu'il reste de quoi lire
        body.write_u8(SUB_TAG_ARC);
        body.write_u32_le(32);
        body.write_u32_le(29);

        let mut probe = ByteWriter::new();
        write_header(&mut probe, 0, "");
        let header_after_size = probe.len() - 4;

        let mut w = ByteWriter::new();
        write_header(&mut w, (header_after_size + body.len() + 64) as u32, "");
        w.write_bytes(body.as_slice());

        let mut diags = Vec::new();
        let part = decode_part(w.as_slice(), &mut diags);
        assert_eq!(part.sub_blocks.len(), 1);
        assert!(matches!(part.sub_blocks[0], PartSubBlock::Line(_)));
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, DiagKind::Overrun { .. }));
    }

    #[test]
    fn lying_part_size_is_clamped() {
        // part_size très au-delà du plaintext : la vue est rabattue,
        // pas de panique, pas de lecture hors bornes
        let mut w = ByteWriter::new();
        write_header(&mut w, 0xFFFF_FF00, "X");
        let mut diags = Vec::new();
        let part = decode_part(w.as_slice(), &mut diags);
        assert!(part.header.is_some());
        assert!(part.sub_blocks.is_empty());
    }
}
