//! In-memory board model produced by the decoder.
//!
//! Entities keep the wire values untouched (layers, net indices, tenths
//! of milli-degrees); interpreting them is the renderer's job.

use crate::diag::Diagnostic;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;

/// Decoded board: entities in file order plus the diagnostics gathered
/// while decoding. The decoder always returns one, possibly partial.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Board {
    /// Entities, in the order their frames appear in the file.
    pub entities: Vec<Entity>,
    /// Everything that went wrong (recovered locally, never fatal).
    pub diagnostics: Vec<Diagnostic>,
}

/// One top-level frame of the main block region.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Entity {
    /// Free-standing arc on a copper or silkscreen layer.
    Arc(Arc),
    /// Plated hole connecting two copper layers.
    Via(Via),
    /// Straight trace segment.
    Segment(Segment),
    /// Silkscreen text.
    Text(Text),
    /// Component with its decrypted sub-blocks.
    Part(Part),
}

impl Entity {
    /// Short discriminant name, for summaries and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Entity::Arc(_) => "arc",
            Entity::Via(_) => "via",
            Entity::Segment(_) => "segment",
            Entity::Text(_) => "text",
            Entity::Part(_) => "part",
        }
    }

    /// Net reference of the entity, if it carries one. `0` on the wire
    /// means "no net" and maps to `None`.
    pub fn net_index(&self) -> Option<i64> {
        let raw = match self {
            Entity::Arc(a) => i64::from(a.net_index),
            Entity::Via(v) => i64::from(v.net_index),
            Entity::Segment(s) => i64::from(s.net_index),
            Entity::Text(_) | Entity::Part(_) => return None,
        };
        (raw != 0).then_some(raw)
    }
}

/// Arc entity (tag 0x01). Angles are tenths of milli-degrees.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Arc {
    /// Layer index, unchanged from the file.
    pub layer: u32,
    /// Center X.
    pub cx: u32,
    /// Center Y.
    pub cy: u32,
    /// Radius.
    pub r: i32,
    /// Start angle (divide by 10000 for degrees).
    pub angle_start: i32,
    /// End angle (divide by 10000 for degrees).
    pub angle_end: i32,
    /// Stroke scale.
    pub scale: i32,
    /// Net reference, 0 = no net.
    pub net_index: i32,
}

/// Via entity (tag 0x02).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Via {
    /// Center X.
    pub x: i32,
    /// Center Y.
    pub y: i32,
    /// Pad radius.
    pub outer_radius: i32,
    /// Drill radius.
    pub inner_radius: i32,
    /// First connected layer.
    pub layer_a: u32,
    /// Second connected layer.
    pub layer_b: u32,
    /// Net reference, 0 = no net.
    pub net_index: u32,
    /// Attached label, possibly empty.
    pub text: String,
}

/// Trace segment entity (tag 0x05).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Layer index.
    pub layer: u32,
    /// Start X.
    pub x1: i32,
    /// Start Y.
    pub y1: i32,
    /// End X.
    pub x2: i32,
    /// End Y.
    pub y2: i32,
    /// Stroke scale.
    pub scale: i32,
    /// Net reference, 0 = no net.
    pub net_index: u32,
}

/// Silkscreen text entity (tag 0x06). `divider`, `empty` and `one` are
/// passed through from the wire; their meaning is unknown.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Text {
    /// Anchor X.
    pub pos_x: u32,
    /// Anchor Y.
    pub pos_y: u32,
    /// Glyph size.
    pub text_size: u32,
    /// Unknown wire field, passed through.
    pub divider: u32,
    /// Unknown wire field, passed through.
    pub empty: u32,
    /// Unknown wire field, passed through.
    pub one: u16,
    /// Text content (lossy UTF-8).
    pub body: String,
}

/// Part entity (tag 0x07): a component with an encrypted payload.
///
/// When DES decryption fails the part is still emitted: `header` is
/// `None`, `sub_blocks` is empty and `raw` keeps the ciphertext so a
/// caller can retry or inspect it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Part {
    /// Decrypted header, `None` if decryption or header parsing failed.
    pub header: Option<PartHeader>,
    /// Decoded sub-blocks, in payload order.
    pub sub_blocks: Vec<PartSubBlock>,
    /// Raw ciphertext, kept only when decryption failed.
    pub raw: Option<Vec<u8>>,
}

impl Part {
    /// Total number of pins over every pin array of the part.
    pub fn pin_count(&self) -> usize {
        self.sub_blocks
            .iter()
            .map(|sb| match sb {
                PartSubBlock::Pins(pins) => pins.len(),
                _ => 0,
            })
            .sum()
    }
}

/// Header of a decrypted part payload.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartHeader {
    /// Payload length after the size field; bounds the sub-block walk.
    pub part_size: u32,
    /// Part anchor X.
    pub part_x: u32,
    /// Part anchor Y.
    pub part_y: u32,
    /// Rotation (tenths of milli-degrees).
    pub rotation: u32,
    /// Visibility flag. The wire stores it on 2 bytes, only the first
    /// carries data.
    pub visibility: u8,
    /// Group / footprint name.
    pub group_name: String,
}

/// One sub-block inside a decrypted part payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PartSubBlock {
    /// Outline arc (sub-tag 0x01).
    Arc(PartArc),
    /// Outline line (sub-tag 0x05).
    Line(PartLine),
    /// Label (sub-tag 0x06).
    Label(PartLabel),
    /// Pin array (sub-tag 0x09).
    Pins(Vec<Pin>),
}

/// Part outline arc.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartArc {
    /// Layer index.
    pub layer: u32,
    /// Center X.
    pub x: u32,
    /// Center Y.
    pub y: u32,
    /// Radius.
    pub radius: u32,
    /// Start angle.
    pub angle_start: u32,
    /// End angle.
    pub angle_end: u32,
    /// Stroke scale.
    pub scale: u32,
    /// Unknown trailing wire field, passed through.
    pub extra: u32,
}

/// Part outline line.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartLine {
    /// Layer index.
    pub layer: u32,
    /// Start X.
    pub x1: u32,
    /// Start Y.
    pub y1: u32,
    /// End X.
    pub x2: u32,
    /// End Y.
    pub y2: u32,
    /// Stroke scale.
    pub scale: u32,
}

/// Part label (reference designator, value, ...).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartLabel {
    /// Layer index.
    pub layer: u32,
    /// Anchor X.
    pub x: u32,
    /// Anchor Y.
    pub y: u32,
    /// Font size.
    pub font_size: u32,
    /// Font scale.
    pub font_scale: u32,
    /// Font rotation.
    pub font_rotation: u32,
    /// Visibility flag (2 bytes on the wire, 1 stored).
    pub visibility: u8,
    /// Label text (lossy UTF-8; may be GB2312 on the wire).
    pub text: String,
}

/// One pin of a pin array.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pin {
    /// Unknown leading wire field, passed through.
    pub un1: u32,
    /// Pin X.
    pub x: u32,
    /// Pin Y.
    pub y: u32,
    /// Drill diameter; 0 for surface-mount pins.
    pub inner_diameter: u32,
    /// Rotation.
    pub rotation: u32,
    /// Pin name (length-prefixed on the wire).
    pub name: String,
    /// Pad width.
    pub width: u32,
    /// Pad height.
    pub height: u32,
    /// Pad shape code.
    pub shape: u8,
    /// Opaque 23-byte block following `shape`; meaning unknown, kept
    /// verbatim for forward compatibility.
    pub reserved: Vec<u8>,
    /// Net reference, 0 = no net.
    pub net_index: u32,
    /// Derived: `inner_diameter != 0`.
    pub is_thru_hole: bool,
}

/* ─────────────────────────── Stats ─────────────────────────── */

/// Entity counts of a board, for summaries (`xzzpcb inspect`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardStats {
    /// Arc entities.
    pub arcs: usize,
    /// Via entities.
    pub vias: usize,
    /// Segment entities.
    pub segments: usize,
    /// Text entities.
    pub texts: usize,
    /// Part entities.
    pub parts: usize,
    /// Pins over all parts.
    pub pins: usize,
    /// Through-hole pins over all parts.
    pub thru_hole_pins: usize,
    /// Parts whose payload could not be decrypted.
    pub undecrypted_parts: usize,
    /// Diagnostics recorded while decoding.
    pub diagnostics: usize,
}

impl fmt::Display for BoardStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "arcs:        {}", self.arcs)?;
        writeln!(f, "vias:        {}", self.vias)?;
        writeln!(f, "segments:    {}", self.segments)?;
        writeln!(f, "texts:       {}", self.texts)?;
        writeln!(f, "parts:       {} ({} non déchiffrée(s))", self.parts, self.undecrypted_parts)?;
        writeln!(f, "pins:        {} ({} traversante(s))", self.pins, self.thru_hole_pins)?;
        write!(f, "diagnostics: {}", self.diagnostics)
    }
}

impl Board {
    /// Compte les entités par genre (résumé pour l'inspection).
    pub fn stats(&self) -> BoardStats {
        let mut s = BoardStats { diagnostics: self.diagnostics.len(), ..BoardStats::default() };
        for e in &self.entities {
            match e {
                Entity::Arc(_) => s.arcs += 1,
                Entity::Via(_) => s.vias += 1,
                Entity::Segment(_) => s.segments += 1,
                Entity::Text(_) => s.texts += 1,
                Entity::Part(p) => {
                    s.parts += 1;
                    if p.raw.is_some() {
                        s.undecrypted_parts += 1;
                    }
                    for sb in &p.sub_blocks {
                        if let PartSubBlock::Pins(pins) = sb {
                            s.pins += pins.len();
                            s.thru_hole_pins += pins.iter().filter(|p| p.is_thru_hole).count();
                        }
                    }
                }
            }
        }
        s
    }
}
