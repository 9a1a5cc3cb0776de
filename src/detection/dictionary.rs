#![allow(clippy::unreadable_literal)]
//! ArUco fiducial dictionaries.
//!
//! Codes use row-major bit ordering: bit `row * size + col` holds the cell at
//! (row, col) of the data grid, 1 = white. The tables match OpenCV's predefined
//! dictionaries, so markers printed with `cv2.aruco.generateImageMarker` decode
//! to the same identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selectable predefined dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DictionaryKind {
    #[default]
    #[serde(rename = "DICT_4X4_50")]
    Aruco4x4_50,
    #[serde(rename = "DICT_4X4_100")]
    Aruco4x4_100,
}

impl DictionaryKind {
    pub fn dictionary(&self) -> &'static ArucoDictionary {
        match self {
            DictionaryKind::Aruco4x4_50 => &ARUCO_4X4_50,
            DictionaryKind::Aruco4x4_100 => &ARUCO_4X4_100,
        }
    }
}

impl fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dictionary().name)
    }
}

/// A match of observed bits against a dictionary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeMatch {
    pub id: u32,
    /// Clockwise quarter turns applied to the observed grid to reach the stored code
    pub rotation: u8,
    pub hamming: u32,
}

/// Immutable dictionary of marker codes
#[derive(Debug)]
pub struct ArucoDictionary {
    pub name: &'static str,
    /// Data grid side length in cells (border excluded)
    pub marker_size: usize,
    /// Bit errors the family tolerates before identities become ambiguous
    pub max_correction_bits: u32,
    codes: &'static [u16],
    count: usize,
}

impl ArucoDictionary {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn entries(&self) -> &[u16] {
        &self.codes[..self.count]
    }

    pub fn code(&self, id: u32) -> Option<u64> {
        self.entries().get(id as usize).map(|&c| u64::from(c))
    }

    /// Cell values of a marker's data grid, row-major, `true` = white
    pub fn grid(&self, id: u32) -> Option<Vec<bool>> {
        let code = self.code(id)?;
        let cells = self.marker_size * self.marker_size;
        Some((0..cells).map(|i| (code >> i) & 1 == 1).collect())
    }

    /// Find the closest code over all four rotations of `bits`.
    ///
    /// Ties keep the lowest identity, then the smallest rotation.
    pub fn identify(&self, bits: u64, max_hamming: u32) -> Option<CodeMatch> {
        let mut best: Option<CodeMatch> = None;
        let mut rotated = bits;

        for rotation in 0u8..4 {
            for (id, &code) in self.entries().iter().enumerate() {
                let hamming = (rotated ^ u64::from(code)).count_ones();
                if hamming > max_hamming {
                    continue;
                }
                if best.is_none_or(|b| hamming < b.hamming) {
                    best = Some(CodeMatch {
                        id: id as u32,
                        rotation,
                        hamming,
                    });
                }
            }
            rotated = rotate_cw(rotated, self.marker_size);
        }

        best
    }
}

/// Rotate a square bit grid a quarter turn clockwise.
///
/// The new cell (r, c) takes the old cell (size - 1 - c, r).
pub fn rotate_cw(bits: u64, size: usize) -> u64 {
    let mut out = 0u64;
    for r in 0..size {
        for c in 0..size {
            let src = (size - 1 - c) * size + r;
            if (bits >> src) & 1 == 1 {
                out |= 1 << (r * size + c);
            }
        }
    }
    out
}

pub static ARUCO_4X4_50: ArucoDictionary = ArucoDictionary {
    name: "DICT_4X4_50",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &ARUCO_4X4_CODES,
    count: 50,
};

pub static ARUCO_4X4_100: ArucoDictionary = ArucoDictionary {
    name: "DICT_4X4_100",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &ARUCO_4X4_CODES,
    count: 100,
};

/// 4x4 code table; the 50-entry dictionary is a prefix of the 100-entry one
#[rustfmt::skip]
static ARUCO_4X4_CODES: [u16; 100] = [
    0x4cad, 0x59f0, 0xb4cc, 0x6299, 0x792a, 0xb39e, 0x7479, 0x4f23,
    0x5b7f, 0x6af3, 0x899f, 0xe588, 0xed70, 0xf054, 0x8d24, 0x7c64,
    0xa662, 0x0066, 0x7a36, 0xf56e, 0xd161, 0xd40d, 0xab33, 0x41bb,
    0xe27f, 0x8e29, 0x2735, 0x2aa5, 0xc484, 0xf62c, 0xa822, 0x4dea,
    0xf379, 0xd30f, 0x7510, 0x9490, 0xae18, 0xff20, 0x6fb0, 0x5a38,
    0x18e8, 0x1454, 0x314c, 0x4d1c, 0x1724, 0xd774, 0xfcb4, 0x26d2,
    0x740a, 0xc80a, 0x298a, 0x16aa, 0x82ba, 0xe9fa, 0x8016, 0xe616,
    0x2486, 0x9786, 0x48d6, 0xa7f6, 0xfbe6, 0xd87e, 0x0501, 0x22c1,
    0x45d1, 0x5ec9, 0x3621, 0x54a1, 0x39a1, 0x9139, 0x85f9, 0x3edd,
    0x203d, 0xda6d, 0x13fd, 0xd5ed, 0xf853, 0x4693, 0x1a9b, 0xabcb,
    0x1933, 0x05e3, 0xeca3, 0xba97, 0xa49f, 0xdddf, 0x5477, 0xb2ef,
    0xaeac, 0xb551, 0xe86e, 0xf350, 0xd260, 0x83b4, 0x1b92, 0x2fc2,
    0x6cf2, 0xcbf2, 0x2796, 0xe30e,
];
