//! Embedded built-in dictionaries.
//!
//! Code tables are checked in as constants: row-major inner bits, black = 1,
//! one `u64` per marker id.

use crate::Dictionary;

/// ArUco 4x4_50 code table (50 entries).
#[rustfmt::skip]
const ARUCO_4X4_50_CODES: [u64; 50] = [
    0x4cad, 0x59f0, 0xb4cc, 0x6299,
    0x792a, 0xb39e, 0x7479, 0x4f23,
    0x5b7f, 0x6af3, 0x899f, 0xe588,
    0xed70, 0xf054, 0x8d24, 0x7c64,
    0xa662, 0x0066, 0x7a36, 0xf56e,
    0xd161, 0xd40d, 0xab33, 0x41bb,
    0xe27f, 0x8e29, 0x2735, 0x2aa5,
    0xc484, 0xf62c, 0xa822, 0x4dea,
    0xf379, 0xd30f, 0x7510, 0x9490,
    0xae18, 0xff20, 0x6fb0, 0x5a38,
    0x18e8, 0x1454, 0x314c, 0x4d1c,
    0x1724, 0xd774, 0xfcb4, 0x26d2,
    0x740a, 0xc80a,
];

/// AprilTag 16h5 code table (30 entries).
#[rustfmt::skip]
const APRILTAG_16H5_CODES: [u64; 30] = [
    0xe960, 0x91ce, 0x1d29, 0x707c,
    0x2d9e, 0xbd7b, 0xe721, 0xb3d1,
    0xd773, 0x34e9, 0x0d62, 0x0f7c,
    0x3086, 0xf898, 0x5a0b, 0xf302,
    0x60aa, 0xe68c, 0x3b40, 0x98f4,
    0x6bd8, 0xf4d4, 0xbe13, 0x54e2,
    0x63b7, 0xa5fc, 0x7be3, 0x7618,
    0xb825, 0xbbaa,
];

pub const ARUCO_4X4_50: Dictionary = Dictionary {
    name: "ARUCO_4X4_50",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &ARUCO_4X4_50_CODES,
};

pub const APRILTAG_16H5: Dictionary = Dictionary {
    name: "APRILTAG_16H5",
    marker_size: 4,
    max_correction_bits: 2,
    codes: &APRILTAG_16H5_CODES,
};

/// Look up a built-in dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    match name {
        "ARUCO_4X4_50" => Some(ARUCO_4X4_50),
        "APRILTAG_16H5" => Some(APRILTAG_16H5),
        _ => None,
    }
}

/// Candidate dictionaries in default search order.
pub fn default_search_order() -> Vec<&'static str> {
    vec!["ARUCO_4X4_50", "APRILTAG_16H5"]
}
