//! Built-in characteristic curves.
//!
//! Generic part-load shapes for components that enable a characteristic
//! without supplying measured breakpoints. Both are normalized: `x` is the
//! flow ratio against the design point and `y` scales the design value.

use tc_core::CharLine;

/// Generic isentropic-efficiency derate for pumps, compressors and
/// turbines. Peaks at the design flow and falls off on both sides.
pub fn generic_eta_s_char() -> CharLine {
    CharLine::from_points(&[
        (0.5, 0.85),
        (0.75, 0.95),
        (1.0, 1.0),
        (1.25, 0.97),
        (1.5, 0.9),
    ])
    .expect("preset breakpoints are valid")
}

/// Generic heat-transfer scaling, `kA/kA_design ~ (m/m_design)^0.8`,
/// tabulated from a quarter to one-and-a-half times the design flow.
pub fn generic_ka_char() -> CharLine {
    CharLine::from_points(&[
        (0.25, 0.3299),
        (0.5, 0.5743),
        (0.75, 0.7944),
        (1.0, 1.0),
        (1.25, 1.1954),
        (1.5, 1.3832),
    ])
    .expect("preset breakpoints are valid")
}
