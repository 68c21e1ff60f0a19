//! Chain-code compression for `poly2d` payloads.
//!
//! A polyline is rasterized into unit moves on the 8-connected pixel grid.
//! Each move is coded relative to the previous move's direction, so long
//! straight runs become runs of `0` which are then shortened with two run
//! symbols. The codes are packed two per character into a base64 string.
//!
//! Relative codes:
//!
//! | code | meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | straight on                               |
//! | 1, 2 | turn 45° clockwise / counter-clockwise    |
//! | 3, 4 | turn 90° clockwise / counter-clockwise    |
//! | 5    | reverse direction without moving          |
//! | 6, 7 | short / long run of straight moves        |
//!
//! The first move is coded relative to "down". `MODE_POLY2D_SRF6DCC` stores
//! `[x0, y0, pad, code]` with fixed run lengths of 3 and 15;
//! `MODE_POLY2D_RS6FCC` stores `[x0, y0, short_run, long_run, pad, code]`.
//! Coordinates are rounded to whole pixels.

use crate::data::Poly2dMode;
use crate::error::{OpenLabelError, Result};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const REVERSE: u8 = 5;
const SHORT_RUN_SYMBOL: u8 = 6;
const LONG_RUN_SYMBOL: u8 = 7;

/// Straight moves replaced by one short-run symbol.
pub const SHORT_RUN: u32 = 3;
/// Straight moves replaced by one long-run symbol.
pub const LONG_RUN: u32 = 15;

/// Index of "down" in [`STEPS`].
const START_DIRECTION: usize = 2;

/// Unit moves clockwise from +x, with y growing downwards.
const STEPS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Clockwise turn (in 45° steps) for codes 0..=4.
const TURNS: [usize; 5] = [0, 1, 7, 2, 6];

fn direction_of(step: (i64, i64)) -> usize {
    STEPS.iter().position(|s| *s == step).unwrap_or(START_DIRECTION)
}

fn pixel(x: f64, what: &str) -> Result<i64> {
    if !x.is_finite() {
        return Err(OpenLabelError::shape(format!("{what} contains a non-finite number")));
    }
    Ok(x.round() as i64)
}

/// Run lengths of a chain-coded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Runs {
    short: u32,
    long: u32,
}

impl Default for Runs {
    fn default() -> Self {
        Self {
            short: SHORT_RUN,
            long: LONG_RUN,
        }
    }
}

// ── Encoding ───────────────────────────────────────────────────

/// Encode flat `[x0, y0, x1, y1, ...]` coordinates in a chain-code mode.
///
/// Fails for [`Poly2dMode::Absolute`], for an odd coordinate count and for
/// an empty polyline.
pub fn encode(points: &[f64], mode: Poly2dMode) -> Result<Vec<String>> {
    if mode == Poly2dMode::Absolute {
        return Err(OpenLabelError::shape(
            "absolute poly2d coordinates are stored as they are",
        ));
    }
    if points.len() % 2 != 0 {
        return Err(OpenLabelError::shape(format!(
            "poly2d needs an even number of coordinates, got {}",
            points.len()
        )));
    }
    if points.is_empty() {
        return Err(OpenLabelError::shape(
            "a chain-coded poly2d needs at least one point",
        ));
    }

    let pixels = points
        .chunks_exact(2)
        .map(|p| Ok((pixel(p[0], "poly2d")?, pixel(p[1], "poly2d")?)))
        .collect::<Result<Vec<_>>>()?;

    let runs = Runs::default();
    let codes = compress(&relative_moves(&pixels), runs);
    let (packed, pad) = pack(&codes);

    let (x0, y0) = pixels[0];
    let mut val = vec![x0.to_string(), y0.to_string()];
    if mode == Poly2dMode::Rs6fcc {
        val.push(runs.short.to_string());
        val.push(runs.long.to_string());
    }
    val.push(pad.to_string());
    val.push(packed);
    Ok(val)
}

fn relative_moves(pixels: &[(i64, i64)]) -> Vec<u8> {
    let mut codes = Vec::new();
    let mut heading = START_DIRECTION;
    for pair in pixels.windows(2) {
        let (mut x, mut y) = pair[0];
        let (tx, ty) = pair[1];
        while (x, y) != (tx, ty) {
            let step = ((tx - x).signum(), (ty - y).signum());
            let dir = direction_of(step);
            match (dir + 8 - heading) % 8 {
                0 => codes.push(0),
                1 => codes.push(1),
                7 => codes.push(2),
                2 => codes.push(3),
                6 => codes.push(4),
                4 => codes.extend([REVERSE, 0]),
                5 => codes.extend([REVERSE, 1]),
                _ => codes.extend([REVERSE, 2]),
            }
            heading = dir;
            x += step.0;
            y += step.1;
        }
    }
    codes
}

fn compress(codes: &[u8], runs: Runs) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len());
    let mut zeros = 0u32;
    let flush = |out: &mut Vec<u8>, zeros: u32| {
        if zeros < runs.short {
            out.extend(std::iter::repeat(0).take(zeros as usize));
            return;
        }
        let long = zeros / runs.long;
        let rest = zeros % runs.long;
        out.extend(std::iter::repeat(LONG_RUN_SYMBOL).take(long as usize));
        out.extend(std::iter::repeat(SHORT_RUN_SYMBOL).take((rest / runs.short) as usize));
        out.extend(std::iter::repeat(0).take((rest % runs.short) as usize));
    };
    for &code in codes {
        if code == 0 {
            zeros += 1;
            continue;
        }
        flush(&mut out, zeros);
        zeros = 0;
        out.push(code);
    }
    flush(&mut out, zeros);
    out
}

fn pack(codes: &[u8]) -> (String, u8) {
    let pad = (codes.len() % 2) as u8;
    let packed = codes
        .chunks(2)
        .map(|pair| {
            let hi = pair[0];
            let lo = pair.get(1).copied().unwrap_or(0);
            char::from(ALPHABET[usize::from((hi << 3) | lo)])
        })
        .collect();
    (packed, pad)
}

// ── Decoding ───────────────────────────────────────────────────

/// Decode a chain-coded `val` back into flat `[x0, y0, x1, y1, ...]`
/// coordinates.
///
/// The result holds the start point, every point where the path changes
/// direction and the end point. A polyline whose segments are horizontal,
/// vertical or diagonal therefore decodes to its own vertices.
pub fn decode(val: &[String], mode: Poly2dMode) -> Result<Vec<f64>> {
    let (x0, y0, runs, pad, packed) = match (mode, val) {
        (Poly2dMode::Absolute, _) => {
            return Err(OpenLabelError::shape(
                "absolute poly2d coordinates are not chain-coded",
            ))
        }
        (Poly2dMode::Srf6dcc, [x, y, pad, code]) => (x, y, Runs::default(), pad, code),
        (Poly2dMode::Rs6fcc, [x, y, short, long, pad, code]) => {
            let runs = Runs {
                short: int_field(short, "short run")?,
                long: int_field(long, "long run")?,
            };
            if runs.short == 0 || runs.long == 0 {
                return Err(OpenLabelError::shape("poly2d run lengths must be positive"));
            }
            (x, y, runs, pad, code)
        }
        (_, other) => {
            return Err(OpenLabelError::shape(format!(
                "{} takes {} strings, got {}",
                mode.as_str(),
                if mode == Poly2dMode::Srf6dcc { 4 } else { 6 },
                other.len()
            )))
        }
    };

    let start = (int_field(x0, "x")?, int_field(y0, "y")?);
    let pad: usize = int_field(pad, "padding")?;
    let mut codes = unpack(packed)?;
    if pad > 1 || pad > codes.len() {
        return Err(OpenLabelError::shape(format!("poly2d padding {pad} is out of range")));
    }
    codes.truncate(codes.len() - pad);

    let mut walk = Walk::new(start);
    let mut heading = START_DIRECTION;
    for code in codes {
        match code {
            0..=4 => {
                heading = (heading + TURNS[usize::from(code)]) % 8;
                walk.step(heading, 1);
            }
            REVERSE => heading = (heading + 4) % 8,
            SHORT_RUN_SYMBOL => walk.step(heading, runs.short),
            _ => walk.step(heading, runs.long),
        }
    }
    Ok(walk.finish())
}

fn int_field<T: std::str::FromStr>(s: &str, what: &str) -> Result<T> {
    s.parse()
        .map_err(|_| OpenLabelError::shape(format!("poly2d {what} `{s}` is not an integer")))
}

fn unpack(packed: &str) -> Result<Vec<u8>> {
    let mut codes = Vec::with_capacity(packed.len() * 2);
    for c in packed.bytes() {
        let idx = ALPHABET.iter().position(|a| *a == c).ok_or_else(|| {
            OpenLabelError::shape(format!("`{}` is not a chain-code character", char::from(c)))
        })?;
        codes.push((idx >> 3) as u8);
        codes.push((idx & 7) as u8);
    }
    Ok(codes)
}

/// Path under reconstruction. Keeps only the points where it bends.
struct Walk {
    pos: (i64, i64),
    last: Option<usize>,
    coords: Vec<f64>,
}

impl Walk {
    fn new(start: (i64, i64)) -> Self {
        Self {
            pos: start,
            last: None,
            coords: vec![start.0 as f64, start.1 as f64],
        }
    }

    fn step(&mut self, dir: usize, count: u32) {
        if count == 0 {
            return;
        }
        if self.last.is_some_and(|last| last != dir) {
            self.push_pos();
        }
        let (dx, dy) = STEPS[dir];
        let n = i64::from(count);
        self.pos = (
            self.pos.0.saturating_add(dx * n),
            self.pos.1.saturating_add(dy * n),
        );
        self.last = Some(dir);
    }

    fn push_pos(&mut self) {
        self.coords.push(self.pos.0 as f64);
        self.coords.push(self.pos.1 as f64);
    }

    fn finish(mut self) -> Vec<f64> {
        if self.last.is_some() {
            self.push_pos();
        }
        self.coords
    }
}
