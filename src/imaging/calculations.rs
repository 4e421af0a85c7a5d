//! Pure pixel math used by the enhancement operations.
//!
//! Everything here works on plain slices and numbers with no buffer or I/O
//! types involved, so it is trivially unit testable:
//!
//! - BT.601 luminance
//! - sRGB ⇄ CIE L\*a\*b\* (D65), with L scaled to 0–255 the way 8-bit
//!   imaging libraries store it
//! - histogram building, clipping and equalisation lookup tables (CLAHE)
//! - the recursive-filter coefficient used by the domain transform

/// D65 reference white.
const D65_X: f32 = 0.95047;
const D65_Y: f32 = 1.00000;
const D65_Z: f32 = 1.08883;

const SRGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.119_192, 0.9503041],
];

const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.969_266, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// CIE f(t) breakpoint, (6/29)^3.
const LAB_EPSILON: f32 = 216.0 / 24389.0;
const LAB_DELTA: f32 = 6.0 / 29.0;

/// BT.601 luma of an 8-bit RGB triple, rounded to nearest.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        t / (3.0 * LAB_DELTA * LAB_DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(u: f32) -> f32 {
    if u > LAB_DELTA {
        u * u * u
    } else {
        3.0 * LAB_DELTA * LAB_DELTA * (u - 4.0 / 29.0)
    }
}

fn mul(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Convert one 8-bit sRGB pixel to (L 0–100, a, b).
pub fn rgb_to_lab(rgb: [u8; 3], linear: &[f32; 256]) -> [f32; 3] {
    let lin = [
        linear[rgb[0] as usize],
        linear[rgb[1] as usize],
        linear[rgb[2] as usize],
    ];
    let [x, y, z] = mul(&SRGB_TO_XYZ, lin);
    let fx = lab_f(x / D65_X);
    let fy = lab_f(y / D65_Y);
    let fz = lab_f(z / D65_Z);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Convert (L 0–100, a, b) back to an 8-bit sRGB pixel, saturating out-of-gamut values.
pub fn lab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;
    let xyz = [
        lab_f_inv(fx) * D65_X,
        lab_f_inv(fy) * D65_Y,
        lab_f_inv(fz) * D65_Z,
    ];
    let lin = mul(&XYZ_TO_SRGB, xyz);
    lin.map(|c| (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Lookup table from 8-bit sRGB code value to linear light.
pub fn linearization_table() -> [f32; 256] {
    std::array::from_fn(|i| srgb_to_linear(i as f32 / 255.0))
}

/// An RGB image split into a lightness plane and two chroma planes.
///
/// Lightness is stored as 8-bit (`L * 255 / 100`) so histogram operations can
/// run on it directly; chroma stays in floating point so recomposition loses
/// as little as possible.
#[derive(Debug, Clone)]
pub struct LabPlanes {
    pub l: Vec<u8>,
    pub a: Vec<f32>,
    pub b: Vec<f32>,
}

impl LabPlanes {
    /// Split interleaved RGB samples.
    pub fn from_rgb(data: &[u8]) -> Self {
        let linear = linearization_table();
        let n = data.len() / 3;
        let mut planes = Self {
            l: Vec::with_capacity(n),
            a: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
        };
        for px in data.chunks_exact(3) {
            let [l, a, b] = rgb_to_lab([px[0], px[1], px[2]], &linear);
            planes
                .l
                .push((l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8);
            planes.a.push(a);
            planes.b.push(b);
        }
        planes
    }

    /// Recompose into interleaved RGB samples.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.l.len() * 3);
        for i in 0..self.l.len() {
            let l = self.l[i] as f32 * 100.0 / 255.0;
            out.extend_from_slice(&lab_to_rgb([l, self.a[i], self.b[i]]));
        }
        out
    }
}

/// 256-bin histogram of 8-bit samples.
pub fn histogram<'a>(samples: impl IntoIterator<Item = &'a u8>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &s in samples {
        hist[s as usize] += 1;
    }
    hist
}

/// Clip every bin at `limit` and spread the excess evenly over all bins.
///
/// Whatever cannot be spread evenly is handed out one count at a time at a
/// regular stride, so the total count is preserved exactly.
pub fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess: u32 = 0;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let mut residual = excess - batch * 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (256 / residual as usize).max(1);
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Absolute clip limit for a tile of `area` pixels.
pub fn clahe_clip_limit(clip_limit: f32, area: usize) -> u32 {
    ((clip_limit * area as f32 / 256.0) as u32).max(1)
}

/// Equalisation lookup table: cumulative histogram scaled to 0–255.
pub fn equalization_lut(hist: &[u32; 256], area: usize) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }
    let scale = 255.0 / area as f32;
    let mut cdf: u32 = 0;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Feedback coefficient for iteration `i` (0-based) of an `n`-pass recursive
/// domain-transform filter with spatial sigma `sigma_s`.
pub fn recursive_filter_coefficient(sigma_s: f32, i: u32, n: u32) -> f32 {
    let sigma_h = sigma_s * 3f32.sqrt() * 2f32.powi((n - (i + 1)) as i32)
        / (4f32.powi(n as i32) - 1.0).sqrt();
    (-(2f32.sqrt()) / sigma_h).exp()
}
