//! Enhancement operations on [`ImageBuffer`]s.
//!
//! Each function takes a buffer by reference and returns a new one. None of
//! them check applicability: the transform registry decides whether a buffer
//! has the right shape before calling in here.
//!
//! | Operation | Implementation |
//! |---|---|
//! | Grayscale | BT.601 luma per pixel |
//! | Histogram equalisation | `imageproc::contrast::equalize_histogram` |
//! | Color balance | CLAHE on the L\*a\*b\* lightness plane |
//! | Exposure | saturating `|alpha * v + beta|` |
//! | Contrast | global equalisation of the lightness plane |
//! | Shadow removal | `imageproc::morphology::grayscale_dilate` + `imageproc::filter::median_filter` background |
//! | Detail enhancement | recursive domain-transform smoothing of lightness, detail boost |

use super::buffer::{Channels, ImageBuffer};
use super::calculations::{
    LabPlanes, clahe_clip_limit, clip_histogram, equalization_lut, histogram, luminance,
    recursive_filter_coefficient,
};
use super::params::{ClaheParams, DetailParams, ExposureParams, ShadowParams};
use image::GrayImage;
use imageproc::morphology::{Mask, grayscale_dilate};

/// Passes of the recursive edge-preserving filter.
const DOMAIN_TRANSFORM_ITERATIONS: u32 = 3;

/// Gain applied to the detail layer by [`enhance_details`].
const DETAIL_BOOST: f32 = 3.0;

/// Convert an RGB buffer to single-channel luma.
pub fn to_grayscale(src: &ImageBuffer) -> ImageBuffer {
    let data: Vec<u8> = src
        .data()
        .chunks_exact(3)
        .map(|px| luminance(px[0], px[1], px[2]))
        .collect();
    ImageBuffer::from_parts(src.width(), src.height(), Channels::Gray, data)
}

/// Globally equalise a grayscale buffer's histogram.
pub fn equalize_histogram(src: &ImageBuffer) -> ImageBuffer {
    ImageBuffer::from_gray(imageproc::contrast::equalize_histogram(
        &src.to_gray_image(),
    ))
}

/// Saturating affine remap of every sample.
pub fn adjust_exposure(src: &ImageBuffer, params: &ExposureParams) -> ImageBuffer {
    let lut: [u8; 256] = std::array::from_fn(|v| {
        (params.alpha * v as f32 + params.beta)
            .abs()
            .round()
            .clamp(0.0, 255.0) as u8
    });
    let data = src.data().iter().map(|&v| lut[v as usize]).collect();
    src.with_data(data)
}

/// Adaptive local contrast on lightness only; chroma is carried through.
pub fn color_balance(src: &ImageBuffer, params: &ClaheParams) -> ImageBuffer {
    let mut lab = LabPlanes::from_rgb(src.data());
    lab.l = clahe(&lab.l, src.width(), src.height(), params);
    src.with_data(lab.to_rgb())
}

/// Global histogram equalisation of lightness only.
pub fn enhance_contrast(src: &ImageBuffer) -> ImageBuffer {
    let mut lab = LabPlanes::from_rgb(src.data());
    let equalized =
        imageproc::contrast::equalize_histogram(&plane_image(src, std::mem::take(&mut lab.l)));
    lab.l = equalized.into_raw();
    src.with_data(lab.to_rgb())
}

/// Flatten uneven illumination channel by channel.
///
/// The background of each channel is estimated by dilating it (which erases
/// thin dark detail such as text or texture) and then median blurring with a
/// large window. The output is `255 - |plane - background|`, so regions that
/// match their local background go white and detail stays dark.
pub fn remove_shadows(src: &ImageBuffer, params: &ShadowParams) -> ImageBuffer {
    let channels = src.channels().count() as usize;
    let median_radius = params.median_size / 2;
    let mask = Mask::square(u8::try_from(params.dilate_size / 2).unwrap_or(u8::MAX));
    let mut out = vec![0u8; src.data().len()];

    for c in 0..channels {
        let plane: Vec<u8> = src.data().iter().skip(c).step_by(channels).copied().collect();
        let dilated = grayscale_dilate(&plane_image(src, plane.clone()), &mask);
        let background =
            imageproc::filter::median_filter(&dilated, median_radius, median_radius);
        for (i, (&v, &bg)) in plane.iter().zip(background.as_raw()).enumerate() {
            out[i * channels + c] = 255 - v.abs_diff(bg);
        }
    }

    src.with_data(out)
}

/// Edge-preserving detail boost on lightness.
///
/// Lightness is smoothed with a recursive domain-transform filter, which
/// flattens texture while keeping strong edges. The difference between the
/// original and smoothed lightness (the detail layer) is amplified and added
/// back.
pub fn enhance_details(src: &ImageBuffer, params: &DetailParams) -> ImageBuffer {
    let mut lab = LabPlanes::from_rgb(src.data());
    let lightness: Vec<f32> = lab.l.iter().map(|&v| v as f32 / 255.0).collect();
    let base = domain_transform(&lightness, src.width(), src.height(), params);

    lab.l = lightness
        .iter()
        .zip(&base)
        .map(|(&l, &b)| ((b + DETAIL_BOOST * (l - b)) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    src.with_data(lab.to_rgb())
}

/// Wrap a single plane with `src`'s dimensions as a `GrayImage`.
fn plane_image(src: &ImageBuffer, plane: Vec<u8>) -> GrayImage {
    ImageBuffer::from_parts(src.width(), src.height(), Channels::Gray, plane).to_gray_image()
}

/// Contrast-limited adaptive histogram equalisation of one 8-bit plane.
///
/// The plane is split into a grid of tiles, each tile gets its own clipped
/// equalisation table, and every pixel is mapped through a bilinear blend of
/// the tables of the four nearest tile centres.
fn clahe(plane: &[u8], w: u32, h: u32, params: &ClaheParams) -> Vec<u8> {
    let (w, h) = (w as usize, h as usize);
    if w == 0 || h == 0 {
        return plane.to_vec();
    }
    let tiles_x = (params.tile_grid.0 as usize).clamp(1, w);
    let tiles_y = (params.tile_grid.1 as usize).clamp(1, h);
    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;

    let bounds = |i: usize, tile: f32, len: usize| {
        let start = (i as f32 * tile).round() as usize;
        let end = (((i + 1) as f32 * tile).round() as usize).min(len);
        (start, end.max(start + 1).min(len))
    };

    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        let (y0, y1) = bounds(ty, tile_h, h);
        for tx in 0..tiles_x {
            let (x0, x1) = bounds(tx, tile_w, w);
            let mut hist =
                histogram((y0..y1).flat_map(|y| plane[y * w + x0..y * w + x1].iter()));
            let area = (y1 - y0) * (x1 - x0);
            clip_histogram(&mut hist, clahe_clip_limit(params.clip_limit, area));
            luts.push(equalization_lut(&hist, area));
        }
    }

    // Tile index on the left/top of the pixel, the one on the right/bottom, and
    // the weight of the latter.
    let neighbours = |pos: usize, tile: f32, count: usize| {
        let f = (pos as f32 + 0.5) / tile - 0.5;
        if f <= 0.0 {
            return (0, 0, 0.0);
        }
        let lo = (f.floor() as usize).min(count - 1);
        let hi = (lo + 1).min(count - 1);
        (lo, hi, f - f.floor())
    };

    let mut out = vec![0u8; plane.len()];
    for y in 0..h {
        let (ty0, ty1, wy) = neighbours(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, wx) = neighbours(x, tile_w, tiles_x);
            let v = plane[y * w + x] as usize;
            let at = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
            let top = at(tx0, ty0) * (1.0 - wx) + at(tx1, ty0) * wx;
            let bottom = at(tx0, ty1) * (1.0 - wx) + at(tx1, ty1) * wx;
            out[y * w + x] = (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Recursive-filter domain transform (Gastal & Oliveira) on a 0–1 plane.
///
/// Alternates horizontal and vertical two-way recursive passes whose feedback
/// is attenuated by the accumulated gradient, so smoothing stops at edges.
fn domain_transform(plane: &[f32], w: u32, h: u32, params: &DetailParams) -> Vec<f32> {
    let (w, h) = (w as usize, h as usize);
    let ratio = params.sigma_s / params.sigma_r;

    // Domain-transform derivatives from the unfiltered plane. Entry i is the
    // distance between sample i and its predecessor along the axis.
    let mut dx = vec![1.0f32; plane.len()];
    let mut dy = vec![1.0f32; plane.len()];
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if x > 0 {
                dx[i] = 1.0 + ratio * (plane[i] - plane[i - 1]).abs();
            }
            if y > 0 {
                dy[i] = 1.0 + ratio * (plane[i] - plane[i - w]).abs();
            }
        }
    }

    let mut out = plane.to_vec();
    for i in 0..DOMAIN_TRANSFORM_ITERATIONS {
        let a = recursive_filter_coefficient(params.sigma_s, i, DOMAIN_TRANSFORM_ITERATIONS);
        for y in 0..h {
            recursive_pass(&mut out, &dx, a, (0..w).map(|x| y * w + x));
        }
        for x in 0..w {
            recursive_pass(&mut out, &dy, a, (0..h).map(|y| y * w + x));
        }
    }
    out
}

/// Causal then anti-causal first-order recursive filter along one line of
/// indices.
fn recursive_pass(data: &mut [f32], dist: &[f32], a: f32, line: impl Iterator<Item = usize>) {
    let idx: Vec<usize> = line.collect();
    for k in 1..idx.len() {
        let (prev, cur) = (idx[k - 1], idx[k]);
        let weight = a.powf(dist[cur]);
        data[cur] += weight * (data[prev] - data[cur]);
    }
    for k in (0..idx.len().saturating_sub(1)).rev() {
        let (cur, next) = (idx[k], idx[k + 1]);
        let weight = a.powf(dist[next]);
        data[cur] += weight * (data[next] - data[cur]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_rgb, solid_rgb};

    fn gray(w: u32, h: u32, data: Vec<u8>) -> ImageBuffer {
        ImageBuffer::from_raw(w, h, 1, data).unwrap()
    }

    #[test]
    fn grayscale_matches_reference_luminance() {
        let src = gradient_rgb(8, 6);
        let out = to_grayscale(&src);

        assert!(out.is_gray());
        assert_eq!((out.width(), out.height()), (8, 6));
        for (px, &g) in src.data().chunks_exact(3).zip(out.data()) {
            let reference = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            assert!((g as f32 - reference).abs() <= 1.0);
        }
    }

    #[test]
    fn equalize_spreads_narrow_histogram() {
        let data: Vec<u8> = (0..64).map(|i| 100 + (i % 8) as u8).collect();
        let out = equalize_histogram(&gray(8, 8, data));

        let min = *out.data().iter().min().unwrap();
        let max = *out.data().iter().max().unwrap();
        assert!(max - min > 200, "range only {min}..{max}");
    }

    #[test]
    fn exposure_scales_offsets_and_saturates() {
        let src = gray(3, 1, vec![0, 100, 250]);
        let out = adjust_exposure(&src, &ExposureParams::default());
        assert_eq!(out.data(), &[20, 140, 255]);
    }

    #[test]
    fn exposure_takes_absolute_value() {
        let src = gray(2, 1, vec![0, 200]);
        let params = ExposureParams {
            alpha: -1.0,
            beta: 0.0,
        };
        assert_eq!(adjust_exposure(&src, &params).data(), &[0, 200]);
    }

    #[test]
    fn exposure_keeps_color_layout() {
        let out = adjust_exposure(&solid_rgb(4, 4, [10, 20, 30]), &ExposureParams::default());
        assert!(!out.is_gray());
        assert_eq!(&out.data()[..3], &[32, 44, 56]);
    }

    #[test]
    fn color_balance_preserves_shape() {
        let src = gradient_rgb(32, 24);
        let out = color_balance(&src, &ClaheParams::default());
        assert_eq!((out.width(), out.height()), (32, 24));
        assert_eq!(out.data().len(), src.data().len());
    }

    #[test]
    fn color_balance_handles_images_smaller_than_grid() {
        let src = gradient_rgb(3, 2);
        let out = color_balance(&src, &ClaheParams::default());
        assert_eq!(out.data().len(), 18);
    }

    #[test]
    fn clahe_stretches_low_contrast_plane() {
        let plane: Vec<u8> = (0..64 * 64).map(|i| 120 + (i % 16) as u8).collect();
        let params = ClaheParams {
            clip_limit: 40.0,
            tile_grid: (4, 4),
        };
        let out = clahe(&plane, 64, 64, &params);

        let min = *out.iter().min().unwrap();
        let max = *out.iter().max().unwrap();
        assert!(max - min > 15 * 2, "range only {min}..{max}");
    }

    #[test]
    fn clahe_keeps_flat_plane_flat() {
        let plane = vec![90u8; 16 * 16];
        let out = clahe(&plane, 16, 16, &ClaheParams::default());
        assert!(out.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn enhance_contrast_keeps_neutral_gray_neutral() {
        let mut data = Vec::new();
        for v in 0..64u8 {
            let g = 96 + v;
            data.extend_from_slice(&[g, g, g]);
        }
        let src = ImageBuffer::from_raw(8, 8, 3, data).unwrap();
        let out = enhance_contrast(&src);
        for px in out.data().chunks_exact(3) {
            assert!(px[0].abs_diff(px[1]) <= 2 && px[1].abs_diff(px[2]) <= 2, "{px:?}");
        }
    }

    #[test]
    fn remove_shadows_whitens_uniform_regions() {
        let out = remove_shadows(&solid_rgb(30, 30, [80, 90, 100]), &ShadowParams::default());
        assert!(out.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn remove_shadows_accepts_largest_dilation_kernel() {
        let params = ShadowParams {
            dilate_size: 511,
            median_size: 3,
        };
        let out = remove_shadows(&solid_rgb(6, 4, [10, 120, 240]), &params);
        assert_eq!((out.width(), out.height()), (6, 4));
        assert!(out.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn remove_shadows_keeps_dark_detail_dark() {
        let mut src = solid_rgb(40, 40, [200, 200, 200]).into_raw();
        // 2px dark line across the middle row
        for y in 19..21 {
            for x in 0..40 {
                let i = (y * 40 + x) * 3;
                src[i..i + 3].copy_from_slice(&[20, 20, 20]);
            }
        }
        let src = ImageBuffer::from_raw(40, 40, 3, src).unwrap();
        let out = remove_shadows(&src, &ShadowParams::default());

        let line = out.data()[(20 * 40 + 20) * 3];
        let background = out.data()[(5 * 40 + 20) * 3];
        assert!(line < 100, "line pixel {line}");
        assert_eq!(background, 255);
    }

    #[test]
    fn domain_transform_flattens_noise_but_keeps_step() {
        let (w, h) = (32u32, 4u32);
        let plane: Vec<f32> = (0..w * h)
            .map(|i| {
                let x = i % w;
                let base = if x < 16 { 0.2 } else { 0.8 };
                base + if i % 2 == 0 { 0.01 } else { -0.01 }
            })
            .collect();
        let out = domain_transform(&plane, w, h, &DetailParams::default());

        // texture inside each half is smoothed
        assert!((out[5] - out[6]).abs() < 0.02);
        // the edge between halves survives
        assert!(out[20] - out[10] > 0.4);
    }

    #[test]
    fn enhance_details_on_flat_image_is_near_identity() {
        let src = solid_rgb(16, 16, [120, 140, 160]);
        let out = enhance_details(&src, &DetailParams::default());
        for (a, b) in src.data().iter().zip(out.data()) {
            assert!(a.abs_diff(*b) <= 2);
        }
    }
}
