//! Draws a card as a layout of colored blocks.
//!
//! No font rendering: the title, date, highlights and footer are drawn as
//! bars sized by their text length, over the scheme gradient. The result has
//! the card's proportions and palette, which is what wallpapers and shared
//! thumbnails need to look right.

use super::{RasterImage, RasterOptions, Rasterizer};
use crate::error::{CardError, Result};
use crate::model::char_count;
use crate::preview::CardTarget;
use image::{Rgba, RgbaImage};

const CORNER_RADIUS: u32 = 24;
const PADDING: u32 = 24;
const TITLE_HEIGHT: u32 = 20;
const POINT_HEIGHT: u32 = 18;
const POINT_GAP: u32 = 8;
const GLYPH_WIDTH: u32 = 8;
const MAX_SCALE: u32 = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct SwatchRasterizer;

impl Rasterizer for SwatchRasterizer {
    async fn rasterize(&self, target: &CardTarget, options: RasterOptions) -> Result<RasterImage> {
        if options.scale == 0 || options.scale > MAX_SCALE {
            return Err(CardError::Raster(format!(
                "scale must be between 1 and {}, got {}",
                MAX_SCALE, options.scale
            )));
        }
        Ok(RasterImage {
            pixels: draw(target, options),
        })
    }
}

fn draw(target: &CardTarget, options: RasterOptions) -> RgbaImage {
    let s = options.scale;
    let (base_w, base_h) = target.size.dimensions();
    let (w, h) = (base_w * s, base_h * s);
    let palette = target.palette();
    let outside = if options.transparent_background {
        Rgba([255, 255, 255, 0])
    } else {
        Rgba([255, 255, 255, 255])
    };

    let [fr, fg, fb] = palette.gradient_from;
    let [tr, tg, tb] = palette.gradient_to;
    let mut img = RgbaImage::from_fn(w, h, |x, y| {
        if !inside_rounded(x, y, w, h, CORNER_RADIUS * s) {
            return outside;
        }
        let t = (x as f32 / w as f32 + y as f32 / h as f32) / 2.0;
        Rgba([lerp(fr, tr, t), lerp(fg, tg, t), lerp(fb, tb, t), 255])
    });

    let pad = PADDING * s;
    let inner_w = w.saturating_sub(2 * pad);

    // Title row: subject on the left, date on the right.
    let date_w = (char_count(&target.date) as u32 * GLYPH_WIDTH / 2 * s).min(inner_w / 3);
    let title_w = (char_count(&target.title) as u32 * GLYPH_WIDTH * 2 * s)
        .min(inner_w.saturating_sub(date_w + pad));
    fill_rect(&mut img, pad, pad, title_w, TITLE_HEIGHT * s, palette.text, 0.9);
    fill_rect(
        &mut img,
        w - pad - date_w,
        pad + TITLE_HEIGHT * s / 3,
        date_w,
        TITLE_HEIGHT * s / 3,
        palette.text,
        0.5,
    );

    // Highlights panel.
    let panel_top = pad + TITLE_HEIGHT * s + pad / 2;
    let panel_bottom = h.saturating_sub(pad + 12 * s);
    if panel_bottom > panel_top {
        fill_rect(
            &mut img,
            pad,
            panel_top,
            inner_w,
            panel_bottom - panel_top,
            [255, 255, 255],
            0.6,
        );
        let mut y = panel_top + POINT_GAP * s;
        let text_left = pad + 12 * s;
        let text_max = inner_w.saturating_sub(24 * s);
        for (_, text) in &target.points {
            if y + POINT_HEIGHT * s > panel_bottom {
                break;
            }
            let bar_w = (char_count(text) as u32 * GLYPH_WIDTH * s).clamp(GLYPH_WIDTH * s, text_max);
            fill_rect(&mut img, text_left, y, bar_w, POINT_HEIGHT * s, palette.keypoint, 0.8);
            y += (POINT_HEIGHT + POINT_GAP) * s;
        }
    }

    // Footer: author badge bottom-left, credit line bottom-right.
    let footer_y = h.saturating_sub(pad / 2 + 8 * s);
    if target.nickname.is_some() || target.has_avatar {
        let r = 5 * s;
        fill_circle(&mut img, pad + r, footer_y + r / 2, r, palette.keypoint);
    }
    let credit_w = inner_w / 3;
    fill_rect(&mut img, w - pad - credit_w, footer_y, credit_w, 4 * s, palette.text, 0.35);

    img
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    (from as f32 + (to as f32 - from as f32) * t).round() as u8
}

fn inside_rounded(x: u32, y: u32, w: u32, h: u32, r: u32) -> bool {
    let r = r.min(w / 2).min(h / 2);
    let cx = if x < r {
        r
    } else if x >= w - r {
        w - r - 1
    } else {
        return true;
    };
    let cy = if y < r {
        r
    } else if y >= h - r {
        h - r - 1
    } else {
        return true;
    };
    let dx = x as i64 - cx as i64;
    let dy = y as i64 - cy as i64;
    dx * dx + dy * dy <= (r as i64) * (r as i64)
}

fn blend(px: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    if px[3] == 0 {
        return;
    }
    for (channel, target) in px.0.iter_mut().zip(color) {
        *channel = (*channel as f32 * (1.0 - alpha) + target as f32 * alpha).round() as u8;
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: [u8; 3], alpha: f32) {
    let x_end = x.saturating_add(w).min(img.width());
    let y_end = y.saturating_add(h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            blend(img.get_pixel_mut(px, py), color, alpha);
        }
    }
}

fn fill_circle(img: &mut RgbaImage, cx: u32, cy: u32, r: u32, color: [u8; 3]) {
    let r2 = (r as i64) * (r as i64);
    for py in cy.saturating_sub(r)..(cy + r).min(img.height()) {
        for px in cx.saturating_sub(r)..(cx + r).min(img.width()) {
            let dx = px as i64 - cx as i64;
            let dy = py as i64 - cy as i64;
            if dx * dx + dy * dy <= r2 {
                blend(img.get_pixel_mut(px, py), color, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthorProfile, CardSize, CardState, ColorScheme};

    fn target(size: CardSize) -> CardTarget {
        let mut card = CardState {
            subject: "Math".into(),
            card_size: size,
            scheme: ColorScheme::Pink,
            ..Default::default()
        };
        let id = card.highlights.entries()[0].id.clone();
        card.highlights.edit_content(&id, "derivatives");
        CardTarget::new(&card, &AuthorProfile::default())
    }

    #[tokio::test]
    async fn output_matches_preset_times_scale() {
        for size in CardSize::ALL {
            let image = SwatchRasterizer
                .rasterize(&target(size), RasterOptions::default())
                .await
                .unwrap();
            let (w, h) = size.dimensions();
            assert_eq!((image.width(), image.height()), (w * 2, h * 2));
        }
    }

    #[tokio::test]
    async fn corners_follow_background_option() {
        let t = target(CardSize::Standard);
        let transparent = SwatchRasterizer
            .rasterize(&t, RasterOptions::default())
            .await
            .unwrap();
        assert_eq!(transparent.pixels.get_pixel(0, 0)[3], 0);

        let opaque = SwatchRasterizer
            .rasterize(
                &t,
                RasterOptions {
                    scale: 1,
                    transparent_background: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(*opaque.pixels.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        // Center of the card is painted and opaque.
        let center = opaque.pixels.get_pixel(210, 120);
        assert_eq!(center[3], 255);
    }

    #[tokio::test]
    async fn scale_out_of_range_is_an_error() {
        let result = SwatchRasterizer
            .rasterize(
                &target(CardSize::Phone),
                RasterOptions {
                    scale: 0,
                    transparent_background: true,
                },
            )
            .await;
        assert!(matches!(result, Err(CardError::Raster(_))));
    }

    #[test]
    fn rounded_mask_cuts_only_corners() {
        assert!(!inside_rounded(0, 0, 100, 100, 10));
        assert!(inside_rounded(50, 0, 100, 100, 10));
        assert!(inside_rounded(0, 50, 100, 100, 10));
        assert!(!inside_rounded(99, 99, 100, 100, 10));
        assert!(inside_rounded(95, 95, 100, 100, 10));
    }
}
