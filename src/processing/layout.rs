use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::RgbaImage;

/// Largest region of a `src_w x src_h` image with the aspect ratio of
/// `target_w x target_h`, centred. Returns `(x, y, width, height)`.
pub fn central_crop(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32, u32, u32) {
    let sw = u64::from(src_w.max(1));
    let sh = u64::from(src_h.max(1));
    let tw = u64::from(target_w.max(1));
    let th = u64::from(target_h.max(1));

    // Compare sw/sh against tw/th without going through floats.
    let (w, h) = if sw * th > sh * tw {
        ((sh * tw / th).max(1), sh)
    } else {
        (sw, (sw * th / tw).max(1))
    };
    let (w, h) = (w as u32, h as u32);
    let (x, y) = center_offset(w, h, src_w, src_h);
    (x, y, w, h)
}

pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

/// Centre-crop `source` to the display's aspect ratio and resize it to the
/// exact display resolution. Images that already match are returned as is.
pub fn fit_to_display(source: &RgbaImage, resolution: (u32, u32)) -> Result<RgbaImage> {
    let (target_w, target_h) = resolution;
    if source.dimensions() == resolution {
        return Ok(source.clone());
    }
    let (x, y, w, h) = central_crop(source.width(), source.height(), target_w, target_h);
    let cropped = image::imageops::crop_imm(source, x, y, w, h).to_image();
    let resized = resize_rgba(&cropped, target_w, target_h)?;
    tracing::debug!(
        from = ?source.dimensions(),
        crop = ?(w, h),
        to = ?resolution,
        "fitted image to display"
    );
    Ok(resized)
}

pub fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("resize failed")?;
    let buffer = dst_image.into_vec();
    RgbaImage::from_raw(target_w, target_h, buffer)
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn wide_source_is_trimmed_at_the_sides() {
        assert_eq!(central_crop(1000, 500, 600, 448), (165, 0, 669, 500));
    }

    #[test]
    fn tall_source_is_trimmed_top_and_bottom() {
        assert_eq!(central_crop(400, 1000, 800, 480), (0, 380, 400, 240));
    }

    #[test]
    fn matching_aspect_keeps_everything() {
        assert_eq!(central_crop(1200, 896, 600, 448), (0, 0, 1200, 896));
    }

    #[test]
    fn fit_produces_exact_resolution() {
        let src = RgbaImage::from_pixel(37, 91, Rgba([200, 10, 10, 255]));
        let out = fit_to_display(&src, (60, 40)).unwrap();
        assert_eq!(out.dimensions(), (60, 40));
        let px = out.get_pixel(30, 20);
        for (got, want) in px.0.iter().zip([200u8, 10, 10, 255]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
    }

    #[test]
    fn fit_is_identity_at_native_size() {
        let src = RgbaImage::from_pixel(8, 4, Rgba([1, 2, 3, 255]));
        assert_eq!(fit_to_display(&src, (8, 4)).unwrap(), src);
    }
}
