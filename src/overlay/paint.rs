use font8x8::{UnicodeFonts, BASIC_FONTS};
use tiny_skia::{Color, Paint, PathBuilder, PixmapMut, Stroke, Transform};

use super::{Outline, Panel};
use crate::config::{
    backdrop_alpha, BACKDROP_RGB, LABEL_BG_RGB, LABEL_FG_RGB, LABEL_INSET, LABEL_PADDING,
    LABEL_SCALE, OUTLINE_RGB, OUTLINE_WIDTH,
};

const GLYPH_SIZE: i32 = 8;

fn solid(rgb: (u8, u8, u8), alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(rgb.0, rgb.1, rgb.2, alpha));
    paint.anti_alias = false;
    paint
}

fn fill_box(pixmap: &mut PixmapMut, x: i32, y: i32, width: i32, height: i32, paint: &Paint, transform: Transform) {
    if let Some(rect) = tiny_skia::Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) {
        pixmap.fill_rect(rect, paint, transform, None);
    }
}

/// Paint one monitor's panel in logical coordinates; `scale` maps them to
/// buffer pixels.
pub fn paint_panel(pixmap: &mut PixmapMut, panel: &Panel, scale: f32) {
    pixmap.fill(Color::from_rgba8(
        BACKDROP_RGB.0,
        BACKDROP_RGB.1,
        BACKDROP_RGB.2,
        backdrop_alpha(),
    ));
    let transform = Transform::from_scale(scale, scale);
    for outline in &panel.outlines {
        draw_outline(pixmap, outline, transform);
    }
    for outline in &panel.outlines {
        draw_label(pixmap, outline, transform);
    }
}

fn draw_outline(pixmap: &mut PixmapMut, outline: &Outline, transform: Transform) {
    let rect = outline.rect;
    let Some(bounds) = tiny_skia::Rect::from_xywh(
        rect.left as f32,
        rect.top as f32,
        rect.width.max(1) as f32,
        rect.height.max(1) as f32,
    ) else {
        return;
    };
    let path = PathBuilder::from_rect(bounds);
    let stroke = Stroke {
        width: OUTLINE_WIDTH,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &solid(OUTLINE_RGB, 255), &stroke, transform, None);
}

fn draw_label(pixmap: &mut PixmapMut, outline: &Outline, transform: Transform) {
    let text = outline.key.as_str();
    let glyph = GLYPH_SIZE * LABEL_SCALE;
    let x = outline.rect.left + LABEL_INSET;
    let y = outline.rect.top + LABEL_INSET;
    let width = text.chars().count() as i32 * glyph + LABEL_PADDING * 2;
    let height = glyph + LABEL_PADDING * 2;
    fill_box(pixmap, x, y, width, height, &solid(LABEL_BG_RGB, 255), transform);

    let ink = solid(LABEL_FG_RGB, 255);
    let mut cursor_x = x + LABEL_PADDING;
    let top = y + LABEL_PADDING;
    for ch in text.chars() {
        let Some(bitmap) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            cursor_x += glyph;
            continue;
        };
        for (row_idx, row) in bitmap.iter().enumerate() {
            let row = *row;
            for col_idx in 0..GLYPH_SIZE {
                if (row >> col_idx) & 1 == 0 {
                    continue;
                }
                fill_box(
                    pixmap,
                    cursor_x + col_idx * LABEL_SCALE,
                    top + row_idx as i32 * LABEL_SCALE,
                    LABEL_SCALE,
                    LABEL_SCALE,
                    &ink,
                    transform,
                );
            }
        }
        cursor_x += glyph;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppKey, MonitorRect, Rect};
    use tiny_skia::Pixmap;

    fn panel(outlines: Vec<Outline>) -> Panel {
        Panel {
            monitor: MonitorRect {
                x: 0,
                y: 0,
                width: 300,
                height: 200,
            },
            outlines,
        }
    }

    fn painted(panel: &Panel, scale: f32) -> Pixmap {
        let size = scale as u32;
        let mut pixmap = Pixmap::new(300 * size, 200 * size).unwrap();
        paint_panel(&mut pixmap.as_mut(), panel, scale);
        pixmap
    }

    #[test]
    fn empty_panel_is_translucent_backdrop() {
        let pixmap = painted(&panel(Vec::new()), 1.0);
        let px = pixmap.pixel(150, 100).unwrap();
        assert_eq!(px.alpha(), backdrop_alpha());
        assert_eq!((px.red(), px.green(), px.blue()), (0, 0, 0));
    }

    #[test]
    fn outline_and_label_are_drawn_at_local_position() {
        let outline = Outline {
            key: AppKey::from("Notes"),
            rect: Rect::new(20, 20, 200, 120),
        };
        let pixmap = painted(&panel(vec![outline]), 1.0);

        let edge = pixmap.pixel(20, 100).unwrap();
        assert_eq!(edge.alpha(), 255);
        assert!(edge.blue() > 200 && edge.red() < 50);

        let inside = pixmap.pixel(150, 110).unwrap();
        assert_eq!(inside.alpha(), backdrop_alpha());

        let label_bg = pixmap.pixel(31, 31).unwrap();
        assert_eq!((label_bg.red(), label_bg.green(), label_bg.blue()), (255, 255, 0));

        // 'N' has its left stem in the first glyph column.
        let mut ink_found = false;
        for y in 35..51 {
            let px = pixmap.pixel(35, y).unwrap();
            if px.red() == 0 && px.green() == 0 && px.alpha() == 255 {
                ink_found = true;
            }
        }
        assert!(ink_found);
    }

    #[test]
    fn scale_maps_logical_to_buffer_pixels() {
        let outline = Outline {
            key: AppKey::from("A"),
            rect: Rect::new(100, 50, 50, 50),
        };
        let pixmap = painted(&panel(vec![outline]), 2.0);
        let label_bg = pixmap.pixel(2 * 111, 2 * 61).unwrap();
        assert_eq!((label_bg.red(), label_bg.green()), (255, 255));
    }
}
