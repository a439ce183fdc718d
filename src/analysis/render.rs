use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::analysis::geometry::{map_box, map_polygon, NormalizedPolygon, PixelBox, PixelPolygon};
use crate::error::{GeometryError, RenderError};
use crate::models::{BoxGroup, Color};

pub const DEFAULT_STROKE_WIDTH: u32 = 3;

/// Draw every box of every group as an outlined rectangle in the group's color.
///
/// The result is always 3-channel: grayscale is replicated and alpha dropped.
/// `colors` must hold exactly one color per group.
pub fn render_box_groups(
    source: &DynamicImage,
    groups: &[BoxGroup],
    colors: &[Color],
    stroke_width: u32,
) -> Result<RgbImage, RenderError> {
    if groups.len() != colors.len() {
        return Err(RenderError::ColorCountMismatch {
            groups: groups.len(),
            colors: colors.len(),
        });
    }

    let mut canvas = source.to_rgb8();
    let (width, height) = canvas.dimensions();

    for (group, color) in groups.iter().zip(colors) {
        for normalized in &group.boxes {
            if let Err(e) = normalized.validate() {
                warn!(
                    label = %group.label,
                    error = %e,
                    "Box outside the image, clipping to canvas"
                );
            }
            let pixel = map_box(width, height, normalized);
            draw_box(&mut canvas, &pixel, (*color).into(), stroke_width);
        }
    }

    Ok(canvas)
}

/// Outline `pixel` with `stroke_width` nested 1px rectangles, growing inward
fn draw_box(canvas: &mut RgbImage, pixel: &PixelBox, color: Rgb<u8>, stroke_width: u32) {
    if !pixel.is_finite() {
        warn!(error = %GeometryError::NonFinite, "Skipping box");
        return;
    }

    // Keep coordinates near the canvas so off-canvas edges stay off-canvas
    let (width, height) = canvas.dimensions();
    let stroke = stroke_width.max(1);
    let margin = stroke as f64;
    let clipped =
        pixel.clamp_within(-margin, -margin, width as f64 + margin, height as f64 + margin);

    let x0 = clipped.left.round_ties_even() as i32;
    let y0 = clipped.top.round_ties_even() as i32;
    let x1 = clipped.right.round_ties_even() as i32;
    let y1 = clipped.bottom.round_ties_even() as i32;
    if x1 < x0 || y1 < y0 {
        warn!(error = %GeometryError::EmptyRegion, "Skipping inverted box");
        return;
    }

    for inset in 0..stroke as i32 {
        let w = x1 - x0 + 1 - 2 * inset;
        let h = y1 - y0 + 1 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x0 + inset, y0 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Draw each polygon as a closed 1px outline.
///
/// Polygons with fewer than 3 points are skipped. Edges leaving the canvas are
/// clipped at the border without changing their direction.
pub fn render_polygons(
    source: &DynamicImage,
    polygons: &[NormalizedPolygon],
    color: Color,
) -> RgbImage {
    let mut canvas = source.to_rgb8();
    let (width, height) = canvas.dimensions();
    let color: Rgb<u8> = color.into();

    for (idx, polygon) in polygons.iter().enumerate() {
        match polygon.validate() {
            Ok(()) => {}
            Err(e @ GeometryError::TooFewPoints(_)) => {
                warn!(polygon = idx, error = %e, "Skipping polygon");
                continue;
            }
            Err(e) => {
                warn!(polygon = idx, error = %e, "Polygon outside the image, clipping to canvas");
            }
        }

        let pixel = map_polygon(width, height, polygon);
        if pixel.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            warn!(polygon = idx, error = %GeometryError::NonFinite, "Skipping polygon");
            continue;
        }
        draw_outline(&mut canvas, &pixel, color);
    }

    canvas
}

fn draw_outline(canvas: &mut RgbImage, polygon: &PixelPolygon, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    for (start, end) in polygon.clip_to(width, height) {
        draw_line_segment_mut(
            canvas,
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::geometry::{NormalizedBox, NormalizedPoint};
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn black(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, BLACK))
    }

    fn group(label: &str, boxes: Vec<NormalizedBox>) -> BoxGroup {
        BoxGroup {
            label: label.to_string(),
            boxes,
        }
    }

    fn square(left: f64, top: f64, right: f64, bottom: f64) -> NormalizedPolygon {
        NormalizedPolygon::new(vec![
            NormalizedPoint { x: left, y: top },
            NormalizedPoint { x: right, y: top },
            NormalizedPoint { x: right, y: bottom },
            NormalizedPoint { x: left, y: bottom },
        ])
    }

    #[test]
    fn no_groups_leaves_image_untouched() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_fn(16, 9, |x, y| {
            Rgb([x as u8 * 10, y as u8 * 20, 7])
        }));
        let rendered = render_box_groups(&source, &[], &[], DEFAULT_STROKE_WIDTH).unwrap();
        assert_eq!(rendered, source.to_rgb8());
    }

    #[test]
    fn color_count_must_match_groups() {
        let groups = vec![group("Cat", vec![NormalizedBox::new(0.1, 0.1, 0.2, 0.2)])];
        let err =
            render_box_groups(&black(10, 10), &groups, &[], DEFAULT_STROKE_WIDTH).unwrap_err();
        assert_eq!(err, RenderError::ColorCountMismatch { groups: 1, colors: 0 });
    }

    #[test]
    fn rectangle_is_drawn_with_inward_stroke() {
        let groups = vec![group("Cat", vec![NormalizedBox::new(0.1, 0.2, 0.3, 0.4)])];
        let rendered = render_box_groups(&black(100, 100), &groups, &[Color::RED], 3).unwrap();
        let red = Rgb([255, 0, 0]);

        assert_eq!(*rendered.get_pixel(10, 20), red);
        assert_eq!(*rendered.get_pixel(40, 60), red);
        assert_eq!(*rendered.get_pixel(25, 20), red);
        assert_eq!(*rendered.get_pixel(12, 40), red);
        assert_eq!(*rendered.get_pixel(13, 40), BLACK);
        assert_eq!(*rendered.get_pixel(25, 40), BLACK);
        assert_eq!(*rendered.get_pixel(9, 20), BLACK);
        assert_eq!(*rendered.get_pixel(41, 60), BLACK);
    }

    #[test]
    fn groups_use_their_own_colors() {
        let groups = vec![
            group("Cat", vec![NormalizedBox::new(0.1, 0.1, 0.2, 0.2)]),
            group("Dog", vec![NormalizedBox::new(0.6, 0.6, 0.2, 0.2)]),
        ];
        let rendered =
            render_box_groups(&black(100, 100), &groups, &[Color::RED, Color::BLUE], 1).unwrap();
        assert_eq!(*rendered.get_pixel(10, 10), Rgb([255, 0, 0]));
        assert_eq!(*rendered.get_pixel(60, 60), Rgb([0, 0, 255]));
    }

    #[test]
    fn box_larger_than_canvas_is_clipped_away() {
        let groups = vec![group("Sky", vec![NormalizedBox::new(-0.5, -0.5, 2.0, 2.0)])];
        let rendered = render_box_groups(&black(100, 100), &groups, &[Color::WHITE], 3).unwrap();
        assert!(rendered.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn box_hanging_off_canvas_keeps_visible_edges() {
        let groups = vec![group("Car", vec![NormalizedBox::new(0.5, 0.5, 1.0, 1.0)])];
        let rendered = render_box_groups(&black(100, 100), &groups, &[Color::WHITE], 1).unwrap();
        assert_eq!(*rendered.get_pixel(50, 75), Rgb([255, 255, 255]));
        assert_eq!(*rendered.get_pixel(75, 50), Rgb([255, 255, 255]));
        assert_eq!(*rendered.get_pixel(99, 99), BLACK);
    }

    #[test]
    fn alpha_is_dropped_and_gray_replicated() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0])));
        let rendered = render_box_groups(&rgba, &[], &[], DEFAULT_STROKE_WIDTH).unwrap();
        assert_eq!(*rendered.get_pixel(0, 0), Rgb([10, 20, 30]));

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([77])));
        let rendered = render_box_groups(&gray, &[], &[], DEFAULT_STROKE_WIDTH).unwrap();
        assert_eq!(*rendered.get_pixel(3, 3), Rgb([77, 77, 77]));
    }

    #[test]
    fn polygon_outline_is_closed_and_unfilled() {
        let rendered =
            render_polygons(&black(100, 100), &[square(0.1, 0.1, 0.5, 0.5)], Color::AQUA);
        let aqua = Rgb([0, 255, 255]);
        assert_eq!(*rendered.get_pixel(30, 10), aqua);
        assert_eq!(*rendered.get_pixel(50, 30), aqua);
        assert_eq!(*rendered.get_pixel(30, 50), aqua);
        assert_eq!(*rendered.get_pixel(10, 30), aqua);
        assert_eq!(*rendered.get_pixel(30, 30), BLACK);
    }

    #[test]
    fn degenerate_polygon_is_skipped() {
        let line = NormalizedPolygon::new(vec![
            NormalizedPoint { x: 0.1, y: 0.1 },
            NormalizedPoint { x: 0.9, y: 0.9 },
        ]);
        let polygons = [line, NormalizedPolygon::default()];
        let rendered = render_polygons(&black(50, 50), &polygons, Color::AQUA);
        assert!(rendered.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn polygon_off_canvas_does_not_panic() {
        let rendered =
            render_polygons(&black(20, 20), &[square(-1.0, -1.0, 3.0, 3.0)], Color::AQUA);
        assert!(rendered.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn edge_through_off_canvas_vertex_keeps_its_slope() {
        let triangle = NormalizedPolygon::new(vec![
            NormalizedPoint { x: 0.0, y: 0.0 },
            NormalizedPoint { x: 2.0, y: 1.0 },
            NormalizedPoint { x: 0.0, y: 1.0 },
        ]);
        let rendered = render_polygons(&black(100, 100), &[triangle], Color::AQUA);
        let aqua = Rgb([0, 255, 255]);
        assert_eq!(*rendered.get_pixel(50, 25), aqua);
        assert_eq!(*rendered.get_pixel(98, 49), aqua);
        assert_eq!(*rendered.get_pixel(50, 50), BLACK);
        assert_eq!(*rendered.get_pixel(0, 60), aqua);
    }
}
