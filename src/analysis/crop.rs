use image::{DynamicImage, RgbImage};
use tracing::{debug, warn};

use crate::analysis::geometry::map_box;
use crate::config::DedupMode;
use crate::models::BoxGroup;

/// Name of the `index`-th crop, without extension
pub fn element_name(index: usize) -> String {
    format!("element{}", index)
}

/// Groups kept for cropping, in first-seen order
pub fn unique_groups(groups: &[BoxGroup], mode: DedupMode) -> Vec<&BoxGroup> {
    match mode {
        DedupMode::Off => groups.iter().collect(),
        DedupMode::Group => {
            let mut kept: Vec<&BoxGroup> = Vec::new();
            for group in groups {
                if kept.iter().any(|k| k.same_boxes(group)) {
                    debug!(label = %group.label, "Dropping duplicate box group");
                    continue;
                }
                kept.push(group);
            }
            kept
        }
    }
}

/// Crop every box of every retained group from `source`.
///
/// Crops come back in group order then box order, so crop `i` is
/// [`element_name`]`(i)`. Boxes with no area left on the canvas are skipped
/// and take no index.
pub fn crop_groups(source: &DynamicImage, groups: &[BoxGroup], mode: DedupMode) -> Vec<RgbImage> {
    let rgb = source.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut crops = Vec::new();

    for group in unique_groups(groups, mode) {
        for normalized in &group.boxes {
            match map_box(width, height, normalized).to_crop_rect(width, height) {
                Ok(rect) => {
                    let crop =
                        image::imageops::crop_imm(&rgb, rect.x, rect.y, rect.width, rect.height)
                            .to_image();
                    crops.push(crop);
                }
                Err(e) => {
                    warn!(label = %group.label, error = %e, "Skipping crop");
                }
            }
        }
    }

    crops
}
