//! Region extraction
//!
//! Finds blobs in the counter mask, pads their bounding boxes and merges
//! touching boxes into item-card candidates.
//!
//! Merging is single-linkage clustering over the "projections overlap on
//! both axes" relation, repeated until a pass merges nothing: the union of
//! a group can reach a box that none of its members touched.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::point::Point;
use std::collections::HashMap;
use tracing::debug;

use crate::config::VisionSettings;

/// Axis-aligned rectangle in mask coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the last column
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the last row
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Projections overlap on both axes; rectangles sharing an edge count
    pub fn intersects(&self, other: &Rect) -> bool {
        spans_overlap(self.x, self.right(), other.x, other.right())
            && spans_overlap(self.y, self.bottom(), other.y, other.bottom())
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Whether the rectangle lies inside a `width`x`height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width >= 0
            && self.height >= 0
            && self.right() as i64 <= width as i64
            && self.bottom() as i64 <= height as i64
    }
}

fn spans_overlap(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    if a_start <= b_start {
        a_end >= b_start
    } else {
        b_end >= a_start
    }
}

/// Bounding rectangle of a contour, inclusive of its last pixel
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Widen by the height and stretch the height by `height_padding`.
///
/// Both dimensions are clamped to the mask's column count, the height
/// included.
pub fn pad_rect(rect: Rect, columns: i32, height_padding: f32) -> Rect {
    let width = (rect.width + rect.height).min(columns);
    let height = ((rect.height as f32 * height_padding) as i32).min(columns);
    clamp_to_columns(Rect { width, height, ..rect }, columns)
}

/// Clamp width and height to `columns`. Unions of padded rects need this again.
pub fn clamp_to_columns(rect: Rect, columns: i32) -> Rect {
    Rect {
        width: rect.width.min(columns),
        height: rect.height.min(columns),
        ..rect
    }
}

/// Minimal union-find over rectangle indices
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index stays root so groups keep their first member's slot
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

/// Group every pair of touching rectangles once and materialize one union per group.
///
/// Groups are emitted in order of their first member.
pub fn merge_pass(rects: &[Rect]) -> Vec<Rect> {
    let mut sets = DisjointSet::new(rects.len());
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].intersects(&rects[j]) {
                sets.union(i, j);
            }
        }
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut merged: Vec<Rect> = Vec::new();
    for (i, rect) in rects.iter().enumerate() {
        let root = sets.find(i);
        match slot_of_root.get(&root) {
            Some(&slot) => merged[slot] = merged[slot].union(rect),
            None => {
                slot_of_root.insert(root, merged.len());
                merged.push(*rect);
            }
        }
    }
    merged
}

/// Repeat `merge_pass` until it stops merging
pub fn merge_rects(mut rects: Vec<Rect>) -> Vec<Rect> {
    loop {
        let merged = merge_pass(&rects);
        if merged.len() == rects.len() {
            return merged;
        }
        rects = merged;
    }
}

/// Turns a counter mask into item-card rectangles
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    height_padding: f32,
    min_area: i64,
}

impl RegionExtractor {
    pub fn new(params: &VisionSettings) -> Self {
        Self {
            height_padding: params.height_padding,
            min_area: params.min_area as i64,
        }
    }

    pub fn extract(&self, counters: &GrayImage) -> Vec<Rect> {
        let columns = counters.width() as i32;

        let padded: Vec<Rect> = find_contours::<i32>(counters)
            .iter()
            .filter_map(|contour| bounding_rect(&contour.points))
            .map(|rect| pad_rect(rect, columns, self.height_padding))
            .collect();
        let contour_count = padded.len();

        let merged = merge_rects(padded);
        let merged_count = merged.len();

        let kept: Vec<Rect> = merged
            .into_iter()
            .map(|r| clamp_to_columns(r, columns))
            .filter(|r| r.area() > self.min_area)
            .collect();

        debug!(
            "Region extraction: {} contours -> {} merged -> {} kept",
            contour_count,
            merged_count,
            kept.len()
        );

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                mask.put_pixel(xx, yy, Luma([255]));
            }
        }
    }

    #[test]
    fn test_touching_edges_intersect() {
        let a = Rect::new(0, 0, 50, 40);
        let b = Rect::new(50, 0, 30, 40);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert_eq!(merge_rects(vec![a, b]), vec![Rect::new(0, 0, 80, 40)]);
    }

    #[test]
    fn test_separated_rects_stay_apart() {
        let a = Rect::new(0, 0, 50, 40);
        let b = Rect::new(51, 0, 30, 40);
        let c = Rect::new(0, 41, 50, 10);

        assert!(!a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(merge_rects(vec![a, b, c]), vec![a, b, c]);
    }

    #[test]
    fn test_overlap_on_one_axis_only_is_not_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 30, 10, 10);

        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_chain_merges_transitively() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(8, 0, 10, 10);
        let c = Rect::new(16, 0, 10, 10);

        assert!(!a.intersects(&c));
        assert_eq!(merge_rects(vec![a, c, b]), vec![Rect::new(0, 0, 26, 10)]);
    }

    #[test]
    fn test_union_reaching_new_rect_needs_second_pass() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 10, 10, 10);
        let c = Rect::new(15, 0, 10, 5);

        // c touches neither member, only their union
        assert!(!c.intersects(&a));
        assert!(!c.intersects(&b));
        assert_eq!(merge_pass(&[a, b, c]).len(), 2);

        assert_eq!(merge_rects(vec![a, b, c]), vec![Rect::new(0, 0, 25, 20)]);
    }

    #[test]
    fn test_merge_reaches_fixpoint() {
        let rects = vec![
            Rect::new(0, 0, 10, 10),
            Rect::new(100, 100, 5, 5),
            Rect::new(10, 10, 10, 10),
            Rect::new(15, 0, 10, 5),
            Rect::new(60, 0, 10, 10),
            Rect::new(103, 90, 4, 12),
        ];

        let merged = merge_rects(rects);

        assert_eq!(merge_pass(&merged), merged);
        for (i, a) in merged.iter().enumerate() {
            for b in merged.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{:?} and {:?} should have merged", a, b);
            }
        }
    }

    #[test]
    fn test_merge_keeps_first_member_order() {
        let a = Rect::new(200, 0, 10, 10);
        let b = Rect::new(0, 0, 10, 10);
        let c = Rect::new(205, 5, 10, 10);

        assert_eq!(
            merge_rects(vec![a, b, c]),
            vec![Rect::new(200, 0, 15, 15), b]
        );
    }

    #[test]
    fn test_pad_rect_widens_by_height() {
        let padded = pad_rect(Rect::new(10, 10, 40, 50), 1000, 1.2);

        assert_eq!(padded, Rect::new(10, 10, 90, 60));
    }

    #[test]
    fn test_pad_rect_clamps_height_to_columns() {
        // Tall narrow mask: the height is bounded by the column count, not the row count
        let padded = pad_rect(Rect::new(0, 0, 5, 100), 20, 1.2);

        assert_eq!(padded.width, 20);
        assert_eq!(padded.height, 20);
    }

    #[test]
    fn test_bounding_rect_is_inclusive() {
        let points = vec![Point::new(3, 4), Point::new(7, 4), Point::new(7, 9), Point::new(3, 9)];

        assert_eq!(bounding_rect(&points), Some(Rect::new(3, 4, 5, 6)));
        assert_eq!(bounding_rect(&[]), None);
    }

    #[test]
    fn test_extract_single_blob() {
        let mut mask = GrayImage::new(200, 120);
        fill(&mut mask, 10, 10, 40, 50);

        let rects = RegionExtractor::new(&VisionSettings::default()).extract(&mask);

        assert_eq!(rects, vec![Rect::new(10, 10, 90, 60)]);
    }

    #[test]
    fn test_extract_merges_blobs_whose_padding_touches() {
        let mut mask = GrayImage::new(200, 120);
        // Padded widths are 20 + 20, so the first box ends exactly where the second starts
        fill(&mut mask, 10, 10, 20, 20);
        fill(&mut mask, 50, 10, 20, 20);

        let rects = RegionExtractor::new(&VisionSettings::default()).extract(&mask);

        assert_eq!(rects, vec![Rect::new(10, 10, 80, 24)]);
    }

    #[test]
    fn test_extract_drops_small_regions() {
        let mut mask = GrayImage::new(200, 120);
        // 10x10 pads to 20x12 = 240
        fill(&mut mask, 5, 5, 10, 10);
        // 20x20 pads to 40x24 = 960
        fill(&mut mask, 100, 5, 20, 20);
        // 30x30 pads to 60x36 = 2160
        fill(&mut mask, 100, 60, 30, 30);

        let params = VisionSettings::default();
        let rects = RegionExtractor::new(&params).extract(&mask);

        assert_eq!(rects, vec![Rect::new(100, 60, 60, 36)]);
        assert!(rects.iter().all(|r| r.area() > params.min_area as i64));
    }

    #[test]
    fn test_extract_output_never_wider_than_mask() {
        let mut mask = GrayImage::new(60, 200);
        fill(&mut mask, 30, 10, 25, 150);

        let rects = RegionExtractor::new(&VisionSettings::default()).extract(&mask);

        assert_eq!(rects.len(), 1);
        assert!(rects.iter().all(|r| r.width <= 60 && r.height <= 60));
    }

    #[test]
    fn test_merged_card_is_clamped_to_mask_width() {
        let mut mask = GrayImage::new(100, 200);
        // Each pads to 90x96; the union would span 150 columns
        fill(&mut mask, 0, 10, 10, 80);
        fill(&mut mask, 60, 10, 10, 80);

        let rects = RegionExtractor::new(&VisionSettings::default()).extract(&mask);

        assert_eq!(rects, vec![Rect::new(0, 10, 100, 96)]);
        assert!(rects.iter().all(|r| r.width <= 100 && r.height <= 100));
        assert_eq!(crate::vision::produce_cuts(&rects, &mask).len(), 1);
    }

    #[test]
    fn test_clamp_to_columns() {
        assert_eq!(
            clamp_to_columns(Rect::new(5, 7, 150, 120), 100),
            Rect::new(5, 7, 100, 100)
        );
        assert_eq!(
            clamp_to_columns(Rect::new(5, 7, 50, 20), 100),
            Rect::new(5, 7, 50, 20)
        );
    }

    #[test]
    fn test_fits_within() {
        assert!(Rect::new(0, 0, 10, 10).fits_within(10, 10));
        assert!(!Rect::new(1, 0, 10, 10).fits_within(10, 10));
        assert!(!Rect::new(-1, 0, 5, 5).fits_within(10, 10));
    }
}
