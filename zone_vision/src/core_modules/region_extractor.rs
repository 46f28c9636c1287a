// THEORY:
// The `RegionExtractor` is the engine of the spatial grouping layer. It takes a
// cleaned binary mask and finds every maximal connected foreground component,
// the Rust counterpart of a contour pass followed by a bounding-rect per contour.
//
// Algorithm steps:
// 1.  **Scan**: Walk the mask in row-major order. Every foreground pixel not yet
//     visited seeds a new component.
// 2.  **Region Growing**: From the seed, a depth-first flood fill collects all
//     foreground pixels reachable through the 8 surrounding neighbors, marking
//     them visited so no pixel joins two components.
// 3.  **Aggregation**: While growing, track the bounding box and the pixel count.
// 4.  **Area Filter**: Components whose pixel count is below `min_area` are
//     noise and are dropped. The comparison is inclusive: a component of exactly
//     `min_area` pixels is kept.
//
// The extractor is a stateless utility. Which components survive the filter is
// deterministic; callers must not rely on the order of the returned list.

use crate::core_modules::color_mask::BinaryMask;
use crate::core_modules::region::{Point, Region};

/// Default minimum component area, in pixels.
pub const DEFAULT_MIN_AREA: usize = 300;

const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Finds all 8-connected components with at least `min_area` pixels.
pub fn extract_regions(mask: &BinaryMask, min_area: usize) -> Vec<Region> {
    let (width, height) = (mask.width, mask.height);
    let mut visited = vec![false; width as usize * height as usize];
    let mut regions = Vec::new();
    let mut stack: Vec<Point> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let seed = y as usize * width as usize + x as usize;
            if visited[seed] || !mask.get(x, y) {
                continue;
            }

            visited[seed] = true;
            stack.push(Point { x, y });
            let region = grow_region(mask, &mut visited, &mut stack);
            if region.area >= min_area {
                regions.push(region);
            }
        }
    }

    regions
}

/// Drains `stack`, flooding one component and returning its summary.
fn grow_region(mask: &BinaryMask, visited: &mut [bool], stack: &mut Vec<Point>) -> Region {
    let (width, height) = (mask.width as i32, mask.height as i32);
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut area = 0usize;

    while let Some(current) = stack.pop() {
        area += 1;
        min_x = min_x.min(current.x);
        min_y = min_y.min(current.y);
        max_x = max_x.max(current.x);
        max_y = max_y.max(current.y);

        for (dx, dy) in NEIGHBORS {
            let nx = current.x as i32 + dx;
            let ny = current.y as i32 + dy;
            if nx < 0 || nx >= width || ny < 0 || ny >= height {
                continue;
            }
            let index = ny as usize * width as usize + nx as usize;
            if !visited[index] && mask.get(nx as u32, ny as u32) {
                visited[index] = true;
                stack.push(Point {
                    x: nx as u32,
                    y: ny as u32,
                });
            }
        }
    }

    Region {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
        area,
    }
}
