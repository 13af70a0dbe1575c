//! Square atlas layout: two triangles per grid cell.

/// Per-corner UVs for `count` triangles.
///
/// Cells are laid out row by row. The first triangle of a cell occupies
/// its lower-left half, the second its upper-right half, with a gap along
/// the diagonal and a margin at the cell border so that filtering never
/// bleeds between neighbours.
pub fn layout_triangles(count: usize) -> Vec<[[f64; 2]; 3]> {
    if count == 0 {
        return Vec::new();
    }
    let cells_needed = count.div_ceil(2);
    let cells = (cells_needed as f64).sqrt().ceil() as usize;
    let size = 1.0 / cells as f64;
    let margin = size * 0.08;

    (0..count)
        .map(|i| {
            let cell = i / 2;
            let x0 = (cell % cells) as f64 * size;
            let y0 = (cell / cells) as f64 * size;
            let (x1, y1) = (x0 + size, y0 + size);
            if i % 2 == 0 {
                [
                    [x0 + margin, y0 + margin],
                    [x1 - 2.0 * margin, y0 + margin],
                    [x0 + margin, y1 - 2.0 * margin],
                ]
            } else {
                [
                    [x1 - margin, y1 - margin],
                    [x0 + 2.0 * margin, y1 - margin],
                    [x1 - margin, y0 + 2.0 * margin],
                ]
            }
        })
        .collect()
}
