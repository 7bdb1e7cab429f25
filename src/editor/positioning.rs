//! Placement of the floating mirror and composer panels next to the cell
//! being edited.
use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

/// Panel sizes, in terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelGeometry {
    pub composer_width: u16,
    pub composer_max_height: u16,
    /// Columns between the mirror and the composer
    pub gap: u16,
    /// Rows kept free at the top of the viewport when shifting panels up
    pub min_top_margin: u16,
    pub mirror_min_height: u16,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            composer_width: 48,
            composer_max_height: 16,
            gap: 1,
            min_top_margin: 1,
            mirror_min_height: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelPlacement {
    pub mirror: Rect,
    pub composer: Rect,
    pub side: ComposerSide,
}

/// Lay out both panels for `cell` inside `viewport`
pub fn place_panels(cell: Rect, viewport: Rect, geometry: &PanelGeometry) -> PanelPlacement {
    let mirror = clamp_into(
        Rect {
            height: cell.height.max(geometry.mirror_min_height),
            ..cell
        },
        viewport,
        geometry.min_top_margin,
    );

    // Compare doubled centres to stay in integer space.
    let cell_centre = u32::from(cell.x) * 2 + u32::from(cell.width);
    let viewport_centre = u32::from(viewport.x) * 2 + u32::from(viewport.width);
    let side = if cell_centre < viewport_centre {
        ComposerSide::Right
    } else {
        ComposerSide::Left
    };

    let width = geometry.composer_width.min(viewport.width);
    let x = match side {
        ComposerSide::Right => mirror.right().saturating_add(geometry.gap),
        ComposerSide::Left => mirror.x.saturating_sub(geometry.gap).saturating_sub(width),
    };
    let composer = clamp_into(
        Rect::new(x, mirror.y, width, geometry.composer_max_height),
        viewport,
        geometry.min_top_margin,
    );

    PanelPlacement {
        mirror,
        composer,
        side,
    }
}

/// Move and shrink `rect` until it fits inside `viewport`
///
/// Vertical overflow shifts the rect up, but never above `min_top_margin`
/// rows from the top of the viewport; what still does not fit is cut off.
pub fn clamp_into(rect: Rect, viewport: Rect, min_top_margin: u16) -> Rect {
    let width = rect.width.min(viewport.width);
    let max_x = viewport.right().saturating_sub(width);
    let x = rect.x.max(viewport.x).min(max_x);

    let top = viewport.y.saturating_add(min_top_margin).min(viewport.bottom());
    let height = rect.height.min(viewport.bottom() - top);
    let mut y = rect.y.max(viewport.y);
    if y.saturating_add(height) > viewport.bottom() {
        y = viewport.bottom() - height;
        y = y.max(top);
    }

    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VIEWPORT: Rect = Rect {
        x: 0,
        y: 0,
        width: 120,
        height: 40,
    };

    #[test]
    fn composer_goes_right_of_cells_in_left_half() {
        let cell = Rect::new(10, 5, 30, 1);
        let placement = place_panels(cell, VIEWPORT, &PanelGeometry::default());

        assert_eq!(placement.side, ComposerSide::Right);
        assert_eq!(placement.mirror, Rect::new(10, 5, 30, 3));
        assert_eq!(placement.composer, Rect::new(41, 5, 48, 16));
    }

    #[test]
    fn composer_goes_left_of_cells_in_right_half() {
        let cell = Rect::new(80, 5, 30, 1);
        let placement = place_panels(cell, VIEWPORT, &PanelGeometry::default());

        assert_eq!(placement.side, ComposerSide::Left);
        assert_eq!(placement.composer.right() + 1, placement.mirror.x);
        assert_eq!(placement.composer.width, 48);
    }

    #[test]
    fn panels_near_bottom_shift_up_by_overflow() {
        let cell = Rect::new(10, 35, 30, 1);
        let placement = place_panels(cell, VIEWPORT, &PanelGeometry::default());

        assert_eq!(placement.mirror, Rect::new(10, 35, 30, 3));
        // 35 + 16 overflows 40 by 11 rows.
        assert_eq!(placement.composer, Rect::new(41, 24, 48, 16));
    }

    #[test]
    fn tall_panels_are_shortened_below_top_margin() {
        let viewport = Rect::new(0, 0, 120, 10);
        let cell = Rect::new(10, 8, 30, 1);
        let placement = place_panels(cell, viewport, &PanelGeometry::default());

        assert_eq!(placement.composer.y, 1);
        assert_eq!(placement.composer.height, 9);
        assert_eq!(placement.composer.bottom(), viewport.bottom());
    }

    #[test]
    fn panels_stay_inside_narrow_viewports() {
        let viewport = Rect::new(0, 0, 40, 20);
        let cell = Rect::new(2, 2, 10, 1);
        let placement = place_panels(cell, viewport, &PanelGeometry::default());

        assert_eq!(placement.composer.width, 40);
        assert_eq!(placement.composer.x, 0);
        assert!(placement.composer.right() <= viewport.right());
        assert!(placement.mirror.right() <= viewport.right());
    }

    #[test]
    fn geometry_fills_missing_fields_with_defaults() {
        let geometry: PanelGeometry = serde_json::from_str(r#"{"composer_width": 60}"#).unwrap();
        assert_eq!(geometry.composer_width, 60);
        assert_eq!(geometry.composer_max_height, 16);
    }
}
