use ratatui::layout::Rect;

/// Panel body plus an optional instructions footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogLayout {
    pub content_area: Rect,
    pub instructions_area: Option<Rect>,
}

/// Split `area` so that wrapped `instructions` fit in a bordered footer
pub fn split_dialog_area(area: Rect, instructions: Option<&str>) -> DialogLayout {
    let Some(instructions) = instructions.filter(|s| !s.is_empty()) else {
        return DialogLayout {
            content_area: area,
            instructions_area: None,
        };
    };
    let wrap_width = area.width.saturating_sub(4).max(10) as usize;
    let wrapped_lines = textwrap::wrap(instructions, wrap_width);
    let instructions_height = (wrapped_lines.len() as u16).max(1) + 2;
    let instructions_height = instructions_height.min(area.height);
    DialogLayout {
        content_area: Rect {
            height: area.height - instructions_height,
            ..area
        },
        instructions_area: Some(Rect {
            y: area.y + area.height - instructions_height,
            height: instructions_height,
            ..area
        }),
    }
}

/// Rect of the given percentage size centered in `area`
pub fn centered_rect(percent_w: u16, percent_h: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_w) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_h) / 100) as u16;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_without_instructions() {
        let area = Rect::new(0, 0, 40, 20);
        let layout = split_dialog_area(area, None);
        assert_eq!(layout.content_area, area);
        assert!(layout.instructions_area.is_none());
    }

    #[test]
    fn test_split_wraps_instructions() {
        let area = Rect::new(2, 3, 24, 20);
        let layout = split_dialog_area(area, Some("Enter: apply  Esc: cancel  Tab: next field"));
        let footer = layout.instructions_area.unwrap();
        // 42 characters wrapped to 20 columns take three lines, plus borders.
        assert_eq!(footer.height, 5);
        assert_eq!(footer.bottom(), area.bottom());
        assert_eq!(layout.content_area.height + footer.height, area.height);
    }

    #[test]
    fn test_centered_rect() {
        let rect = centered_rect(50, 50, Rect::new(0, 0, 100, 40));
        assert_eq!(rect, Rect::new(25, 10, 50, 20));
    }
}
