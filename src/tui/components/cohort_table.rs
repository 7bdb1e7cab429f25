use crate::core::Phenotype;
use crate::services::CohortStore;
use crate::tui::components::filter_cell::filter_line;
use crate::tui::{Action, Component, Focusable, Theme};
use color_eyre::Result;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Cell, Row, Table},
};

const WIDTHS: [Constraint; 4] = [
    Constraint::Length(10),
    Constraint::Length(22),
    Constraint::Length(22),
    Constraint::Fill(1),
];
const FILTER_COLUMN: usize = 3;

/// The hosting grid: one row per phenotype, with the filter cell rendered
/// from the flattened tree
///
/// Left/Right move a leaf cursor inside the selected row's filter cell. The
/// leaf under that cursor is the hint passed to the editor when it opens.
pub struct CohortTable {
    store: CohortStore,
    rows: Vec<Phenotype>,
    title: String,
    cursor_row: usize,
    /// Position among the selected row's leaves, not a token ordinal
    leaf_cursor: Option<usize>,
    top: usize,
    height: usize,
    /// Inner table area from the last render
    inner: Rect,
    focused: bool,
    theme: Theme,
}

impl CohortTable {
    pub fn new(store: CohortStore, theme: Theme) -> Result<Self> {
        let mut table = Self {
            store,
            rows: Vec::new(),
            title: String::new(),
            cursor_row: 0,
            leaf_cursor: None,
            top: 0,
            height: 20,
            inner: Rect::default(),
            focused: true,
            theme,
        };
        table.refresh()?;
        Ok(table)
    }

    /// Re-read rows from the store, keeping the cursor in range
    pub fn refresh(&mut self) -> Result<()> {
        let cohort = self.store.cohort()?;
        let dirty = if self.store.is_dirty()? { " *" } else { "" };
        self.title = format!(" {}{dirty} ", cohort.name);
        self.rows = cohort.rows().into_iter().cloned().collect();
        self.cursor_row = self.cursor_row.min(self.rows.len().saturating_sub(1));
        self.clamp_leaf_cursor();
        self.ensure_cursor_visible();
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn selected_phenotype(&self) -> Option<&Phenotype> {
        self.rows.get(self.cursor_row)
    }

    /// Ordinal of the leaf under the leaf cursor, if any
    pub fn hint(&self) -> Option<usize> {
        let position = self.leaf_cursor?;
        let tree = self.selected_phenotype()?.filter_tree();
        let items = tree.flatten();
        crate::core::flatten::leaf_ordinals(&items).get(position).copied()
    }

    /// (id, name) of every phenotype, for phenotype references
    pub fn phenotype_choices(&self) -> Vec<(String, String)> {
        self.rows
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect()
    }

    /// Screen rect of the selected row's filter cell, from the last render
    pub fn selected_cell_rect(&self) -> Rect {
        let columns = Layout::horizontal(WIDTHS).spacing(1).split(self.inner);
        let column = columns[FILTER_COLUMN];
        let offset = self.cursor_row.saturating_sub(self.top) as u16;
        Rect {
            x: column.x,
            // Header row sits above the first data row.
            y: self.inner.y.saturating_add(1).saturating_add(offset),
            width: column.width,
            height: 1,
        }
    }

    fn leaf_count(&self) -> usize {
        self.selected_phenotype()
            .map_or(0, |p| p.filter_tree().leaf_count())
    }

    fn clamp_leaf_cursor(&mut self) {
        let count = self.leaf_count();
        self.leaf_cursor = match self.leaf_cursor {
            Some(_) if count == 0 => None,
            Some(position) => Some(position.min(count - 1)),
            None => None,
        };
    }

    fn ensure_cursor_visible(&mut self) {
        let height = self.height.max(1);
        if self.cursor_row < self.top {
            self.top = self.cursor_row;
        } else if self.cursor_row >= self.top + height {
            self.top = self.cursor_row + 1 - height;
        }
    }

    fn move_to_row(&mut self, row: usize) {
        let last = self.rows.len().saturating_sub(1);
        let row = row.min(last);
        if row != self.cursor_row {
            self.cursor_row = row;
            self.leaf_cursor = None;
        }
        self.ensure_cursor_visible();
    }

    fn move_leaf_cursor(&mut self, forward: bool) {
        let count = self.leaf_count();
        if count == 0 {
            self.leaf_cursor = None;
            return;
        }
        self.leaf_cursor = match (self.leaf_cursor, forward) {
            (None, true) => Some(0),
            (None, false) => Some(count - 1),
            (Some(p), true) if p + 1 < count => Some(p + 1),
            (Some(p), false) if p > 0 => Some(p - 1),
            // Stepping off either end leaves the cell unselected.
            (Some(_), _) => None,
        };
    }

    fn render_row(&self, index: usize, phenotype: &Phenotype) -> Row<'static> {
        let tree = phenotype.filter_tree();
        let items = tree.flatten();
        let selected = if index == self.cursor_row {
            self.leaf_cursor
                .and_then(|p| crate::core::flatten::leaf_ordinals(&items).get(p).copied())
        } else {
            None
        };
        let filter: Line<'static> = filter_line(&items, selected, &self.theme);

        let style = if index == self.cursor_row && self.focused {
            self.theme.selected_style()
        } else if index % 2 == 1 {
            self.theme.alt_row_style()
        } else {
            self.theme.normal_style()
        };
        Row::new(vec![
            Cell::from(phenotype.section.to_string()),
            Cell::from(phenotype.name.clone()),
            Cell::from(phenotype.class_name.clone()),
            Cell::from(filter),
        ])
        .style(style)
    }
}

impl Component for CohortTable {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::MoveUp => self.move_to_row(self.cursor_row.saturating_sub(1)),
            Action::MoveDown => self.move_to_row(self.cursor_row + 1),
            Action::PageUp => self.move_to_row(self.cursor_row.saturating_sub(self.height)),
            Action::PageDown => self.move_to_row(self.cursor_row + self.height),
            Action::GoToTop => self.move_to_row(0),
            Action::GoToBottom => self.move_to_row(self.rows.len()),
            Action::MoveLeft => self.move_leaf_cursor(false),
            Action::MoveRight => self.move_leaf_cursor(true),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(if self.focused {
                self.theme.focused_border_style()
            } else {
                self.theme.border_style()
            });
        self.inner = block.inner(area);
        // -1 for the header row
        self.height = self.inner.height.saturating_sub(1).max(1) as usize;
        self.ensure_cursor_visible();

        let header = Row::new(vec!["Section", "Name", "Type", "Filter"])
            .style(self.theme.header_style());
        let rows: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .skip(self.top)
            .take(self.height)
            .map(|(i, p)| self.render_row(i, p))
            .collect();

        let table = Table::new(rows, WIDTHS)
            .header(header)
            .column_spacing(1)
            .block(block);
        frame.render_widget(table, area);
    }

    fn supported_actions(&self) -> &[Action] {
        &[
            Action::MoveUp,
            Action::MoveDown,
            Action::MoveLeft,
            Action::MoveRight,
            Action::PageUp,
            Action::PageDown,
            Action::GoToTop,
            Action::GoToBottom,
        ]
    }

    fn name(&self) -> &str {
        "CohortTable"
    }
}

impl Focusable for CohortTable {
    fn is_focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}
