//! Filter Editor Component
//!
//! Opened over a filter cell of the cohort grid. Shows the whole tree in a
//! mirror panel placed on the cell, and a composer panel beside it for the
//! selected leaf.

use color_eyre::Result;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use serde_json::Value;
use tracing::debug;

use crate::core::{FlattenedItem, Leaf, LeafKind, LogicalOp, Phenotype};
use crate::editor::{FilterEditSession, PanelGeometry, place_panels};
use crate::tui::components::composer::{Composer, FieldKind};
use crate::tui::components::filter_cell::filter_line;
use crate::tui::layout::split_dialog_area;
use crate::tui::{Action, Component, Theme};

const NAVIGATE_HINTS: &str =
    "←/→ select  a/o add AND/OR  e edit  t toggle  d delete  Enter commit  Esc cancel";
const COMPOSE_HINTS: &str =
    "Tab/↑↓ field  ←/→ change  Ctrl+k kind  Enter apply  Esc back";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Navigate,
    Compose,
}

/// How an edit ended
#[derive(Debug, Clone, PartialEq)]
pub enum EditorOutcome {
    Committed { phenotype_id: String, value: Value },
    Cancelled,
}

pub struct FilterEditor {
    phenotype_id: String,
    title: String,
    session: FilterEditSession,
    mode: EditorMode,
    composer: Option<Composer>,
    error: Option<String>,
    /// Where the edited cell was drawn
    cell: Rect,
    geometry: PanelGeometry,
    phenotypes: Vec<(String, String)>,
    theme: Theme,
    outcome: Option<EditorOutcome>,
}

impl FilterEditor {
    /// Open an editor on a phenotype's filter cell, selecting the leaf at `hint`
    pub fn open(
        phenotype: &Phenotype,
        hint: Option<usize>,
        cell: Rect,
        geometry: PanelGeometry,
        phenotypes: Vec<(String, String)>,
        theme: Theme,
    ) -> Self {
        debug!("Opening filter editor for {} (hint {hint:?})", phenotype.id);
        Self {
            phenotype_id: phenotype.id.clone(),
            title: phenotype.name.clone(),
            session: FilterEditSession::open(Some(&phenotype.categorical_filter), hint),
            mode: EditorMode::Navigate,
            composer: None,
            error: None,
            cell,
            geometry,
            phenotypes,
            theme,
            outcome: None,
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn session(&self) -> &FilterEditSession {
        &self.session
    }

    pub fn set_cell(&mut self, cell: Rect) {
        self.cell = cell;
    }

    /// Outcome once the edit is over; the editor should then be dropped
    pub fn take_outcome(&mut self) -> Option<EditorOutcome> {
        self.outcome.take()
    }

    /// Edits that would be lost if the editor closed now
    pub fn has_pending_changes(&self) -> bool {
        self.session.is_dirty() || self.composer.is_some()
    }

    /// Whether plain characters should be typed into the composer
    pub fn is_capturing_text(&self) -> bool {
        self.mode == EditorMode::Compose
            && self.composer.as_ref().is_some_and(Composer::accepts_text)
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(composer) = &mut self.composer {
            composer.insert_char(c);
            self.error = composer.build().err();
        }
    }

    pub fn backspace(&mut self) {
        if let Some(composer) = &mut self.composer {
            composer.backspace();
            self.error = composer.build().err();
        }
    }

    fn start_composing(&mut self) {
        if let Some(leaf) = self.session.selected_leaf() {
            self.composer = Some(Composer::new(leaf, self.phenotypes.clone()));
            self.mode = EditorMode::Compose;
            self.error = None;
        }
    }

    fn add_leaf(&mut self, op: LogicalOp) {
        self.session.add_filter(op, Leaf::new(LeafKind::Categorical));
        self.start_composing();
    }

    /// Operator after the selected leaf, or the one before it for the last leaf
    fn adjacent_operator(&self) -> Option<usize> {
        let items = self.session.items();
        let selected = self.session.selection().selected_leaf_index?;
        let operators = items.iter().filter(|i| i.is_operator()).map(FlattenedItem::ordinal);
        let mut before = None;
        for ordinal in operators {
            if ordinal > selected {
                return Some(ordinal);
            }
            before = Some(ordinal);
        }
        before
    }

    fn apply_composer(&mut self) {
        let Some(composer) = &self.composer else {
            return;
        };
        match composer.build() {
            Ok(leaf) => {
                self.session.update_selected_leaf(leaf);
                self.composer = None;
                self.error = None;
                self.mode = EditorMode::Navigate;
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn handle_navigate(&mut self, action: Action) -> bool {
        match action {
            Action::MoveLeft | Action::MoveUp => self.session.select_prev(),
            Action::MoveRight | Action::MoveDown => self.session.select_next(),
            Action::AddAndFilter => self.add_leaf(LogicalOp::And),
            Action::AddOrFilter => self.add_leaf(LogicalOp::Or),
            Action::EditFilter | Action::NextField => self.start_composing(),
            Action::ToggleOperator => {
                if let Some(ordinal) = self.adjacent_operator() {
                    self.session.toggle_operator(ordinal);
                }
            }
            Action::DeleteFilter => {
                self.session.delete_selected();
            }
            Action::Confirm => {
                self.outcome = Some(if self.session.is_dirty() {
                    debug!("Committing filter for {}", self.phenotype_id);
                    EditorOutcome::Committed {
                        phenotype_id: self.phenotype_id.clone(),
                        value: self.session.clone().commit(),
                    }
                } else {
                    // The stored cell is left byte-for-byte as it was.
                    debug!("Filter for {} unchanged", self.phenotype_id);
                    EditorOutcome::Cancelled
                });
                self.session.dismiss();
            }
            Action::Cancel => {
                self.session.dismiss();
                self.outcome = Some(EditorOutcome::Cancelled);
            }
            _ => return false,
        }
        true
    }

    fn handle_compose(&mut self, action: Action) -> bool {
        let Some(composer) = &mut self.composer else {
            self.mode = EditorMode::Navigate;
            return false;
        };
        match action {
            Action::NextField | Action::MoveDown => composer.next_field(),
            Action::PrevField | Action::MoveUp => composer.prev_field(),
            Action::MoveLeft => composer.cycle_value(false),
            Action::MoveRight => composer.cycle_value(true),
            Action::CycleLeafKind => composer.cycle_kind(),
            Action::Confirm => {
                self.apply_composer();
                return true;
            }
            Action::Cancel => {
                self.composer = None;
                self.error = None;
                self.mode = EditorMode::Navigate;
                return true;
            }
            _ => return false,
        }
        self.error = composer.build().err();
        true
    }

    fn render_mirror(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(self.theme.focused_border_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let items = self.session.items();
        let selected = self.session.selection().selected_leaf_index;
        let line = filter_line(&items, selected, &self.theme);
        frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: false }), inner);
    }

    fn render_composer(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        let focused = self.mode == EditorMode::Compose;
        let title = match &self.composer {
            Some(composer) => format!(" {} filter ", composer.kind()),
            None => " Filter ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused {
                self.theme.focused_border_style()
            } else {
                self.theme.border_style()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let hints = if focused { COMPOSE_HINTS } else { NAVIGATE_HINTS };
        let layout = split_dialog_area(inner, Some(hints));

        let lines = match &self.composer {
            Some(composer) => self.composer_lines(composer),
            None => self.selection_lines(),
        };
        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }),
            layout.content_area,
        );

        if let Some(footer) = layout.instructions_area {
            let hints_block = Block::default()
                .borders(Borders::TOP)
                .border_style(self.theme.border_style());
            frame.render_widget(
                Paragraph::new(hints)
                    .block(hints_block)
                    .style(self.theme.paren_style())
                    .wrap(Wrap { trim: true }),
                footer,
            );
        }
    }

    fn composer_lines(&self, composer: &Composer) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = composer
            .fields()
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let active = i == composer.active_field();
                let marker = if active { "> " } else { "  " };
                let value = composer.value(i).to_string();
                let value = match spec.kind {
                    FieldKind::Choice(_) => format!("‹ {value} ›"),
                    _ if active => format!("{value}_"),
                    _ => value,
                };
                let value_style = if active {
                    self.theme.selected_style()
                } else {
                    self.theme.normal_style()
                };
                Line::from(vec![
                    Span::raw(marker),
                    Span::styled(
                        format!("{:<10}", spec.label),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(value, value_style),
                ])
            })
            .collect();

        lines.push(Line::default());
        match (&self.error, composer.build()) {
            (Some(error), _) => {
                lines.push(Line::from(Span::styled(error.clone(), self.theme.error_style())));
            }
            (None, Ok(leaf)) => {
                lines.push(Line::from(vec![
                    Span::styled(leaf.summary(), self.theme.leaf_style(leaf.status())),
                    Span::raw(format!("  [{}]", leaf.status())),
                ]));
            }
            (None, Err(e)) => {
                lines.push(Line::from(Span::styled(e, self.theme.error_style())));
            }
        }
        lines
    }

    fn selection_lines(&self) -> Vec<Line<'static>> {
        let Some(leaf) = self.session.selected_leaf() else {
            return vec![Line::from(Span::styled(
                "No filter selected. Press a or o to add one.",
                self.theme.paren_style(),
            ))];
        };
        vec![
            Line::from(Span::styled(
                leaf.kind().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(leaf.summary(), self.theme.leaf_style(leaf.status()))),
            Line::from(format!("status: {}", leaf.status())),
        ]
    }
}

impl Component for FilterEditor {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        let handled = match self.mode {
            EditorMode::Navigate => self.handle_navigate(action),
            EditorMode::Compose => self.handle_compose(action),
        };
        Ok(handled)
    }

    /// `area` is the whole viewport; panels are placed relative to the cell
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let placement = place_panels(self.cell, area, &self.geometry);
        self.render_mirror(frame, placement.mirror);
        self.render_composer(frame, placement.composer);
    }

    fn supported_actions(&self) -> &[Action] {
        match self.mode {
            EditorMode::Navigate => &[
                Action::MoveLeft,
                Action::MoveRight,
                Action::MoveUp,
                Action::MoveDown,
                Action::AddAndFilter,
                Action::AddOrFilter,
                Action::EditFilter,
                Action::NextField,
                Action::ToggleOperator,
                Action::DeleteFilter,
                Action::Confirm,
                Action::Cancel,
            ],
            EditorMode::Compose => &[
                Action::NextField,
                Action::PrevField,
                Action::MoveUp,
                Action::MoveDown,
                Action::MoveLeft,
                Action::MoveRight,
                Action::CycleLeafKind,
                Action::Confirm,
                Action::Cancel,
            ],
        }
    }

    fn name(&self) -> &str {
        "FilterEditor"
    }
}
