use crate::config::Config;
use crate::core::CohortError;
use crate::editor::PanelGeometry;
use crate::services::{CohortStore, StoreEvent};
use crate::tui::components::{CohortTable, EditorOutcome, FilterEditor};
use crate::tui::layout::centered_rect;
use crate::tui::{Action, ActionCategory, Component, Focusable, KeyBindings, Theme};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

const GRID_HINTS: &str = "Enter edit filter  ←/→ pick leaf  Ctrl+s save  ? help  q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Info(String),
    Error(String),
}

/// Application state
///
/// Owns the cohort grid and, while a filter cell is being edited, the
/// filter editor drawn over it. Store events refresh the grid.
pub struct App {
    store: CohortStore,
    events: UnboundedReceiver<StoreEvent>,
    table: CohortTable,
    editor: Option<FilterEditor>,
    keybindings: KeyBindings,
    theme: Theme,
    geometry: PanelGeometry,
    show_help: bool,
    status: Option<Status>,
    /// Set by the first quit with unsaved changes
    quit_armed: bool,
    should_quit: bool,
}

impl App {
    pub fn new(store: CohortStore, config: &Config) -> Result<Self> {
        let theme = config.theme();
        let events = store.subscribe()?;
        let mut table = CohortTable::new(store.clone(), theme.clone())?;
        table.set_focused(true);

        let keybindings = config.keybindings();
        for problem in keybindings.validate() {
            warn!("Keybinding issue: {problem}");
        }

        Ok(Self {
            store,
            events,
            table,
            editor: None,
            keybindings,
            theme,
            geometry: config.editor,
            show_help: false,
            status: None,
            quit_armed: false,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn table(&self) -> &CohortTable {
        &self.table
    }

    pub fn editor(&self) -> Option<&FilterEditor> {
        self.editor.as_ref()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn status_message(&self) -> Option<&str> {
        match &self.status {
            Some(Status::Info(m) | Status::Error(m)) => Some(m),
            None => None,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Text fields of the composer take plain characters before keybindings.
        if let Some(editor) = &mut self.editor {
            if editor.is_capturing_text() {
                match key.code {
                    KeyCode::Char(c)
                        if !key
                            .modifiers
                            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                    {
                        editor.insert_char(c);
                        return Ok(());
                    }
                    KeyCode::Backspace => {
                        editor.backspace();
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        if let Some(action) = self.keybindings.get_action(&key) {
            self.handle_action(action)?;
        }
        Ok(())
    }

    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        if self.show_help {
            match action {
                Action::ToggleHelp | Action::Cancel | Action::Confirm => self.show_help = false,
                Action::Quit => self.request_quit()?,
                _ => {}
            }
            return Ok(());
        }
        if action != Action::Quit {
            self.quit_armed = false;
        }

        if let Some(editor) = &mut self.editor {
            if editor.handle_action(action)? {
                return self.finish_edit();
            }
        }

        match action {
            Action::Quit => self.request_quit()?,
            Action::Save => self.save(),
            Action::ToggleHelp => self.show_help = true,
            // The grid stays put while an editor is open over it.
            _ if self.editor.is_some() => {}
            Action::Confirm | Action::EditFilter => self.open_editor(),
            Action::Cancel => self.status = None,
            other => {
                self.table.handle_action(other)?;
            }
        }
        Ok(())
    }

    /// Apply pending store events to the grid
    pub fn update(&mut self) -> Result<()> {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            debug!("Store event: {event:?}");
            changed = true;
        }
        if changed {
            self.table.refresh()?;
        }
        Ok(())
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [grid_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);

        self.table.render(frame, grid_area);
        if let Some(editor) = &mut self.editor {
            editor.set_cell(self.table.selected_cell_rect());
            editor.render(frame, grid_area);
        }
        self.render_status(frame, status_area);
        if self.show_help {
            self.render_help(frame);
        }
    }

    fn open_editor(&mut self) {
        let Some(phenotype) = self.table.selected_phenotype() else {
            return;
        };
        let editor = FilterEditor::open(
            phenotype,
            self.table.hint(),
            self.table.selected_cell_rect(),
            self.geometry,
            self.table.phenotype_choices(),
            self.theme.clone(),
        );
        self.table.set_focused(false);
        self.editor = Some(editor);
        self.status = None;
    }

    fn finish_edit(&mut self) -> Result<()> {
        let Some(outcome) = self.editor.as_mut().and_then(FilterEditor::take_outcome) else {
            return Ok(());
        };
        self.editor = None;
        self.table.set_focused(true);
        match outcome {
            EditorOutcome::Committed {
                phenotype_id,
                value,
            } => {
                if let Err(e) = self.store.set_filter(&phenotype_id, value) {
                    warn!("Failed to store filter for {phenotype_id}: {e}");
                    self.status = Some(Status::Error(e.to_string()));
                }
                self.update()?;
            }
            EditorOutcome::Cancelled => debug!("Filter edit cancelled"),
        }
        Ok(())
    }

    fn save(&mut self) {
        self.status = Some(match self.store.save() {
            Ok(path) => {
                info!("Saved cohort to {}", path.display());
                Status::Info(format!("Saved to {}", path.display()))
            }
            Err(CohortError::NoPath) => {
                Status::Error("No file to save to; pass a cohort path on the command line".into())
            }
            Err(e) => Status::Error(format!("Save failed: {e}")),
        });
    }

    fn request_quit(&mut self) -> Result<()> {
        if self.quit_armed {
            self.should_quit = true;
            return Ok(());
        }
        let editing = self.editor.as_ref().is_some_and(FilterEditor::has_pending_changes);
        let message = if editing {
            "Uncommitted filter edit: press q again to discard it"
        } else if self.store.is_dirty()? {
            "Unsaved changes: press q again to quit, Ctrl+s to save"
        } else {
            self.should_quit = true;
            return Ok(());
        };
        self.quit_armed = true;
        self.status = Some(Status::Info(message.into()));
        Ok(())
    }

    fn render_status(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let line = match &self.status {
            Some(Status::Info(m)) => Line::from(Span::styled(m.clone(), self.theme.success_style())),
            Some(Status::Error(m)) => Line::from(Span::styled(m.clone(), self.theme.error_style())),
            None => Line::from(Span::styled(GRID_HINTS, self.theme.normal_style())),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_help(&self, frame: &mut Frame) {
        let area = centered_rect(60, 80, frame.area());
        let categories = [
            ActionCategory::Navigation,
            ActionCategory::Editing,
            ActionCategory::FileOps,
            ActionCategory::View,
            ActionCategory::Application,
        ];
        let mut lines = Vec::new();
        for category in categories {
            lines.push(Line::from(Span::styled(
                category.to_string(),
                self.theme.header_style(),
            )));
            for action in Action::all().into_iter().filter(|a| a.category() == category) {
                let keys = self.keybindings.get_keys_for_action(action);
                if keys.is_empty() {
                    continue;
                }
                lines.push(Line::from(format!(
                    "  {:<18} {}",
                    keys.join(", "),
                    action.description()
                )));
            }
        }
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .title(" Keys ")
                    .borders(Borders::ALL)
                    .border_style(self.theme.focused_border_style()),
            ),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Cohort, CohortSection, Phenotype};
    use crate::tui::components::EditorMode;
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, codes: &[KeyCode]) {
        for code in codes {
            app.handle_key_event(key(*code)).unwrap();
        }
    }

    fn cohort() -> Cohort {
        let mut cohort = Cohort::new("c1", "Study");
        cohort.phenotypes = vec![Phenotype {
            id: "p1".into(),
            name: "Adults".into(),
            class_name: "AgePhenotype".into(),
            section: CohortSection::Inclusion,
            categorical_filter: json!({
                "class_name": "CategoricalFilter",
                "column_name": "age",
                "allowed_values": ["18-65"],
                "operator": "isin",
                "status": "complete"
            }),
        }];
        cohort
    }

    fn app_with_file() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cohort.json");
        cohort().save(&path).unwrap();
        let store = CohortStore::open(&path).unwrap();
        (App::new(store, &Config::default()).unwrap(), dir)
    }

    #[test]
    fn test_quit_without_changes() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Char('q')]);
        assert!(app.should_quit());
    }

    #[test]
    fn test_enter_opens_editor_on_hinted_leaf() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Right, KeyCode::Enter]);
        let editor = app.editor().unwrap();
        assert_eq!(editor.mode(), EditorMode::Navigate);
        assert_eq!(editor.session().selection().selected_leaf_index, Some(0));
    }

    #[test]
    fn test_add_filter_and_commit_updates_grid() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('a')]);
        assert_eq!(app.editor().unwrap().mode(), EditorMode::Compose);

        // Column field captures text.
        press(
            &mut app,
            &[KeyCode::Char('s'), KeyCode::Char('e'), KeyCode::Char('x')],
        );
        press(&mut app, &[KeyCode::Enter, KeyCode::Enter]);
        assert!(app.editor().is_none());

        let phenotype = app.table().selected_phenotype().unwrap();
        let tree = phenotype.filter_tree();
        assert_eq!(tree.leaf_count(), 2);
        assert!(tree.summary().starts_with("age in [18-65] AND sex"));
    }

    #[test]
    fn test_dirty_quit_needs_confirmation() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('d'), KeyCode::Enter]);
        assert_eq!(
            app.table().selected_phenotype().unwrap().categorical_filter,
            Value::Null
        );

        press(&mut app, &[KeyCode::Char('q')]);
        assert!(!app.should_quit());
        assert!(app.status_message().unwrap().contains("Unsaved"));
        press(&mut app, &[KeyCode::Char('q')]);
        assert!(app.should_quit());
    }

    #[test]
    fn test_save_writes_file() {
        let (mut app, dir) = app_with_file();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('d'), KeyCode::Enter]);
        app.handle_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(app.status_message().unwrap().starts_with("Saved to"));

        let saved = Cohort::load(&dir.path().join("cohort.json")).unwrap();
        assert_eq!(saved.phenotypes[0].categorical_filter, Value::Null);
    }

    #[test]
    fn test_save_without_path_reports_error() {
        let mut app = App::new(CohortStore::new(cohort()), &Config::default()).unwrap();
        app.handle_action(Action::Save).unwrap();
        assert!(app.status_message().unwrap().starts_with("No file"));
    }

    #[test]
    fn test_escape_cancels_edit() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('d'), KeyCode::Esc]);
        assert!(app.editor().is_none());
        assert_eq!(app.table().selected_phenotype().unwrap().filter_tree().leaf_count(), 1);
        press(&mut app, &[KeyCode::Char('q')]);
        assert!(app.should_quit());
    }

    #[test]
    fn test_quit_with_open_edit_needs_confirmation() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('a')]);
        press(
            &mut app,
            &[KeyCode::Char('s'), KeyCode::Char('e'), KeyCode::Char('x')],
        );
        // Operator is a choice field, so q is not typed into it.
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('q')]);
        assert!(!app.should_quit());
        assert!(app.status_message().unwrap().contains("Uncommitted"));

        press(&mut app, &[KeyCode::Char('q')]);
        assert!(app.should_quit());
    }

    #[test]
    fn test_commit_without_edits_leaves_store_clean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cohort.json");
        let sample = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("sample-data/cohort.json");
        std::fs::copy(sample, &path).unwrap();
        let store = CohortStore::open(&path).unwrap();
        let before = store.phenotype("adults").unwrap().categorical_filter;
        let mut app = App::new(store.clone(), &Config::default()).unwrap();

        press(&mut app, &[KeyCode::Down]);
        assert_eq!(app.table().selected_phenotype().unwrap().id, "adults");
        press(&mut app, &[KeyCode::Enter, KeyCode::Enter]);
        assert!(app.editor().is_none());
        assert!(!store.is_dirty().unwrap());
        assert_eq!(store.phenotype("adults").unwrap().categorical_filter, before);

        press(&mut app, &[KeyCode::Char('q')]);
        assert!(app.should_quit());
    }

    #[test]
    fn test_help_overlay_renders() {
        let (mut app, _dir) = app_with_file();
        press(&mut app, &[KeyCode::Char('?')]);
        assert!(app.show_help());

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Keys"));
        assert!(text.contains("Filter Editing"));

        press(&mut app, &[KeyCode::Esc]);
        assert!(!app.show_help());
    }
}
