use serde::{Deserialize, Serialize};
use std::fmt;

/// All possible actions in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Action {
    // Navigation
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,

    // Filter editing
    AddAndFilter,
    AddOrFilter,
    EditFilter,
    ToggleOperator,
    DeleteFilter,
    CycleLeafKind,
    NextField,
    PrevField,

    // File Operations
    Save,

    // View
    ToggleHelp,

    // Application
    Quit,
    Confirm,
    Cancel,
}

impl Action {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Action::MoveUp => "Move cursor up",
            Action::MoveDown => "Move cursor down",
            Action::MoveLeft => "Previous filter / value",
            Action::MoveRight => "Next filter / value",
            Action::PageUp => "Page up",
            Action::PageDown => "Page down",
            Action::GoToTop => "Go to first row",
            Action::GoToBottom => "Go to last row",
            Action::AddAndFilter => "Add filter joined with AND",
            Action::AddOrFilter => "Add filter joined with OR",
            Action::EditFilter => "Edit selected filter",
            Action::ToggleOperator => "Toggle AND/OR next to the selection",
            Action::DeleteFilter => "Delete selected filter",
            Action::CycleLeafKind => "Change filter kind",
            Action::NextField => "Next composer field",
            Action::PrevField => "Previous composer field",
            Action::Save => "Save cohort",
            Action::ToggleHelp => "Toggle help screen",
            Action::Quit => "Quit application",
            Action::Confirm => "Open editor / apply / commit",
            Action::Cancel => "Cancel edit",
        }
    }

    /// Get category for grouping in help screen
    pub fn category(&self) -> ActionCategory {
        match self {
            Action::MoveUp
            | Action::MoveDown
            | Action::MoveLeft
            | Action::MoveRight
            | Action::PageUp
            | Action::PageDown
            | Action::GoToTop
            | Action::GoToBottom => ActionCategory::Navigation,

            Action::AddAndFilter
            | Action::AddOrFilter
            | Action::EditFilter
            | Action::ToggleOperator
            | Action::DeleteFilter
            | Action::CycleLeafKind
            | Action::NextField
            | Action::PrevField => ActionCategory::Editing,

            Action::Save => ActionCategory::FileOps,

            Action::ToggleHelp => ActionCategory::View,

            Action::Quit | Action::Confirm | Action::Cancel => ActionCategory::Application,
        }
    }

    /// Get all possible actions (for validation)
    pub fn all() -> Vec<Action> {
        vec![
            Action::MoveUp,
            Action::MoveDown,
            Action::MoveLeft,
            Action::MoveRight,
            Action::PageUp,
            Action::PageDown,
            Action::GoToTop,
            Action::GoToBottom,
            Action::AddAndFilter,
            Action::AddOrFilter,
            Action::EditFilter,
            Action::ToggleOperator,
            Action::DeleteFilter,
            Action::CycleLeafKind,
            Action::NextField,
            Action::PrevField,
            Action::Save,
            Action::ToggleHelp,
            Action::Quit,
            Action::Confirm,
            Action::Cancel,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    Navigation,
    Editing,
    FileOps,
    View,
    Application,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCategory::Navigation => write!(f, "Navigation"),
            ActionCategory::Editing => write!(f, "Filter Editing"),
            ActionCategory::FileOps => write!(f, "File Operations"),
            ActionCategory::View => write!(f, "View"),
            ActionCategory::Application => write!(f, "Application"),
        }
    }
}
