use crate::tui::action::Action;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Maps KeyEvents to Actions
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings_list: Vec<KeyBinding>,
    bindings_map: HashMap<KeyPattern, Action>,
}

/// Single keybinding entry, as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: String,
    pub action: Action,
}

/// Pattern for matching key events
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_list(Self::default_list())
    }
}

impl KeyBindings {
    fn default_list() -> Vec<KeyBinding> {
        vec![
            // Navigation - Arrow keys
            KeyBinding::new("Up", Action::MoveUp),
            KeyBinding::new("Down", Action::MoveDown),
            KeyBinding::new("Left", Action::MoveLeft),
            KeyBinding::new("Right", Action::MoveRight),
            // Navigation - Vim-style
            KeyBinding::new("k", Action::MoveUp),
            KeyBinding::new("j", Action::MoveDown),
            KeyBinding::new("h", Action::MoveLeft),
            KeyBinding::new("l", Action::MoveRight),
            // Page navigation
            KeyBinding::new("PageUp", Action::PageUp),
            KeyBinding::new("PageDown", Action::PageDown),
            KeyBinding::new("Ctrl+u", Action::PageUp),
            KeyBinding::new("Ctrl+d", Action::PageDown),
            // Top/Bottom
            KeyBinding::new("g", Action::GoToTop),
            KeyBinding::new("G", Action::GoToBottom),
            KeyBinding::new("Home", Action::GoToTop),
            KeyBinding::new("End", Action::GoToBottom),
            // Filter editing
            KeyBinding::new("a", Action::AddAndFilter),
            KeyBinding::new("o", Action::AddOrFilter),
            KeyBinding::new("e", Action::EditFilter),
            KeyBinding::new("t", Action::ToggleOperator),
            KeyBinding::new("d", Action::DeleteFilter),
            KeyBinding::new("Delete", Action::DeleteFilter),
            KeyBinding::new("Ctrl+k", Action::CycleLeafKind),
            KeyBinding::new("Tab", Action::NextField),
            KeyBinding::new("Shift+Tab", Action::PrevField),
            // Files
            KeyBinding::new("Ctrl+s", Action::Save),
            // Help
            KeyBinding::new("?", Action::ToggleHelp),
            KeyBinding::new("F1", Action::ToggleHelp),
            // Application
            KeyBinding::new("q", Action::Quit),
            KeyBinding::new("Esc", Action::Cancel),
            KeyBinding::new("Enter", Action::Confirm),
        ]
    }

    fn from_list(bindings_list: Vec<KeyBinding>) -> Self {
        let bindings_map = Self::build_map(&bindings_list);
        Self {
            bindings_list,
            bindings_map,
        }
    }

    /// Default bindings with user entries layered on top
    ///
    /// A user entry replaces every default bound to the same key.
    pub fn with_overrides(overrides: &[KeyBinding]) -> Self {
        let overridden: HashSet<KeyPattern> = overrides
            .iter()
            .filter_map(|b| KeyPattern::from_string(&b.key).ok())
            .collect();
        let mut list: Vec<KeyBinding> = Self::default_list()
            .into_iter()
            .filter(|b| {
                KeyPattern::from_string(&b.key).map_or(true, |p| !overridden.contains(&p))
            })
            .collect();
        list.extend(overrides.iter().cloned());
        Self::from_list(list)
    }

    /// Build hashmap from bindings list
    fn build_map(bindings: &[KeyBinding]) -> HashMap<KeyPattern, Action> {
        bindings
            .iter()
            .filter_map(|b| {
                KeyPattern::from_string(&b.key)
                    .ok()
                    .map(|pattern| (pattern, b.action))
            })
            .collect()
    }

    /// Get action for key event
    pub fn get_action(&self, key: &KeyEvent) -> Option<Action> {
        let pattern = KeyPattern::from_event(key);
        self.bindings_map.get(&pattern).copied()
    }

    /// Get all bindings for an action (for help display)
    pub fn get_keys_for_action(&self, action: Action) -> Vec<String> {
        self.bindings_list
            .iter()
            .filter(|b| b.action == action)
            .map(|b| b.key.clone())
            .collect()
    }

    /// Returns Vec of (Action, description) for actions without a key
    pub fn get_unbound_actions(&self) -> Vec<(Action, &'static str)> {
        let bound_actions: HashSet<Action> = self.bindings_list.iter().map(|b| b.action).collect();

        Action::all()
            .into_iter()
            .filter(|action| !bound_actions.contains(action))
            .map(|action| (action, action.description()))
            .collect()
    }

    /// Validate bindings and return warnings
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen_keys: HashMap<String, Action> = HashMap::new();
        for binding in &self.bindings_list {
            if let Some(existing_action) = seen_keys.get(&binding.key) {
                warnings.push(format!(
                    "Duplicate key '{}': bound to both {:?} and {:?}",
                    binding.key, existing_action, binding.action
                ));
            } else {
                seen_keys.insert(binding.key.clone(), binding.action);
            }
        }

        let unbound = self.get_unbound_actions();
        if !unbound.is_empty() {
            warnings.push(format!(
                "{} action(s) have no keybindings: {}",
                unbound.len(),
                unbound
                    .iter()
                    .map(|(action, _)| format!("{:?}", action))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        for binding in &self.bindings_list {
            if KeyPattern::from_string(&binding.key).is_err() {
                warnings.push(format!(
                    "Invalid key pattern '{}' for action {:?}",
                    binding.key, binding.action
                ));
            }
        }

        warnings
    }
}

impl KeyBinding {
    pub fn new(key: &str, action: Action) -> Self {
        Self {
            key: key.to_string(),
            action,
        }
    }
}

impl KeyPattern {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Normalize a terminal event; shift is already folded into chars and BackTab
    pub fn from_event(event: &KeyEvent) -> Self {
        let modifiers = match event.code {
            KeyCode::Char(_) | KeyCode::BackTab => event.modifiers - KeyModifiers::SHIFT,
            _ => event.modifiers,
        };
        Self {
            code: event.code,
            modifiers,
        }
    }

    /// Parse from string (e.g., "Ctrl+s", "Shift+Tab", "G")
    pub fn from_string(s: &str) -> Result<Self, String> {
        let (key_part, modifier_parts) = match s.rsplit_once('+') {
            // "+" on its own, or a binding ending in "++"
            Some((head, "")) => (
                "+",
                head.strip_suffix('+').unwrap_or(head).split('+').collect::<Vec<_>>(),
            ),
            Some((head, key)) => (key, head.split('+').collect::<Vec<_>>()),
            None => (s, Vec::new()),
        };

        let mut modifiers = KeyModifiers::empty();
        for part in modifier_parts.iter().filter(|p| !p.is_empty()) {
            match part.to_lowercase().as_str() {
                "ctrl" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                "cmd" | "command" | "super" => {
                    // Mac Command key maps to SUPER
                    #[cfg(target_os = "macos")]
                    {
                        modifiers |= KeyModifiers::SUPER;
                    }
                    #[cfg(not(target_os = "macos"))]
                    {
                        modifiers |= KeyModifiers::CONTROL;
                    }
                }
                _ => return Err(format!("Unknown modifier: {}", part)),
            }
        }

        let mut chars = key_part.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(ch), None) => {
                let ch = if modifiers.contains(KeyModifiers::SHIFT) {
                    ch.to_ascii_uppercase()
                } else {
                    ch
                };
                KeyCode::Char(ch)
            }
            _ => match key_part.to_lowercase().as_str() {
                "up" => KeyCode::Up,
                "down" => KeyCode::Down,
                "left" => KeyCode::Left,
                "right" => KeyCode::Right,
                "pageup" | "pgup" => KeyCode::PageUp,
                "pagedown" | "pgdown" | "pgdn" => KeyCode::PageDown,
                "home" => KeyCode::Home,
                "end" => KeyCode::End,
                "tab" if modifiers.contains(KeyModifiers::SHIFT) => KeyCode::BackTab,
                "tab" => KeyCode::Tab,
                "backtab" => KeyCode::BackTab,
                "enter" | "return" => KeyCode::Enter,
                "esc" | "escape" => KeyCode::Esc,
                "backspace" => KeyCode::Backspace,
                "delete" | "del" => KeyCode::Delete,
                "insert" | "ins" => KeyCode::Insert,
                "space" => KeyCode::Char(' '),
                f if f.starts_with('f') => match f[1..].parse::<u8>() {
                    Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => return Err(format!("Invalid function key: {}", key_part)),
                },
                _ => return Err(format!("Unknown key: {}", key_part)),
            },
        };

        // Shift lives in the char itself, like events coming from the terminal.
        if matches!(code, KeyCode::Char(_) | KeyCode::BackTab) {
            modifiers -= KeyModifiers::SHIFT;
        }

        Ok(Self { code, modifiers })
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.contains(KeyModifiers::SUPER) {
            parts.push("Super".to_string());
        }
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            parts.push("Shift".to_string());
        }

        let key = match self.code {
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Up => "↑".to_string(),
            KeyCode::Down => "↓".to_string(),
            KeyCode::Left => "←".to_string(),
            KeyCode::Right => "→".to_string(),
            KeyCode::PageUp => "PgUp".to_string(),
            KeyCode::PageDown => "PgDn".to_string(),
            KeyCode::BackTab => "Shift+Tab".to_string(),
            KeyCode::Delete => "Del".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            other => format!("{:?}", other),
        };
        parts.push(key);
        write!(f, "{}", parts.join("+"))
    }
}
