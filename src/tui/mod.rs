pub mod action;
pub mod app;
pub mod component;
pub mod components;
pub mod keybindings;
pub mod layout;
pub mod theme;

pub use action::{Action, ActionCategory};
pub use app::App;
pub use component::{Component, Focusable};
pub use components::{CohortTable, FilterEditor};
pub use keybindings::{KeyBinding, KeyBindings, KeyPattern};
pub use theme::{Theme, ThemeName};
