use crate::tui::action::Action;
use color_eyre::Result;
use ratatui::{Frame, layout::Rect};

/// A piece of the screen that consumes actions and draws itself
///
/// The app offers each action to the topmost component first. A component
/// that does not recognise an action returns `Ok(false)` so it can fall
/// through to the one underneath.
pub trait Component {
    /// Ok(true) when the action was consumed
    fn handle_action(&mut self, action: Action) -> Result<bool>;

    fn render(&mut self, frame: &mut Frame, area: Rect);

    /// Actions listed in the help overlay while this component is on top
    fn supported_actions(&self) -> &[Action];

    fn name(&self) -> &str;

    /// Called once per loop iteration before drawing
    fn update(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A component that can hold keyboard focus
pub trait Focusable: Component {
    fn is_focused(&self) -> bool;

    fn set_focused(&mut self, focused: bool);
}
