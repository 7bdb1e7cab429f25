//! Filter editing state shared by the terminal front end: the edit session,
//! leaf selection and panel placement.
pub mod positioning;
pub mod selection;
pub mod session;

pub use positioning::{ComposerSide, PanelGeometry, PanelPlacement, place_panels};
pub use selection::EditorSelectionState;
pub use session::FilterEditSession;
