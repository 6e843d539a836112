// UI-side state: progress animation and terminal input mapping

mod progress;
pub mod terminal;

pub use progress::ProgressIndicator;
pub use terminal::{TerminalSurface, UiAction, map_event};
