pub mod grid;
pub mod theme;

pub use grid::{render_grid, render_transport, GridState};
pub use theme::Theme;
