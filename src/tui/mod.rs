pub mod theme;
pub mod viewer;
pub mod visual;

pub use theme::Theme;
pub use viewer::show;
pub use visual::VisualWidget;
