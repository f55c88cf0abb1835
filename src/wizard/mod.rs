pub mod builder;
pub mod state;

pub use builder::WidgetBuilder;
pub use state::{Stage, WizardState, reduce};
