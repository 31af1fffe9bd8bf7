pub mod dish;
pub mod menu;
pub mod submenu;
pub mod sync;

pub use dish::*;
pub use menu::*;
pub use submenu::*;
pub use sync::*;
