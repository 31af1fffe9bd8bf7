pub mod cache;
pub mod dishes;
pub mod menus;
pub mod submenus;

pub use cache::{RedisCache, ResponseCache};
pub use dishes::DishesService;
pub use menus::MenusService;
pub use submenus::SubmenusService;
