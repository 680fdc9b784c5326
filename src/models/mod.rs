pub mod entity;
pub mod history;
pub mod rates;

pub use entity::*;
pub use history::*;
pub use rates::*;
