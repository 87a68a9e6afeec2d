//! Todos — board entities, presentation types, and REST routes.

pub mod model;
pub mod routes;

pub use model::{Comment, LikeSet, Todo, TodoView};
pub use routes::board_routes;
