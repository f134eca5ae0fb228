pub mod interactions;
pub mod lists;

pub use interactions::InteractionService;
pub use lists::ListService;
