pub mod auth_handlers;
pub mod best_reply_handlers;
pub mod category_handlers;
pub mod favorite_handlers;
pub mod reply_handlers;
pub mod thread_handlers;
