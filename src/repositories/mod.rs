pub mod category_repository;
pub mod favorite_repository;
pub mod reply_repository;
pub mod thread_repository;
pub mod user_repository;
