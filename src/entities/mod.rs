pub mod actor;
pub mod movie;
pub mod movie_actor;
pub mod user;
