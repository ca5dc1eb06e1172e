pub mod achievement;
pub mod analytics;
pub mod article;
pub mod bookmark;
pub mod clap;
pub mod comment;
pub mod event;
pub mod follow;
pub mod notification;
pub mod read_history;
pub mod revision;
pub mod user;
