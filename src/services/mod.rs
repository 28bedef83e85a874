pub mod accounts;
pub mod comments;
pub mod feed;
pub mod library;
pub mod profile;
pub mod providers;
