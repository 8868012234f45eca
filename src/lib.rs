pub mod book;
pub mod cache;
pub mod config;
pub mod events;
pub mod manifest;
pub mod pile;
pub mod processing;
pub mod source;
pub mod tasks {
    pub mod albums;
    pub mod export;
    pub mod loader;
    pub mod viewer;
}
