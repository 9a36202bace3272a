pub mod init;
pub mod list_areas;
pub mod list_models;
pub mod run;
pub mod score;
pub mod show;
pub mod summary;
