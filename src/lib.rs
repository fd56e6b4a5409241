pub mod projects;
pub mod til_frontend;
