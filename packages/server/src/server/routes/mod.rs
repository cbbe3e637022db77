pub mod cases;
pub mod health;
pub mod jobs;
pub mod models;
pub mod reviews;
