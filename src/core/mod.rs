pub mod app;
pub mod category;
pub mod theme;
