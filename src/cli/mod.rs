pub mod compare;
pub mod setup;
pub mod ui;
pub mod windows;
