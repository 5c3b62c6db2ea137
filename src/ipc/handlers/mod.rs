pub mod core;
pub mod editor;
pub mod export;
pub mod scopes;
pub mod screens;
pub mod session;
pub mod table;
