pub mod app;
pub mod backend;
pub mod components;
pub mod config;
pub mod debug_log;
pub mod drivers;
pub mod event_loop;
pub mod hud;
pub mod keybindings;
pub mod linkifier;
pub mod theme;
pub mod tracing_sub;
pub mod ui;
pub mod view;
pub mod window;
