pub mod backlog;
pub mod button;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod logging;
pub mod mode;
pub mod orchestrator;
pub mod retry;
pub mod screen;
pub mod supply;
pub mod platform {
    pub mod framebuffer;
    pub mod gpio;
    pub mod png_file;
    pub mod power;
}
pub mod processing {
    pub mod diagnostics;
    pub mod layout;
    pub mod overlay;
    pub mod text;
}
pub mod tasks {
    pub mod refill;
    pub mod scheduler;
}
