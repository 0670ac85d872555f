mod app;
mod dom;
mod form;
mod net;
mod prompts;
mod render;
mod state;
mod ws;

pub use app::run;
