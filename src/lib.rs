pub mod app;
pub mod args;
pub mod bridge;
pub mod buttons;
pub mod devices;
pub mod errors;
pub mod host;
pub mod logging;
pub mod panic_handler;
pub mod platform;
pub mod settings;

#[cfg(test)]
mod test_support;
