// Server module entry point
// Listener creation, connection handling and the accept loop

pub mod connection;
pub mod io;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), so use server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::Server;
pub use signal::shutdown_signal;
