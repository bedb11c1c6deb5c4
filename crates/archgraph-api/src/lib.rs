pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::*;
pub use error::*;
pub use extract::*;
pub use handlers::*;
pub use routes::*;
pub use server::*;
pub use state::*;
