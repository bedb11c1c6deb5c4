pub mod api_key;
pub mod config_manager;
pub mod edge;
pub mod error;
pub mod feature;
pub mod memory;
pub mod node;
pub mod snapshot;
pub mod traits;
pub mod types;
pub mod version;

pub use api_key::*;
pub use config_manager::*;
pub use edge::*;
pub use error::*;
pub use feature::*;
pub use memory::*;
pub use node::*;
pub use snapshot::*;
pub use traits::*;
pub use types::*;
pub use version::*;
