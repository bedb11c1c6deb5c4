pub mod architecture;
pub mod components;
pub mod dependency;
pub mod ordering;
pub mod progress;
pub mod traversal;


pub use architecture::*;
pub use components::*;
pub use dependency::*;
pub use ordering::*;
pub use progress::*;
pub use traversal::*;
