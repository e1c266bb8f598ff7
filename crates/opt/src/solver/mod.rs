mod acquisition;
mod bo_config;
mod bo_loop;

pub use acquisition::*;
pub use bo_config::*;
pub use bo_loop::*;
