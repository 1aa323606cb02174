mod chrome_path;
mod driver;

pub mod prelude {
    pub use crate::chrome_path::{chrome_path, RT_CHROME_PATH_ENV};
    pub use crate::driver::{ChromeDriver, TRACE_CATEGORIES};

    pub use render_tunnel_runner::prelude::*;
}
