mod fixtures;
mod lifecycle;
mod scripted;

pub use fixtures::*;
pub use lifecycle::users;
pub use scripted::*;

use log::LevelFilter;
use std::env;
use tiller::{Database, Transport};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the whole suite against a live endpoint reached through `transport`.
pub async fn execute_tests<T: Transport>(transport: T) {
    let mut db = Database::new(transport);
    users(&mut db).await;
}

#[doc(hidden)]
pub use log;

/// Evaluates the block with logging turned off, for tests that trigger error logs on purpose.
#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = $crate::log::max_level();
        $crate::log::set_max_level($crate::log::LevelFilter::Off);
        let result = { $($code)+ };
        $crate::log::set_max_level(level);
        result
    }};
}
