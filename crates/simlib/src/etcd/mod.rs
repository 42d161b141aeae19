pub mod config;
pub mod pb;
pub mod prefix;
pub mod util;

// convenience re-export
pub use config::Config;
