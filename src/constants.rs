/// Package name.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
/// Default configuration file name.
pub const CONFIG_NAME: &str = "config.toml";
/// Environment variable holding a semicolon-delimited list of source roots.
pub const SOURCES_ENV: &str = "BACKUPDIR";
/// Environment variable overriding the storage root.
pub const STORAGE_ENV: &str = "SNAPLINK_STORAGE";
/// Separator between entries of a source list.
pub const SOURCE_DELIMITER: char = ';';
