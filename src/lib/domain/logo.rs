const BANNER: &str = r#"
  ___      _ _          _   ___  ___
 / __|___ | | |___ __| |_ |_ _|/ _ \
| (__/ _ \| | / -_) _|  _||  || | | |
 \___\___/|_|_\___\__|\__|___|\__\_\
"#;

/// Prints the startup banner, matching the logging style of each binary's entrypoint.
pub fn print() {
    tracing::info!("{BANNER}");
}
