//! Command: print version information.
use anyhow::Result;
use std::io::Write;

/// Version string baked in at build time, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("LAYERED_OPTS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the version to `out`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn run(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "layered-opts {}", version())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prints_name_and_version() {
        let mut out = Vec::<u8>::new();
        run(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("layered-opts "));
        assert!(text.trim_end().len() > "layered-opts ".len());
    }
}
