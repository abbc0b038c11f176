use std::io::Write;

use serde::Serialize;

/// Write `value` to stdout as pretty JSON followed by a newline.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Human-readable pipeline explanation: numbered steps, then the JSON.
pub fn print_steps(title: &str, steps: &[String]) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{title}")?;
    for step in steps {
        writeln!(out, "  {step}")?;
    }
    writeln!(out)?;
    Ok(())
}
