use std::process::Command;

/// Run a shell command line through `sh -c`, returning (stdout, stderr, exit_code).
pub fn run_shell(cmdline: &str) -> anyhow::Result<(String, String, i32)> {
    let output = Command::new("sh").arg("-c").arg(cmdline).output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    Ok((stdout, stderr, code))
}

/// Indentation for nested progress lines.
pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
