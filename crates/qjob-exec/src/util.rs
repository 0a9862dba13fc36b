use std::path::Path;

use tokio::process::{Child, Command};

/// Command for `program` with `args`, placed in its own process group on unix.
pub fn cmd_program(program: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Send SIGTERM to the child's process group, then SIGKILL the child and reap it.
pub async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            if let Some(id) = child.id() {
                // The child is not reaped yet, so its pid (and group id) still belong to it.
                unsafe {
                    libc::kill(-(id as libc::pid_t), libc::SIGTERM);
                }
            }
            child.kill().await
        } else {
            child.kill().await
        }
    }
}
