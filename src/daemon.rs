//! Daemonization: fork, detach from the controlling terminal, and redirect standard
//! output to `/dev/null`.
//!
//! Grounded directly on `become_daemon()` in the original socket server: a single fork
//! (the parent exits immediately), `setsid()` to become a session leader, `/dev/null`
//! opened and `dup2`'d onto stdout, and a `chdir("/")`. Must run before the async runtime
//! is built — forking a multi-threaded process is only safe this early, with nothing
//! else running yet.

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{chdir, dup2, fork, setsid, ForkResult};
use std::os::unix::io::AsRawFd;

/// Forks and detaches the current process into a daemon.
///
/// On success, this function only returns in the child: the parent process calls
/// `std::process::exit(0)` directly. Callers in `main` should treat a returning call as
/// "we are now the daemon" and proceed to build the runtime and bind sockets.
///
/// # Safety considerations
///
/// This must be called before any `tokio::runtime::Runtime` is constructed and before
/// any additional threads are spawned — `fork()` in a multithreaded process only
/// duplicates the calling thread, leaving the child in an inconsistent state if other
/// threads held locks at fork time.
pub fn daemonize() -> nix::Result<()> {
    // SAFETY: called before the async runtime or any worker threads exist, so the
    // child inherits a single-threaded process with no locks held by now-absent threads.
    match unsafe { fork()? } {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid()?;

    let dev_null = open("/dev/null", OFlag::O_RDWR, Mode::empty())?;
    dup2(dev_null.as_raw_fd(), std::io::stdout().as_raw_fd())?;

    chdir("/")?;

    Ok(())
}
