//! legacy exit status codes for system programs.
//! reference: [SYSEXITS](https://man.freebsd.org/cgi/man.cgi?query=sysexits&apropos=0&sektion=0&manpath=FreeBSD+11.2-stable&arch=default&format=html)

use crate::error::Error;

/// value: 0 <br>
/// Successful termination.
pub const EX_OK: i32 = 0;

/// value: 70 <br>
/// An internal software error has been detected. This should be limited to non-operating system related errors as possible.
pub const EX_SOFTWARE: i32 = 70;

/// value: 74 <br>
/// An error occurred while doing I/O on some file.
pub const EX_IOERR: i32 = 74;

/// value: 78 <br>
/// Something was found in an unconfigured or misconfigured state.
pub const EX_CONFIG: i32 = 78;

/// Picks the exit status for an error that ended the run.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(
            Error::ConfigRead { .. }
            | Error::ConfigParse { .. }
            | Error::NoStorageRoot
            | Error::BackupInsideSource { .. },
        ) => EX_CONFIG,
        Some(Error::Runtime(_) | Error::WorkerLost) => EX_SOFTWARE,
        _ => EX_IOERR,
    }
}
