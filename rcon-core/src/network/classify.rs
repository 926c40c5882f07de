//! Transport error classification.
//!
//! The supervisor and multiplexer only care about three outcomes of a failed
//! dial, read or write. Portable [`ErrorKind`]s are checked first; the raw
//! OS error table is the only platform-specific piece.
//!
//! std already maps the codes in the table to those kinds on unix and
//! windows; the table is a fallback for codes std leaves uncategorized.

use std::io::{Error, ErrorKind};

/// How a transport error should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Refused or timed out; expected while the remote service starts up.
    Transient,
    /// The connection was aborted mid-operation; roll over to a new generation.
    Aborted,
    /// Anything else.
    Other,
}

/// Raw codes consulted when the error kind alone does not decide.
#[cfg(unix)]
mod os {
    pub const REFUSED: &[i32] = &[libc::ECONNREFUSED];
    pub const TIMED_OUT: &[i32] = &[libc::ETIMEDOUT];
    pub const ABORTED: &[i32] = &[libc::ECONNABORTED];
}

#[cfg(windows)]
mod os {
    use windows::Win32::Networking::WinSock::{WSAECONNABORTED, WSAECONNREFUSED, WSAETIMEDOUT};

    pub const REFUSED: &[i32] = &[WSAECONNREFUSED.0];
    pub const TIMED_OUT: &[i32] = &[WSAETIMEDOUT.0];
    pub const ABORTED: &[i32] = &[WSAECONNABORTED.0];
}

#[cfg(not(any(unix, windows)))]
mod os {
    pub const REFUSED: &[i32] = &[];
    pub const TIMED_OUT: &[i32] = &[];
    pub const ABORTED: &[i32] = &[];
}

/// Classify a transport error.
pub fn classify(err: &Error) -> ErrorClass {
    match err.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::TimedOut => return ErrorClass::Transient,
        ErrorKind::ConnectionAborted => return ErrorClass::Aborted,
        _ => {}
    }

    match err.raw_os_error() {
        Some(code) if os::REFUSED.contains(&code) || os::TIMED_OUT.contains(&code) => {
            ErrorClass::Transient
        }
        Some(code) if os::ABORTED.contains(&code) => ErrorClass::Aborted,
        _ => ErrorClass::Other,
    }
}

/// Returns `true` when the peer closed the stream.
pub fn is_end_of_stream(err: &Error) -> bool {
    err.kind() == ErrorKind::UnexpectedEof
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portable_kinds() {
        assert_eq!(
            classify(&Error::from(ErrorKind::ConnectionRefused)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&Error::from(ErrorKind::TimedOut)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&Error::from(ErrorKind::ConnectionAborted)),
            ErrorClass::Aborted
        );
        assert_eq!(
            classify(&Error::from(ErrorKind::PermissionDenied)),
            ErrorClass::Other
        );
        assert_eq!(
            classify(&Error::from(ErrorKind::ConnectionReset)),
            ErrorClass::Other
        );
    }

    #[cfg(unix)]
    #[test]
    fn raw_os_codes() {
        assert_eq!(
            classify(&Error::from_raw_os_error(libc::ECONNREFUSED)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&Error::from_raw_os_error(libc::ETIMEDOUT)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&Error::from_raw_os_error(libc::ECONNABORTED)),
            ErrorClass::Aborted
        );
        assert_eq!(
            classify(&Error::from_raw_os_error(libc::EACCES)),
            ErrorClass::Other
        );
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = Error::new(ErrorKind::ConnectionAborted, "software caused abort");
        assert_eq!(classify(&err), ErrorClass::Aborted);
    }

    #[test]
    fn end_of_stream() {
        assert!(is_end_of_stream(&Error::from(ErrorKind::UnexpectedEof)));
        assert!(!is_end_of_stream(&Error::from(ErrorKind::BrokenPipe)));
    }
}
