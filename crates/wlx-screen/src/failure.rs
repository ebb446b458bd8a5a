use tracing::{debug, error};

/// Log the error, tell the user the application will exit and panic.
pub fn report_and_panic<Err: core::fmt::Display>(error: Err, message: &str) -> ! {
    error!("{message}: {error}");
    eprintln!("ERROR:\n{message}.\nSee the logs for more details, the application will exit.");

    panic!("{message}: {error}");
}

/// Log the error.
pub fn report<Err: core::fmt::Display>(error: Err, message: &str) {
    error!("{message}: {error}");
}

/// Fatal and reported outcomes for `Result` and `Option`.
pub trait Failure<T> {
    /// Unwrap the value or exit through [`report_and_panic`].
    fn report_and_panic(self, message: &str) -> T;
    /// The value, or `None` after reporting the failure.
    fn report(self, message: &str) -> Option<T>;
}

/// Outcomes that are only logged at debug level.
pub trait Ignore {
    /// Discard the value, logging the caller on failure.
    fn ignore(self);
}

impl<T, E: core::fmt::Display> Failure<T> for Result<T, E> {
    fn report_and_panic(self, message: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => report_and_panic(error, message),
        }
    }

    fn report(self, message: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                report(error, message);
                None
            }
        }
    }
}

impl<T> Failure<T> for Option<T> {
    fn report_and_panic(self, message: &str) -> T {
        match self {
            Some(value) => value,
            None => report_and_panic("Was None", message),
        }
    }

    fn report(self, message: &str) -> Self {
        if self.is_none() {
            report("Was None", message);
        }

        self
    }
}

impl<T> Ignore for Option<T> {
    #[track_caller]
    fn ignore(self) {
        if self.is_none() {
            debug!("Ignoring None ({})", core::panic::Location::caller());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Failure;

    #[test]
    fn report_keeps_value() {
        assert_eq!(Ok::<_, &str>(3).report("Unused"), Some(3));
        assert_eq!(Some(3).report("Unused"), Some(3));
    }

    #[test]
    fn report_discards_failure() {
        assert_eq!(Err::<u32, _>("broken").report("Could not read"), None);
        assert_eq!(None::<u32>.report("Could not read"), None);
    }

    #[test]
    #[should_panic(expected = "Could not load: broken")]
    fn report_and_panic_exits_on_error() {
        Err::<u32, _>("broken").report_and_panic("Could not load");
    }

    #[test]
    #[should_panic(expected = "--frames needs a value: Was None")]
    fn report_and_panic_exits_on_none() {
        None::<u32>.report_and_panic("--frames needs a value");
    }
}
