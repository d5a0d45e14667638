use std::{fmt, io};
use std::panic::Location;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error with a message, a list of key/value context parameters, and
/// an optional chain of predecessor errors.
#[derive(Debug, Clone)]
pub struct Error {
    message: String,
    context: Vec<(Option<String>, String)>,
    prev: Option<Box<Error>>,
    _location: &'static Location<'static>,
}

impl Error {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
            context: vec![],
            prev: None,
            _location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn with_context<I>(message: impl Into<String>, context: I) -> Self
        where I: IntoIterator<Item = (Option<String>, String)>
    {
        Error {
            message: message.into(),
            context: context.into_iter().collect(),
            prev: None,
            _location: Location::caller(),
        }
    }

    /// Wraps a standard error, recording its source chain as context.
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        let mut context = vec![];
        let mut source = error.source();
        while let Some(e) = source {
            context.push((None, e.to_string()));
            source = e.source();
        }

        Error {
            message: error.to_string(),
            context,
            prev: None,
            _location: Location::caller(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &[(Option<String>, String)] {
        &self.context
    }

    /// Chains `self` behind `other`: `other` becomes the visible error
    /// and `self` its deepest predecessor.
    pub fn chain(self, mut other: Error) -> Self {
        let mut tail = &mut other;
        while let Some(ref mut prev) = tail.prev {
            tail = prev;
        }

        tail.prev = Some(Box::new(self));
        other
    }

    /// `true` if the message or any context entry of any error in the
    /// chain contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        let mut error = Some(self);
        while let Some(e) = error {
            if e.message.contains(needle)
                || e.context.iter().any(|(k, v)| {
                    v.contains(needle) || k.as_deref().is_some_and(|k| k.contains(needle))
                })
            {
                return true;
            }

            error = e.prev.as_deref();
        }

        false
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr $(, $($rest:tt)*)?) => (
        $crate::error::Error::with_context($msg.to_string(), {
            #[allow(unused_mut)]
            let mut v: Vec<(Option<String>, String)> = Vec::new();
            $($crate::error!(@param v $($rest)*);)?
            v
        })
    );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

macro_rules! impl_from_std_error {
    ($($T:ty),+ $(,)?) => ($(
        impl From<$T> for Error {
            #[track_caller]
            fn from(error: $T) -> Self {
                Error::from_std(error)
            }
        }
    )+)
}

impl_from_std_error! {
    io::Error,
    toml::de::Error,
    serde_json::Error,
    regex::Error,
    minijinja::Error,
}

impl From<String> for Error {
    #[track_caller]
    fn from(message: String) -> Self {
        Error::new(message)
    }
}

impl From<&str> for Error {
    #[track_caller]
    fn from(message: &str) -> Self {
        Error::new(message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn indented(f: &mut fmt::Formatter<'_>, depth: usize, e: &Error) -> fmt::Result {
            let indent = "    ".repeat(depth);
            writeln!(f, "{indent}{}", e.message.replace('\n', &format!("\n{indent}")))?;
            for (key, value) in &e.context {
                let value = value.replace('\n', &format!("\n{indent}"));
                match key {
                    Some(key) => writeln!(f, "{indent}{key}: {value}")?,
                    None => writeln!(f, "{indent}{value}")?,
                }
            }

            if std::env::var_os("RUST_BACKTRACE").is_some() {
                writeln!(f, "{indent}[{}]", e._location)?;
            }

            match &e.prev {
                Some(prev) => indented(f, depth + 1, prev),
                None => Ok(())
            }
        }

        indented(f, 0, self)
    }
}

impl StdError for Error { }

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    static_assertions::assert_impl_all!(Error: Send, Sync, Clone);

    #[test]
    fn test_context_and_chain() {
        let inner = error!("failed to parse front matter", "file path" => "a/b.html");
        let outer = inner.chain(error!("pattern build failed"));
        assert!(outer.mentions("a/b.html"));
        assert!(outer.mentions("front matter"));
        assert!(outer.mentions("pattern build failed"));

        let display = outer.to_string();
        assert!(display.contains("pattern build failed"));
        assert!(display.contains("    failed to parse front matter"));
    }

    #[test]
    fn test_chainable_result() {
        let result: Result<()> = Err(error!("inner"));
        let chained = result.chain_with(|| error!("outer", "key" => "value"));
        let error = chained.unwrap_err();
        assert!(error.mentions("inner"));
        assert!(error.mentions("outer"));
        assert_eq!(error.context()[0], (Some("key".into()), "value".into()));
    }
}
