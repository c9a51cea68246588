//! Python-style estimator reprs.
//!
//! Fitted pipelines render as `Name(param=value, ...)` with parameters in
//! alphabetical order, matching what a scikit-learn user expects to see
//! when a model file is inspected.

use std::fmt::{self, Display};

/// Collects `key=value` pairs for an estimator repr.
#[derive(Debug)]
pub(crate) struct Repr {
    name: &'static str,
    params: Vec<(&'static str, String)>,
}

impl Repr {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
        }
    }

    pub(crate) fn param(mut self, key: &'static str, value: impl Display) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    pub(crate) fn opt<T: Display>(self, key: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self.param(key, "None"),
        }
    }

    pub(crate) fn flag(self, key: &'static str, value: bool) -> Self {
        self.param(key, if value { "True" } else { "False" })
    }

    pub(crate) fn text(self, key: &'static str, value: &str) -> Self {
        self.param(key, format!("'{value}'"))
    }
}

impl Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort_by_key(|(k, _)| *k);
        write!(f, "{}(", self.name)?;
        for (i, (k, v)) in params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, ")")
    }
}

/// Python float formatting: integral values keep a trailing `.0`.
pub(crate) fn py_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
