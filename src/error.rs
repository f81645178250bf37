use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the packing engine and its file boundaries.
///
/// Stale events and "no collision" predictions are routine bookkeeping and never
/// show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter, rejected before any simulation state is built.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Random placement could not find room for a sphere.
    #[error(
        "failed to place sphere {sphere} without overlap after {attempts} attempts; \
         lower the initial packing fraction or the sphere count"
    )]
    Placement { sphere: usize, attempts: usize },

    /// Numerical or geometric pathology (e.g. coincident centers at contact).
    #[error("numerical error: {0}")]
    MathError(String),

    /// The event heap ran dry. Every sphere always owns one pending event, so this
    /// is an invariant violation.
    #[error("event queue exhausted: every sphere must own a pending event")]
    EventQueueExhausted,

    /// The compression driver ran out of its cycle budget.
    #[error("compression stopped after {cycles} cycles at packing fraction {packing_fraction}")]
    NotConverged { cycles: usize, packing_fraction: f64 },

    /// Malformed configuration record file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// TOML decoding of a run configuration.
    #[error(transparent)]
    Config(#[from] toml::de::Error),

    /// Propagated I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("radius must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("radius"));
    }

    #[test]
    fn placement_error_names_sphere() {
        let e = Error::Placement {
            sphere: 17,
            attempts: 1000,
        };
        let msg = e.to_string();
        assert!(msg.contains("sphere 17"));
        assert!(msg.contains("1000 attempts"));
    }

    #[test]
    fn parse_error_reports_line() {
        let e = Error::Parse {
            line: 16,
            message: "expected 5 fields".into(),
        };
        assert!(e.to_string().contains("line 16"));
    }
}
