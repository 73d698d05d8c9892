use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterErrorKind {
    InvalidRequest,
    Unsupported,
    Upstream,
    Simulation,
    Encoding,
    Internal,
}

impl RouterErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RouterErrorKind::InvalidRequest => "invalid_request",
            RouterErrorKind::Unsupported => "unsupported",
            RouterErrorKind::Upstream => "upstream",
            RouterErrorKind::Simulation => "simulation",
            RouterErrorKind::Encoding => "encoding",
            RouterErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterError {
    kind: RouterErrorKind,
    message: String,
}

impl RouterError {
    pub fn invalid<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    pub fn unsupported<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Unsupported,
            message: message.into(),
        }
    }

    pub fn upstream<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Upstream,
            message: message.into(),
        }
    }

    pub fn simulation<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Simulation,
            message: message.into(),
        }
    }

    pub fn encoding<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Encoding,
            message: message.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Internal,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> RouterErrorKind {
        self.kind
    }

    /// Precondition failures are caller mistakes, not liquidity or infrastructure conditions.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.kind,
            RouterErrorKind::InvalidRequest | RouterErrorKind::Unsupported
        )
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for RouterError {}

pub type RouterResult<T> = Result<T, RouterError>;
