use thiserror::Error;
use xg_client::XgError;

#[derive(Error, Debug)]
pub enum Error {
    /// A setup precondition is unmet; nothing on the array was touched.
    #[error("invalid backend configuration: {0}")]
    InvalidBackendConfig(String),

    /// A node that must exist is absent from the configuration tree.
    #[error("configuration node '{0}' not found")]
    NodeNotFound(String),

    /// The array rejected an action, or a required wait timed out.
    #[error("{step} failed for '{resource}': {message}")]
    Operation {
        step: &'static str,
        resource: String,
        message: String,
    },

    #[error(transparent)]
    Gateway(#[from] XgError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse driver config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn operation(
        step: &'static str,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Operation {
            step,
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Short label for metrics and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidBackendConfig(_) => "invalid_config",
            Error::NodeNotFound(_) => "not_found",
            Error::Operation { .. } => "operation_failed",
            Error::Gateway(XgError::LoginFailed { .. }) => "login_failed",
            Error::Gateway(_) => "gateway_error",
            Error::Io(_) | Error::ConfigParse(_) => "config_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_message() {
        let err = Error::operation("delete iSCSI target", "vol-01", "target busy");
        assert_eq!(
            err.to_string(),
            "delete iSCSI target failed for 'vol-01': target busy"
        );
        assert_eq!(err.code(), "operation_failed");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::InvalidBackendConfig("container is missing".into()).code(),
            "invalid_config"
        );
        assert_eq!(Error::NodeNotFound("/x".into()).code(), "not_found");
        assert_eq!(
            Error::from(XgError::LoginFailed {
                gateway: "1.1.1.1".into(),
                reason: "denied".into()
            })
            .code(),
            "login_failed"
        );
        assert_eq!(
            Error::from(XgError::Request("timeout".into())).code(),
            "gateway_error"
        );
    }
}
