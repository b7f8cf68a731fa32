use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(".env file not found at {}", path.display())]
    EnvFileMissing { path: PathBuf },

    #[error("Missing Neo4j connection info in {}: {}", path.display(), keys.join(", "))]
    MissingFields { path: PathBuf, keys: Vec<&'static str> },

    #[error("{tool} not found")]
    ToolMissing { tool: String, hint: &'static str },

    #[error("{step} failed (exit code {code})")]
    ChildFailed { step: String, code: i32 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    /// Process exit code for this error. Child failures pass their own code
    /// through; everything else is a plain `1`.
    pub fn exit_code(&self) -> u8 {
        match self {
            HarnessError::ChildFailed { code, .. } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(c) => c,
            },
            _ => 1,
        }
    }

    /// Remediation text printed under the error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            HarnessError::EnvFileMissing { .. } => Some(
                "Please copy .env.sample to .env and add your Neo4j credentials".to_string(),
            ),
            HarnessError::MissingFields { .. } => Some(
                "Please ensure NEO4J_URI, NEO4J_USERNAME, and NEO4J_PASSWORD are set".to_string(),
            ),
            HarnessError::ToolMissing { hint, .. } => Some((*hint).to_string()),
            _ => None,
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_failure_propagates_its_code() {
        let err = HarnessError::ChildFailed {
            step: "docker build".into(),
            code: 3,
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn out_of_range_or_zero_codes_collapse_to_one() {
        for code in [0, -1, 300] {
            let err = HarnessError::ChildFailed {
                step: "server".into(),
                code,
            };
            assert_eq!(err.exit_code(), 1, "code {code}");
        }
    }

    #[test]
    fn missing_tool_is_exit_one_with_hint() {
        let err = HarnessError::ToolMissing {
            tool: "docker".into(),
            hint: "Please install Docker: https://docs.docker.com/get-docker/",
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.hint().unwrap().contains("get-docker"));
    }
}
