use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::InvalidRequest(_) => {
                "The request could not be processed. Please provide a prompt.".to_string()
            }
        }
    }
}
