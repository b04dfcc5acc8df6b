use thiserror::Error;
use tshell_i18n::I18nError;
use tshell_runtime::TriggerError;
use tshell_state::StateError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    I18n(#[from] I18nError),

    #[error(transparent)]
    Trigger(TriggerError),
}

/// A state trigger that failed on an invalid payload surfaces as
/// [`AppError::State`]; every other trigger error stays wrapped.
impl From<TriggerError> for AppError {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::Failed { name, source } => match source.downcast::<StateError>() {
                Ok(state) => Self::State(*state),
                Err(source) => Self::Trigger(TriggerError::Failed { name, source }),
            },
            other => Self::Trigger(other),
        }
    }
}
