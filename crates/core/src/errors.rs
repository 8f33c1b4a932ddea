use thiserror::Error;
use weft_model::Pos;

/// Analysis errors surfaced by directive parsing, discovery and
/// resolution. Every variant carries the source position of the
/// offending declaration where one exists; the first error in
/// declaration order wins.
///
/// Missing dependencies are deliberately absent here: they are data on
/// the resolved graph (`Graph::missing`) and the caller decides whether
/// they are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{pos}: malformed directive: {reason}")]
    DirectiveSyntax { pos: Pos, reason: String },

    #[error("{pos}: invalid directive: {reason}")]
    DirectiveInvalid { pos: Pos, reason: String },

    #[error("{pos}: provider {func} must return (T) or (T, error)")]
    ProviderSignatureInvalid { pos: Pos, func: String },

    #[error("{pos}: invalid parameter {param:?} on API handler {func}: {reason}")]
    ApiParamInvalid {
        pos: Pos,
        func: String,
        param: String,
        reason: String,
    },

    #[error("{pos}: API handler {func} must return (), (error), (T) or (T, error)")]
    ApiResultInvalid { pos: Pos, func: String },

    #[error("{pos}: {func} is declared on config type {type_key}; config types cannot host handlers")]
    ApiOnConfig {
        pos: Pos,
        func: String,
        type_key: String,
    },

    #[error("{pos}: cron method {func} must have signature (context.Context) error")]
    CronSignatureInvalid { pos: Pos, func: String },

    #[error("{pos}: subscription method {func} must have signature (context.Context, Event[T]) error")]
    SubscribeSignatureInvalid { pos: Pos, func: String },

    #[error("{pos}: middleware {func} is invalid: {reason}")]
    MiddlewareSignatureInvalid {
        pos: Pos,
        func: String,
        reason: String,
    },

    #[error("{pos}: middleware {func} parameter {param:?} is not declared as a label")]
    MiddlewareLabelMismatch {
        pos: Pos,
        func: String,
        param: String,
    },

    #[error("{pos}: provider {func} requires unknown function {target:?}")]
    RequireUnknown {
        pos: Pos,
        func: String,
        target: String,
    },

    #[error("pick {name:?} does not match any provider")]
    PickUnknown { name: String },

    #[error("{pos}: type {type_key} is provided by both multi and non-multi providers: {}", .providers.join(", "))]
    MixedMultiAndSingle {
        pos: Pos,
        type_key: String,
        providers: Vec<String>,
    },

    #[error("{pos}: multiple providers for {type_key}, pick one of: {}", .candidates.join(", "))]
    Ambiguous {
        pos: Pos,
        type_key: String,
        candidates: Vec<String>,
    },

    #[error("root {type_key:?} does not match any provider or config")]
    RootUnknown { type_key: String },
}

impl Error {
    /// Position the error points at, when it has one.
    pub fn pos(&self) -> Option<&Pos> {
        match self {
            Error::DirectiveSyntax { pos, .. }
            | Error::DirectiveInvalid { pos, .. }
            | Error::ProviderSignatureInvalid { pos, .. }
            | Error::ApiParamInvalid { pos, .. }
            | Error::ApiResultInvalid { pos, .. }
            | Error::ApiOnConfig { pos, .. }
            | Error::CronSignatureInvalid { pos, .. }
            | Error::SubscribeSignatureInvalid { pos, .. }
            | Error::MiddlewareSignatureInvalid { pos, .. }
            | Error::MiddlewareLabelMismatch { pos, .. }
            | Error::RequireUnknown { pos, .. }
            | Error::MixedMultiAndSingle { pos, .. }
            | Error::Ambiguous { pos, .. } => Some(pos),
            Error::PickUnknown { .. } | Error::RootUnknown { .. } => None,
        }
    }
}
