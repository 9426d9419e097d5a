//! Request/response boundary to an external schedule advisor.
//!
//! An advisor can propose a conflict-serializable reordering of a schedule
//! and discuss view serializability when the precedence graph has a cycle.
//! Answers are passed through as-is; a returned schedule is not checked.
//! Failures become an [`AdvisorOutcome::Failed`] message and never touch
//! the analysis they were asked about.

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt::{Display, Formatter, Result};

use derive_more::From;

use crate::analysis::ScheduleAnalysis;
use crate::conflict::describe_cycle;

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderRequest {
    pub schedule: String,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderResponse {
    pub reordered_schedule: String,
    pub explanation: String,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionRequest {
    pub schedule: String,
    pub conflict_cycle_info: String,
}

impl DiscussionRequest {
    /// A discussion request for a non-serializable analysis, `None` when the
    /// schedule is conflict serializable.
    #[must_use]
    pub fn for_analysis(schedule: &str, analysis: &ScheduleAnalysis) -> Option<Self> {
        (!analysis.is_serializable()).then(|| Self {
            schedule: schedule.to_string(),
            conflict_cycle_info: describe_cycle(&analysis.precedence_graph),
        })
    }
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionResponse {
    pub discussion: String,
}

/// Error returned by an advisor.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum AdvisorError {
    /// The service could not be reached or refused the request.
    #[from]
    Unavailable(String),
    /// The service answered with nothing usable.
    EmptyResponse,
}

impl Display for AdvisorError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            Self::Unavailable(reason) => write!(f, "advisor unavailable: {reason}"),
            Self::EmptyResponse => f.write_str("advisor returned an empty response"),
        }
    }
}

impl core::error::Error for AdvisorError {}

pub trait ScheduleAdvisor {
    /// Propose a conflict-serializable reordering of `request.schedule`.
    ///
    /// # Errors
    ///
    /// Returns an [`AdvisorError`] when no answer could be obtained.
    fn reorder(&self, request: &ReorderRequest) -> core::result::Result<ReorderResponse, AdvisorError>;

    /// Discuss view serializability of a schedule with a conflict cycle.
    ///
    /// # Errors
    ///
    /// Returns an [`AdvisorError`] when no answer could be obtained.
    fn discuss(
        &self,
        request: &DiscussionRequest,
    ) -> core::result::Result<DiscussionResponse, AdvisorError>;
}

/// What the user sees after consulting an advisor.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisorOutcome<T> {
    Ready(T),
    Failed(String),
}

impl<T> From<core::result::Result<T, AdvisorError>> for AdvisorOutcome<T> {
    fn from(result: core::result::Result<T, AdvisorError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => {
                tracing::debug!(%err, "advisor request failed");
                Self::Failed(format!("Advisor request failed: {err}"))
            }
        }
    }
}

pub fn request_reorder<A: ScheduleAdvisor + ?Sized>(
    advisor: &A,
    schedule: &str,
) -> AdvisorOutcome<ReorderResponse> {
    let request = ReorderRequest {
        schedule: schedule.to_string(),
    };
    advisor
        .reorder(&request)
        .and_then(|response| {
            if response.reordered_schedule.trim().is_empty() {
                Err(AdvisorError::EmptyResponse)
            } else {
                Ok(response)
            }
        })
        .into()
}

/// Ask for a discussion; `None` when the schedule is serializable and the
/// advisor is not consulted.
pub fn request_discussion<A: ScheduleAdvisor + ?Sized>(
    advisor: &A,
    schedule: &str,
    analysis: &ScheduleAnalysis,
) -> Option<AdvisorOutcome<DiscussionResponse>> {
    let request = DiscussionRequest::for_analysis(schedule, analysis)?;
    let result = advisor.discuss(&request).and_then(|response| {
        if response.discussion.trim().is_empty() {
            Err(AdvisorError::EmptyResponse)
        } else {
            Ok(response)
        }
    });
    Some(result.into())
}
