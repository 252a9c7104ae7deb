use std::fmt;

/// One unread mailbox message, as far as classification needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub snippet: String,
}

/// Closed set of classification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Interested,
    NotInterested,
    MoreInformation,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Interested,
        Category::NotInterested,
        Category::MoreInformation,
    ];

    /// Provider-side label name for this category.
    pub fn label_name(&self) -> &'static str {
        match self {
            Category::Interested => "Interested",
            Category::NotInterested => "Not Interested",
            Category::MoreInformation => "More Information",
        }
    }

    /// Maps model response text onto a category by substring containment,
    /// checked in priority order. "Interested" is tested before
    /// "Not Interested", so a literal "Not Interested" reply maps to
    /// `Interested`; anything unmatched falls back to `MoreInformation`.
    pub fn from_response(text: &str) -> Self {
        if text.contains("Interested") {
            Category::Interested
        } else if text.contains("Not Interested") {
            Category::NotInterested
        } else {
            Category::MoreInformation
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label_name())
    }
}

/// Lifecycle state of a queued notification job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(JobState::Waiting),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }
}

/// A follow-up email owned by the queue. Only the queue mutates it after
/// enqueue (attempt counter and state).
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationJob {
    pub id: i64,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attempt: i64,
    pub state: JobState,
    pub last_error: Option<String>,
}
