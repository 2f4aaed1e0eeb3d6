//! Peer review aggregate and the per-round summary fed to editorial decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids::{AccountId, ManuscriptId, ReviewId};
use super::status::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

impl Recommendation {
    pub const ALL: [Self; 4] = [
        Self::Accept,
        Self::MinorRevision,
        Self::MajorRevision,
        Self::Reject,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::MinorRevision => "minor-revision",
            Self::MajorRevision => "major-revision",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Recommendation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "recommendation",
                got: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    Pending,
    Submitted,
}

/// Numeric ratings, each on a 1-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub originality: u8,
    pub methodology: u8,
    pub clarity: u8,
    pub significance: u8,
}

impl Ratings {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Return the name of the first rating outside `1..=5`.
    #[must_use]
    pub fn out_of_range(&self) -> Option<&'static str> {
        [
            ("originality", self.originality),
            ("methodology", self.methodology),
            ("clarity", self.clarity),
            ("significance", self.significance),
        ]
        .into_iter()
        .find(|(_, value)| !(Self::MIN..=Self::MAX).contains(value))
        .map(|(name, _)| name)
    }
}

/// Review aggregate. One per reviewer per review round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub manuscript_id: ManuscriptId,
    pub reviewer_id: AccountId,
    pub reviewer_email: String,
    pub round: u32,
    pub status: ReviewStatus,
    pub assigned_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Ratings>,
    /// Visible to the authors.
    #[serde(default)]
    pub comments_for_author: String,
    /// Visible to editors only.
    #[serde(default)]
    pub confidential_comments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Mean of each rating across completed reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanRatings {
    pub originality: f64,
    pub methodology: f64,
    pub clarity: f64,
    pub significance: f64,
}

/// Aggregate view of one review round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub round: u32,
    pub assigned: usize,
    pub completed: usize,
    pub recommendations: BTreeMap<Recommendation, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_ratings: Option<MeanRatings>,
    /// Set when every completed review recommends the same outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<Recommendation>,
}

impl ReviewSummary {
    /// Summarize the reviews belonging to `round`; other rounds are ignored.
    #[must_use]
    pub fn for_round<'a>(round: u32, reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let mut assigned = 0;
        let mut recommendations = BTreeMap::new();
        let mut ratings = Vec::new();

        for review in reviews.into_iter().filter(|r| r.round == round) {
            assigned += 1;
            if review.status != ReviewStatus::Submitted {
                continue;
            }
            if let Some(rec) = review.recommendation {
                *recommendations.entry(rec).or_insert(0) += 1;
            }
            if let Some(r) = review.ratings {
                ratings.push(r);
            }
        }

        let completed = recommendations.values().sum();
        let consensus = if recommendations.len() == 1 {
            recommendations.keys().next().copied()
        } else {
            None
        };

        Self {
            round,
            assigned,
            completed,
            recommendations,
            mean_ratings: mean(&ratings),
            consensus,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(ratings: &[Ratings]) -> Option<MeanRatings> {
    if ratings.is_empty() {
        return None;
    }
    let n = ratings.len() as f64;
    let avg = |pick: fn(&Ratings) -> u8| ratings.iter().map(|r| f64::from(pick(r))).sum::<f64>() / n;
    Some(MeanRatings {
        originality: avg(|r| r.originality),
        methodology: avg(|r| r.methodology),
        clarity: avg(|r| r.clarity),
        significance: avg(|r| r.significance),
    })
}
