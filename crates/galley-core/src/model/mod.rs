//! Domain model: the manuscript aggregate, payments, reviews and their
//! closed enumerations.

pub mod ids;
pub mod manuscript;
pub mod payment;
pub mod review;
pub mod status;

pub use ids::{AccountId, FileId, ManuscriptId, PaymentId, ReviewId};
pub use manuscript::{
    AcceptanceRecord, Approval, Author, AuthorCopyEditReview, CopyEditorAssignment, FileRef,
    GalleyProof, Manuscript, Metrics, Publication, RevisionRecord,
};
pub use payment::{Discount, Payment, PaymentStatus, format_amount};
pub use review::{MeanRatings, Ratings, Recommendation, Review, ReviewStatus, ReviewSummary};
pub use status::{
    ArticleType, CopyEditStage, DraftStatus, InvalidStageTransition, InvalidTransition,
    ManuscriptStatus, ParseEnumError, phase_is_consistent,
};
