// Model exports
pub mod domain;
pub mod requests;
pub mod responses;
pub mod scorer;

pub use domain::{
    Gender, LifestyleAttributes, MatchRequest, NewMatchRequest, Profile, ProfileRecord,
    ProfileStatus, RankedCandidate, RequestStatus, SurveySubmission, WeightRecord,
};
pub use requests::{
    CalibrationRequest, FeedbackRequest, FindMatchesRequest, RespondRequest, SendRequestRequest,
    SurveyRequest, UserQuery,
};
pub use responses::{
    CalibrationResponse, CardsResponse, ErrorResponse, FeedbackResponse, FindMatchesResponse,
    HealthResponse, IncomingRequest, SendRequestResponse, SenderSummary, SurveyResponse,
};
pub use scorer::{
    FeedbackScoreRequest, MatchScoreRequest, MatchScoreResponse, ProfilePayload, ScoredResult,
    SleepHabit, WeightMap,
};
