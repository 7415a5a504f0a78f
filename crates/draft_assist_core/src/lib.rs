pub mod audit;
pub mod cache;
pub mod clock;
pub mod document;
pub mod domain;
pub mod ports;
pub mod prompt;
pub mod recovery;
pub mod relay;
pub mod session;
pub mod suggestion;

pub use audit::AuditRecorder;
pub use cache::{Fingerprint, SuggestionCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use document::DocumentService;
pub use domain::{
    AuditAction, AuditEntry, DocumentKind, DocumentRecord, DocumentStatus, GenerationRequest,
    NewDocument, Suggestion, SuggestionContext, SuggestionResponse,
};
pub use ports::{ChunkSource, DatabaseService, FragmentStream, PortError, PortResult};
pub use recovery::{RecoveryEngine, RecoveryStage};
pub use relay::StreamRelay;
pub use session::{GenerationHandle, GenerationSessionManager, SessionRegistry, SessionReport, SessionState};
pub use suggestion::SuggestionService;
