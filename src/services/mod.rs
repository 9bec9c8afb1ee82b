// ScholarPen Core Services
// Search aggregation, curation, generation and detection

pub mod config_store;
pub mod state_store;
pub mod sources;
pub mod aggregator;
pub mod filters;
pub mod selection;
pub mod analytics;
pub mod prompt;
pub mod markdown;
pub mod stream_decoder;
pub mod providers;
pub mod generation;
pub mod summarizer;
pub mod detection;

pub use config_store::*;
pub use state_store::{DocumentStore, FileStore, MemoryStore, StoreError};
pub use aggregator::{AggregateError, Aggregator, ResultCache};
pub use filters::filter_and_sort;
pub use selection::{AddOutcome, SelectedSources, SelectionError};
pub use analytics::{AnalyticsSink, NoopAnalytics, StoredAnalytics};
pub use providers::{GenerationTransport, ProviderClient, ProviderError};
pub use generation::{
    EssayRequest,
    GenerationController,
    GenerationError,
    ModelTarget,
    SessionEvent,
    SessionOutcome,
};
pub use summarizer::{Summarizer, SummaryError};
