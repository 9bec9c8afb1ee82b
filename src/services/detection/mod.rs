// Detection Module
// AI-text likelihood scoring organized into specialized submodules:
// - lexicon: phrase and vocabulary lists plus compiled patterns
// - heuristic: offline local scorer
// - external: keyed third-party detection services and the combined report

pub mod lexicon;
pub mod heuristic;
pub mod external;

pub use heuristic::{score, MIN_WORDS};
pub use external::{
    average_ai_score,
    run_all_detectors,
    DetectorClient,
    DetectorError,
    DetectorKeys,
};
