pub mod collaborative;
pub mod config;
pub mod content;
pub mod domain;
pub mod errors;
pub mod recommender;

pub use collaborative::{
    BruteForceIndex, CollaborativeEngine, CsrMatrix, DistanceMetric, Neighbor, NeighborIndex,
    TrainedArtifact,
};
pub use content::ContentEngine;
pub use domain::vehicle::{derive_item_id, InventoryRecord, VehicleAttributes};
pub use errors::{
    ArtifactError, AttributeError, InterfaceError, InventoryError, RecommendError,
};
pub use recommender::{EngineStatus, Recommender, RecommenderSummary};
