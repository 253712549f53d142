pub mod catalog;
pub mod config;
pub mod face_validation;
pub mod generation;
pub mod intake;
pub mod mimetype_detector;
pub mod photo;
pub mod photo_store;
pub mod preview;
pub mod remote;
pub mod session;
pub mod viewer;

pub use catalog::{TemplateScene, TemplateSelection, TemplateStyle, SCENES, STYLES};
pub use face_validation::{FaceDetector, FaceValidator};
pub use generation::{
    GenerationError, GenerationOrchestrator, GenerationProgress, GenerationReport, ImageGenerator,
    RunOutcome,
};
pub use intake::{IntakeError, IntakeOutcome, PhotoFile, MAX_FILE_SIZE_BYTES, MAX_PHOTOS};
pub use photo::{FaceStatus, GeneratedPhoto, Photo, PhotoId, PhotoStatus, Rotation, SourcePhoto};
pub use photo_store::PhotoStore;
pub use remote::RemoteError;
pub use session::{Step, StudioError, StudioSession, UserAction};
pub use viewer::{ResultViewer, ViewerError};
