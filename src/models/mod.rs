mod operation;
mod place;
mod record;

pub use operation::{
    ItemResult, MetadataUpdate, WriteBackSummary, WriteOutcome, WriteProgressEvent,
};
pub use place::PlaceName;
pub use record::{CaptureTime, GpsData, ImageRecord, RecordStatus};
