pub mod feed;
pub mod item;

pub use feed::{ChannelInfo, FeedKey, FeedRecord, FeedType, Part, PlaylistState, VideoSet};
pub use item::{LiveStream, VideoItem};
