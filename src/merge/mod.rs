//! Folding part responses into a [`FeedRecord`].
//!
//! Merging is a pure function of its inputs: the prior record, the outcome of
//! one conditional fetch, the cycle timestamp and the result bound.

use chrono::{DateTime, Utc};

use crate::app::{Result, TubeError};
use crate::domain::{ChannelInfo, FeedRecord, FeedType, Part, PlaylistState, VideoSet};
use crate::fetcher::PartOutcome;
use crate::normalizer::Payload;

#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    Unchanged,
    Updated(FeedRecord),
}

impl Merged {
    pub fn is_updated(&self) -> bool {
        matches!(self, Merged::Updated(_))
    }
}

/// Apply `outcome` for `part` to `record`.
///
/// Only the subtree of `part` is replaced, together with its etag. `now` is
/// the start of the refresh cycle, so every part merged in one cycle stamps
/// the same `updated_at`. Lists are cut to `limit` entries from the front,
/// which keeps the newest.
pub fn merge(
    record: &FeedRecord,
    part: Part,
    outcome: PartOutcome,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Merged> {
    let payload = match outcome {
        PartOutcome::Unchanged => return Ok(Merged::Unchanged),
        PartOutcome::Updated(payload) => payload,
    };

    if payload.part() != part {
        return Err(TubeError::validation(
            part,
            format!("received a {} payload", payload.part()),
        ));
    }

    let mut next = record.clone();

    match payload {
        Payload::Channel { etag, channels } => {
            if record.key().feed_type() != FeedType::Channel {
                return Err(TubeError::validation(part, "playlist feeds have no channel part"));
            }

            let channel = channels.into_iter().next().ok_or_else(|| TubeError::NotFound {
                part,
                id: record.key().id().to_string(),
            })?;

            next.channel = Some(ChannelInfo { etag, ..channel });
        }
        Payload::Playlist { etag, mut video_ids } => {
            video_ids.truncate(limit);
            next.playlist = PlaylistState {
                etag: Some(etag),
                video_ids,
            };
        }
        Payload::Videos { etag, mut items } => {
            items.truncate(limit);
            next.videos = VideoSet {
                etag: Some(etag),
                items,
            };
        }
    }

    next.updated_at = Some(now);
    Ok(Merged::Updated(next))
}
