//! crates/draft_assist_core/src/relay.rs
//!
//! Forwards fragments from a chunk source to the caller while accumulating the
//! full text. The two sides are joined by a bounded channel: the pump only
//! pulls the next fragment once the caller has room for it.

use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ports::{FragmentStream, PortError, PortResult};

pub const DEFAULT_RELAY_CAPACITY: usize = 8;

/// How a relayed stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The source finished; `text` is the concatenation of every fragment.
    Completed { text: String, fragments: usize },
    /// The source failed after `fragments` fragments. The caller has received
    /// all of them, followed by the error.
    Failed {
        partial: String,
        fragments: usize,
        error: PortError,
    },
    /// The caller went away; consumption stopped.
    Disconnected { partial: String, fragments: usize },
}

impl RelayOutcome {
    pub fn fragments(&self) -> usize {
        match self {
            Self::Completed { fragments, .. }
            | Self::Failed { fragments, .. }
            | Self::Disconnected { fragments, .. } => *fragments,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StreamRelay {
    capacity: usize,
    deadline: Option<Duration>,
}

impl Default for StreamRelay {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_CAPACITY)
    }
}

impl StreamRelay {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            deadline: None,
        }
    }

    /// Bounds total generation time. An elapsed deadline ends the stream with
    /// [`PortError::Timeout`].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Creates the pump and the caller-facing stream for one generation.
    pub fn open(&self) -> (RelayPump, FragmentStream) {
        let (tx, mut rx) = mpsc::channel::<PortResult<String>>(self.capacity);
        let fragments = async_stream::stream! {
            while let Some(item) = rx.recv().await {
                let terminal = item.is_err();
                yield item;
                if terminal {
                    break;
                }
            }
        };
        let pump = RelayPump {
            tx,
            deadline: self.deadline,
        };
        (pump, Box::pin(fragments))
    }
}

/// The source-facing half of a relay.
pub struct RelayPump {
    tx: mpsc::Sender<PortResult<String>>,
    deadline: Option<Duration>,
}

impl RelayPump {
    /// Drives `source` to the end, forwarding every fragment in order.
    pub async fn run(self, source: FragmentStream) -> RelayOutcome {
        match self.deadline {
            Some(limit) => {
                let mut text = String::new();
                let mut fragments = 0;
                match tokio::time::timeout(limit, pump(&self.tx, source, &mut text, &mut fragments))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let error = PortError::Timeout(format!(
                            "generation exceeded {} seconds",
                            limit.as_secs()
                        ));
                        warn!(fragments, "Generation timed out");
                        // Best effort: the caller may already be gone.
                        let _ = self.tx.send(Err(error.clone())).await;
                        RelayOutcome::Failed {
                            partial: text,
                            fragments,
                            error,
                        }
                    }
                }
            }
            None => {
                let mut text = String::new();
                let mut fragments = 0;
                pump(&self.tx, source, &mut text, &mut fragments).await
            }
        }
    }
}

async fn pump(
    tx: &mpsc::Sender<PortResult<String>>,
    mut source: FragmentStream,
    text: &mut String,
    fragments: &mut usize,
) -> RelayOutcome {
    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => None,
            item = source.next() => Some(item),
        };
        let Some(item) = next else {
            debug!(fragments = *fragments, "Caller disconnected; stopping consumption");
            return RelayOutcome::Disconnected {
                partial: std::mem::take(text),
                fragments: *fragments,
            };
        };

        match item {
            Some(Ok(fragment)) => {
                text.push_str(&fragment);
                *fragments += 1;
                if tx.send(Ok(fragment)).await.is_err() {
                    debug!(fragments = *fragments, "Caller disconnected; stopping consumption");
                    return RelayOutcome::Disconnected {
                        partial: std::mem::take(text),
                        fragments: *fragments,
                    };
                }
            }
            Some(Err(error)) => {
                warn!(fragments = *fragments, error = %error, "Chunk source failed mid-stream");
                let _ = tx.send(Err(error.clone())).await;
                return RelayOutcome::Failed {
                    partial: std::mem::take(text),
                    fragments: *fragments,
                    error,
                };
            }
            None => {
                return RelayOutcome::Completed {
                    text: std::mem::take(text),
                    fragments: *fragments,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn source(items: Vec<PortResult<&'static str>>) -> FragmentStream {
        Box::pin(stream::iter(
            items.into_iter().map(|item| item.map(str::to_string)),
        ))
    }

    #[tokio::test]
    async fn fragments_arrive_in_order_and_accumulate() {
        let (pump, caller) = StreamRelay::new(1).open();
        let task = tokio::spawn(pump.run(source(vec![Ok("Hot "), Ok("work "), Ok("permit")])));

        let delivered: Vec<_> = caller.collect().await;
        let delivered: Vec<String> = delivered.into_iter().map(Result::unwrap).collect();
        assert_eq!(delivered, vec!["Hot ", "work ", "permit"]);

        let outcome = task.await.unwrap();
        assert_eq!(
            outcome,
            RelayOutcome::Completed {
                text: "Hot work permit".to_string(),
                fragments: 3
            }
        );
    }

    #[tokio::test]
    async fn failure_is_delivered_after_partial_fragments() {
        let (pump, caller) = StreamRelay::default().open();
        let failing = source(vec![
            Ok("one "),
            Ok("two "),
            Err(PortError::RateLimited("429".to_string())),
            Ok("never"),
        ]);
        let task = tokio::spawn(pump.run(failing));

        let delivered: Vec<_> = caller.collect().await;
        assert_eq!(delivered.len(), 3);
        assert_eq!(delivered[0].as_deref(), Ok("one "));
        assert_eq!(delivered[1].as_deref(), Ok("two "));
        assert!(matches!(delivered[2], Err(PortError::RateLimited(_))));

        match task.await.unwrap() {
            RelayOutcome::Failed {
                partial, fragments, ..
            } => {
                assert_eq!(partial, "one two ");
                assert_eq!(fragments, 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn dropped_caller_stops_consumption() {
        let (pump, mut caller) = StreamRelay::new(1).open();
        let endless: FragmentStream = Box::pin(stream::repeat_with(|| Ok("tick ".to_string())));
        let task = tokio::spawn(pump.run(endless));

        assert_eq!(caller.next().await, Some(Ok("tick ".to_string())));
        drop(caller);

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, RelayOutcome::Disconnected { .. }));
        assert!(outcome.fragments() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_a_stalled_source_into_a_timeout() {
        let (pump, caller) = StreamRelay::new(4)
            .with_deadline(Duration::from_secs(5))
            .open();
        let stalled: FragmentStream = Box::pin(
            stream::iter(vec![Ok("partial".to_string())]).chain(stream::pending()),
        );
        let task = tokio::spawn(pump.run(stalled));

        let delivered: Vec<_> = caller.collect().await;
        assert_eq!(delivered.len(), 2);
        assert!(matches!(delivered[1], Err(PortError::Timeout(_))));

        match task.await.unwrap() {
            RelayOutcome::Failed { partial, error, .. } => {
                assert_eq!(partial, "partial");
                assert_eq!(error.kind(), "UpstreamTimeoutError");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
