//! Stream throttling utilities

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most once per `duration`, keeping only the latest item that
    /// arrived during each interval.
    fn throttle(self, duration: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, duration)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Latest-wins rate limiter over a stream.
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        latest: Option<S::Item>,
        done: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, duration: Duration) -> Self {
        let mut interval = interval(duration);
        // don't burst after a stall
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { stream, interval, latest: None, done: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if this.latest.is_none() {
            return if *this.done { Poll::Ready(None) } else { Poll::Pending };
        }
        // the final item is flushed without waiting for the next tick
        if !*this.done && this.interval.poll_tick(cx).is_pending() {
            return Poll::Pending;
        }
        Poll::Ready(this.latest.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::channel::mpsc;

    #[tokio::test(start_paused = true)]
    async fn keeps_latest_item_per_interval() {
        let (tx, rx) = mpsc::unbounded();
        let mut throttled = rx.throttle(Duration::from_millis(100));
        for i in 0..5 {
            tx.unbounded_send(i).unwrap();
        }
        // first tick fires immediately
        assert_eq!(throttled.next().await, Some(4));

        tx.unbounded_send(5).unwrap();
        tx.unbounded_send(6).unwrap();
        assert_eq!(throttled.next().await, Some(6));

        tx.unbounded_send(7).unwrap();
        drop(tx);
        assert_eq!(throttled.next().await, Some(7));
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_source_does_not_end_stream() {
        let (tx, rx) = mpsc::unbounded::<i32>();
        let mut throttled = rx.throttle(Duration::from_millis(10));
        let waited = tokio::time::timeout(Duration::from_millis(50), throttled.next()).await;
        assert!(waited.is_err(), "stream must stay pending while the source is idle");
        tx.unbounded_send(1).unwrap();
        assert_eq!(throttled.next().await, Some(1));
    }
}
