use std::time::Duration;

use futures::{
    Stream, StreamExt,
    future::{self, Either},
    stream,
};

/// Quiet period after the last keystroke before a query is searched.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Returns stream of settled values of `input`.
///
/// A value is emitted once `delay` passes without a newer input value. A
/// pending value is flushed when `input` ends. Equal consecutive settled
/// values are all emitted, deciding whether a repeated value needs work
/// again is up to the consumer.
///
/// Timer is provided by `sleep`, e.g. [`tokio::time::sleep`].
pub fn debounce<T, S, SFut>(
    input: impl Stream<Item = T>,
    delay: Duration,
    sleep: S,
) -> impl Stream<Item = T>
where
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    stream::unfold(
        (Box::pin(input), None::<T>, false),
        move |(mut input, mut pending, ended)| async move {
            if ended {
                // Flush
                return pending.map(|value| (value, (input, None, true)));
            }

            loop {
                let Some(current) = pending.take() else {
                    match input.next().await {
                        Some(value) => pending = Some(value),
                        None => return None,
                    }
                    continue;
                };

                let timer = Box::pin(sleep(delay));
                let next = match future::select(input.next(), timer).await {
                    Either::Left((next, _)) => Some(next),
                    Either::Right(_) => None,
                };
                match next {
                    Some(Some(value)) => pending = Some(value),
                    Some(None) => return Some((current, (input, None, true))),
                    // Quiet period elapsed
                    None => return Some((current, (input, None, false))),
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_last_value() {
        let (tx, rx) = mpsc::unbounded();
        let mut settled = Box::pin(debounce(rx, SEARCH_DEBOUNCE, tokio::time::sleep));

        for q in ["f", "fo", "fox"] {
            tx.unbounded_send(q.to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(settled.next().await.as_deref(), Some("fox"));

        drop(tx);
        assert_eq!(settled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_settled_value_emitted_again() {
        let (tx, rx) = mpsc::unbounded();
        let mut settled = Box::pin(debounce(rx, SEARCH_DEBOUNCE, tokio::time::sleep));

        tx.unbounded_send("fox".to_string()).unwrap();
        assert_eq!(settled.next().await.as_deref(), Some("fox"));

        // Edited and reverted within the quiet period
        tx.unbounded_send("foxe".to_string()).unwrap();
        tx.unbounded_send("fox".to_string()).unwrap();
        assert_eq!(settled.next().await.as_deref(), Some("fox"));

        drop(tx);
        assert_eq!(settled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_flushed_on_end() {
        let input = stream::iter(vec!["f".to_string(), "fo".to_string()]);
        let settled: Vec<_> = debounce(input, SEARCH_DEBOUNCE, tokio::time::sleep).collect().await;
        assert_eq!(settled, vec!["fo".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_quiet_period() {
        let (tx, rx) = mpsc::unbounded();
        let settled = debounce(rx, SEARCH_DEBOUNCE, tokio::time::sleep);
        let started = tokio::time::Instant::now();

        tx.unbounded_send("giraffe".to_string()).unwrap();
        let (value, _) = Box::pin(settled).into_future().await;
        assert_eq!(value.as_deref(), Some("giraffe"));
        assert!(started.elapsed() >= SEARCH_DEBOUNCE);
    }
}
