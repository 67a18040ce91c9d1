//! Asynchronous iteration combinators.
//!
//! Apply an async operation to every item of an ordered collection under
//! one of several scheduling/failure policies. Sequential combinators
//! (`find`, `map`, `reduce`) strictly serialize by input order and never
//! start an item after a short-circuit. Parallel combinators (`filter`,
//! `every`, `all`, `some`, `race`) launch every operation up front and,
//! with the exception of `race`, report results in input index order no
//! matter the completion order.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Sequential. Resolves with the first item whose operation succeeds,
/// skipping the remaining items. Fails with the *last* error when every
/// item fails; an empty input succeeds with no value.
pub async fn find<I, T, F, Fut, U, E>(items: I, mut op: F) -> Result<Option<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut last = None;
    for item in items {
        match op(item).await {
            Ok(value) => return Ok(Some(value)),
            Err(error) => last = Some(error),
        }
    }
    match last {
        Some(error) => Err(error),
        None => Ok(None),
    }
}

/// Sequential. Resolves with every result in input order; the first
/// failure aborts and the remaining operations are never invoked.
pub async fn map<I, T, F, Fut, U, E>(items: I, mut op: F) -> Result<Vec<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut out = Vec::new();
    for item in items {
        out.push(op(item).await?);
    }
    Ok(out)
}

/// Sequential left fold. The accumulator is threaded through every
/// operation; the first failure aborts and the remaining operations are
/// never invoked.
pub async fn reduce<I, T, A, F, Fut, E>(items: I, init: A, mut op: F) -> Result<A, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(A, T) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    let mut acc = init;
    for item in items {
        acc = op(acc, item).await?;
    }
    Ok(acc)
}

/// Parallel. Always resolves with the successful results in original
/// index order; failed items are silently omitted. Never fails.
pub async fn filter<I, T, F, Fut, U, E>(items: I, mut op: F) -> Vec<U>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut pending = FuturesUnordered::new();
    for (index, item) in items.into_iter().enumerate() {
        let fut = op(item);
        pending.push(async move { (index, fut.await) });
    }

    let mut slots: Vec<Option<U>> = std::iter::repeat_with(|| None).take(pending.len()).collect();
    while let Some((index, result)) = pending.next().await {
        if let Ok(value) = result {
            slots[index] = Some(value);
        }
    }
    slots.into_iter().flatten().collect()
}

/// Parallel. Waits for every item to settle; resolves with all results
/// in index order only when all succeed. When operations fail, the error
/// reported is whichever failure settled *last*.
pub async fn every<I, T, F, Fut, U, E>(items: I, mut op: F) -> Result<Vec<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut pending = FuturesUnordered::new();
    for (index, item) in items.into_iter().enumerate() {
        let fut = op(item);
        pending.push(async move { (index, fut.await) });
    }

    let mut slots: Vec<Option<U>> = std::iter::repeat_with(|| None).take(pending.len()).collect();
    let mut failure = None;
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(error) => failure = Some(error),
        }
    }
    match failure {
        Some(error) => Err(error),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

/// Parallel, fail-fast. Resolves with all results in index order; the
/// first failure to settle decides the outcome and still-pending
/// operations are abandoned.
pub async fn all<I, T, F, Fut, U, E>(items: I, mut op: F) -> Result<Vec<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut pending = FuturesUnordered::new();
    for (index, item) in items.into_iter().enumerate() {
        let fut = op(item);
        pending.push(async move { (index, fut.await) });
    }

    let mut slots: Vec<Option<U>> = std::iter::repeat_with(|| None).take(pending.len()).collect();
    while let Some((index, result)) = pending.next().await {
        slots[index] = Some(result?);
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Parallel. Waits for every item to settle; resolves with the subset of
/// successful results in index order once at least one succeeds. When no
/// item succeeds, fails with the last-settled error.
pub async fn some<I, T, F, Fut, U, E>(items: I, mut op: F) -> Result<Vec<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut pending = FuturesUnordered::new();
    for (index, item) in items.into_iter().enumerate() {
        let fut = op(item);
        pending.push(async move { (index, fut.await) });
    }

    let mut slots: Vec<Option<U>> = std::iter::repeat_with(|| None).take(pending.len()).collect();
    let mut failure = None;
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(error) => failure = Some(error),
        }
    }
    let values: Vec<U> = slots.into_iter().flatten().collect();
    if values.is_empty() {
        if let Some(error) = failure {
            return Err(error);
        }
    }
    Ok(values)
}

/// Parallel. The first item to settle decides the outcome, success or
/// failure alike. An empty input resolves with no value.
pub async fn race<I, T, F, Fut, U, E>(items: I, mut op: F) -> Result<Option<U>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let mut pending = FuturesUnordered::new();
    for (index, item) in items.into_iter().enumerate() {
        let fut = op(item);
        pending.push(async move { (index, fut.await) });
    }

    match pending.next().await {
        Some((_, result)) => result.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use tokio::time::sleep;

    async fn fail_unless(wanted: u32, value: u32) -> Result<u32, String> {
        if value == wanted {
            Ok(value)
        } else {
            Err(format!("not {value}"))
        }
    }

    #[tokio::test]
    async fn find_first_success() {
        let found = find([1, 2, 3, 4], |v| fail_unless(4, v)).await;
        assert_eq!(found, Ok(Some(4)));
    }

    #[tokio::test]
    async fn find_short_circuits() {
        let calls = Cell::new(0u32);
        let found = find([1, 2, 3, 4], |v| {
            calls.set(calls.get() + 1);
            fail_unless(2, v)
        })
        .await;
        assert_eq!(found, Ok(Some(2)));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn find_all_failing_rejects_with_last_error() {
        let found = find([1, 2, 3], |v| fail_unless(9, v)).await;
        assert_eq!(found, Err("not 3".to_string()));
    }

    #[tokio::test]
    async fn find_empty_succeeds_with_no_value() {
        let found: Result<Option<u32>, String> = find([], |v| fail_unless(1, v)).await;
        assert_eq!(found, Ok(None));
    }

    #[tokio::test]
    async fn map_preserves_order() {
        let out = map([1, 2, 3], |v| async move { Ok::<_, String>(v * 10) }).await;
        assert_eq!(out, Ok(vec![10, 20, 30]));
    }

    #[tokio::test]
    async fn map_rejects_and_never_invokes_later_items() {
        let calls = Cell::new(0u32);
        let out = map([1, 2, 3, 4], |v| {
            calls.set(calls.get() + 1);
            async move {
                if v == 2 {
                    Err("boom")
                } else {
                    Ok(v)
                }
            }
        })
        .await;
        assert_eq!(out, Err("boom"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn reduce_threads_accumulator() {
        let out = reduce([2, 3, 4], 1, |acc, v| async move { Ok::<_, String>(acc + v) }).await;
        assert_eq!(out, Ok(10));
    }

    #[tokio::test]
    async fn reduce_stops_at_first_failure() {
        let calls = Cell::new(0u32);
        let out = reduce([2, 3, 4], 1, |acc, v| {
            calls.set(calls.get() + 1);
            async move {
                if v == 3 {
                    Err("boom")
                } else {
                    Ok(acc + v)
                }
            }
        })
        .await;
        assert_eq!(out, Err("boom"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn filter_keeps_index_order_and_drops_failures() {
        let out = filter([1, 2, 3, 4], |v| async move {
            if v == 2 {
                Err("rejected")
            } else {
                Ok(v * 2)
            }
        })
        .await;
        assert_eq!(out, vec![2, 6, 8]);
    }

    #[tokio::test]
    async fn filter_all_failing_is_empty_success() {
        let out = filter([1, 2], |_| async { Err::<u32, _>("no") }).await;
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn every_orders_by_index_not_completion() {
        let out = every([30u64, 10, 20], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(ms)
        })
        .await;
        assert_eq!(out, Ok(vec![30, 10, 20]));
    }

    #[tokio::test(start_paused = true)]
    async fn every_reports_last_settled_failure() {
        let out = every([30u64, 10, 20], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            if ms == 30 || ms == 10 {
                Err(format!("failed {ms}"))
            } else {
                Ok(ms)
            }
        })
        .await;
        // 10 fails first, 30 fails last; the last settlement is reported.
        assert_eq!(out, Err("failed 30".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn all_fails_with_first_settled_error() {
        let out = all([30u64, 10, 20], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            if ms == 30 || ms == 10 {
                Err(format!("failed {ms}"))
            } else {
                Ok(ms)
            }
        })
        .await;
        assert_eq!(out, Err("failed 10".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn all_success_keeps_index_order() {
        let out = all([30u64, 10, 20], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(ms)
        })
        .await;
        assert_eq!(out, Ok(vec![30, 10, 20]));
    }

    #[tokio::test(start_paused = true)]
    async fn some_returns_successful_subset() {
        let out = some([1u64, 2, 3], |v| async move {
            sleep(Duration::from_millis(v)).await;
            if v == 2 {
                Err("no")
            } else {
                Ok(v)
            }
        })
        .await;
        assert_eq!(out, Ok(vec![1, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn some_all_failing_reports_last_settled_error() {
        let out = some([30u64, 10, 20], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Err::<u64, _>(format!("failed {ms}"))
        })
        .await;
        assert_eq!(out, Err("failed 30".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn race_first_settlement_wins_by_time() {
        let out = race([40u64, 20, 60], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(ms)
        })
        .await;
        assert_eq!(out, Ok(Some(20)));
    }

    #[tokio::test(start_paused = true)]
    async fn race_first_settlement_may_be_a_failure() {
        let out = race([40u64, 20], |ms| async move {
            sleep(Duration::from_millis(ms)).await;
            if ms == 20 {
                Err("lost")
            } else {
                Ok(ms)
            }
        })
        .await;
        assert_eq!(out, Err("lost"));
    }
}
