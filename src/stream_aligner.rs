use std::fmt::Display;

use crate::errs::EditError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinMode {
    /// Yield only positions present in every stream, stop when any stream
    /// runs out.
    Inner,
    /// Yield every position present in at least one stream, `None` where a
    /// stream has no entry, until all streams run out.
    Outer,
}

/// Merge-join over N iterators that are each sorted ascending. Holds at most
/// one look-ahead element per stream.
pub struct SortedStreamAligner<T, I>
where
    I: Iterator<Item = anyhow::Result<T>>,
{
    streams: Vec<I>,
    heads: Vec<Option<T>>,
    mode: JoinMode,
    primed: bool,
    finished: bool,
}

impl<T, I> SortedStreamAligner<T, I>
where
    T: Ord + Display,
    I: Iterator<Item = anyhow::Result<T>>,
{
    pub fn new(streams: Vec<I>, mode: JoinMode) -> Self {
        let heads = streams.iter().map(|_| None).collect();
        Self { streams, heads, mode, primed: false, finished: false }
    }

    /// Pulls the next element of stream `idx` into its head slot and returns
    /// the element it replaces.
    fn advance(&mut self, idx: usize) -> anyhow::Result<Option<T>> {
        let next = self.streams[idx].next().transpose()?;
        if let (Some(previous), Some(next)) =
            (self.heads[idx].as_ref(), next.as_ref())
        {
            if next < previous {
                return Err(EditError::new_alignment_error(format!(
                    "input {} is not sorted, {next} comes after {previous}",
                    idx + 1
                ))
                .into());
            }
        }
        Ok(std::mem::replace(&mut self.heads[idx], next))
    }

    fn step(&mut self) -> anyhow::Result<Option<Vec<Option<T>>>> {
        if !self.primed {
            for idx in 0..self.streams.len() {
                let _ = self.advance(idx)?;
            }
            self.primed = true;
        }
        loop {
            if self.mode == JoinMode::Inner
                && self.heads.iter().any(|head| head.is_none())
            {
                return Ok(None);
            }
            let at_minimum = match self.heads.iter().flatten().min() {
                Some(minimum) => self
                    .heads
                    .iter()
                    .map(|head| head.as_ref() == Some(minimum))
                    .collect::<Vec<bool>>(),
                None => return Ok(None),
            };
            let complete = at_minimum.iter().all(|hit| *hit);
            if self.mode == JoinMode::Inner && !complete {
                for idx in 0..at_minimum.len() {
                    if at_minimum[idx] {
                        let _ = self.advance(idx)?;
                    }
                }
                continue;
            }
            let tuple = at_minimum
                .iter()
                .enumerate()
                .map(|(idx, hit)| if *hit { self.advance(idx) } else { Ok(None) })
                .collect::<anyhow::Result<Vec<Option<T>>>>()?;
            return Ok(Some(tuple));
        }
    }
}

impl<T, I> Iterator for SortedStreamAligner<T, I>
where
    T: Ord + Display,
    I: Iterator<Item = anyhow::Result<T>>,
{
    type Item = anyhow::Result<Vec<Option<T>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.step() {
            Ok(Some(tuple)) => Some(Ok(tuple)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Tuples of positions present in all streams.
pub fn shared_elements<T, I>(
    streams: Vec<I>,
) -> impl Iterator<Item = anyhow::Result<Vec<T>>>
where
    T: Ord + Display,
    I: Iterator<Item = anyhow::Result<T>>,
{
    SortedStreamAligner::new(streams, JoinMode::Inner)
        .map(|tuple| tuple.map(|elements| elements.into_iter().flatten().collect()))
}

/// Tuples of positions present in any stream, missing entries are `None`.
pub fn align_elements<T, I>(streams: Vec<I>) -> SortedStreamAligner<T, I>
where
    T: Ord + Display,
    I: Iterator<Item = anyhow::Result<T>>,
{
    SortedStreamAligner::new(streams, JoinMode::Outer)
}
