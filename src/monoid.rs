use rustc_hash::FxHashMap;
use std::hash::Hash;

pub trait Moniod {
    fn zero() -> Self;
    fn op(self, other: Self) -> Self;
    fn op_mut(&mut self, other: Self);
    fn len(&self) -> usize;
}

impl<A, B> Moniod for FxHashMap<A, B>
where
    A: Eq + Hash,
    B: Moniod,
{
    fn zero() -> Self {
        FxHashMap::default()
    }

    fn op(self, other: Self) -> Self {
        let mut agg = self;
        for (k, v) in other {
            agg.entry(k).or_insert(B::zero()).op_mut(v);
        }
        agg
    }

    fn op_mut(&mut self, other: Self) {
        for (k, v) in other {
            self.entry(k).or_insert(B::zero()).op_mut(v)
        }
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Observed-base tallies, indexed A, C, G, T.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BaseCounts(pub [u64; 4]);

impl BaseCounts {
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl From<[u32; 4]> for BaseCounts {
    fn from(counts: [u32; 4]) -> Self {
        Self(counts.map(|c| c as u64))
    }
}

impl Moniod for BaseCounts {
    fn zero() -> Self {
        Self::default()
    }

    fn op(self, other: Self) -> Self {
        let mut this = self;
        this.op_mut(other);
        this
    }

    fn op_mut(&mut self, other: Self) {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a += b;
        }
    }

    fn len(&self) -> usize {
        self.total() as usize
    }
}
