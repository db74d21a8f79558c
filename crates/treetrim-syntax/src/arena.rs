use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

#[derive(Debug)]
pub struct Idx<T>(u32, PhantomData<fn() -> T>);

impl<T> std::hash::Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Idx<T> {}

impl<T> PartialOrd for Idx<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Idx<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> Idx<T> {
    pub fn new(index: u32) -> Self {
        Self(index, PhantomData)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

impl<T> From<u32> for Idx<T> {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

/// Dense side table keyed by `Idx<T>`. Every key below `len` has a value.
#[derive(Debug, Clone, PartialEq)]
pub struct IdxMap<T, V> {
    values: Vec<V>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, V> Default for IdxMap<T, V> {
    fn default() -> Self {
        Self { values: Vec::new(), _marker: PhantomData }
    }
}

impl<T, V> IdxMap<T, V> {
    pub fn filled(len: usize, value: V) -> Self
    where
        V: Clone,
    {
        Self { values: vec![value; len], _marker: PhantomData }
    }

    pub fn from_fn(len: usize, mut f: impl FnMut(Idx<T>) -> V) -> Self {
        Self { values: (0..len as u32).map(|i| f(Idx::new(i))).collect(), _marker: PhantomData }
    }

    pub fn push(&mut self, value: V) -> Idx<T> {
        let idx = self.values.len() as u32;
        self.values.push(value);
        Idx::new(idx)
    }

    pub fn get(&self, idx: Idx<T>) -> Option<&V> {
        self.values.get(idx.to_usize())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Idx<T>, &V)> + '_ {
        self.values.iter().enumerate().map(|(i, value)| (Idx::new(i as u32), value))
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T, V> Index<Idx<T>> for IdxMap<T, V> {
    type Output = V;

    #[track_caller]
    fn index(&self, index: Idx<T>) -> &Self::Output {
        &self.values[index.to_usize()]
    }
}

impl<T, V> IndexMut<Idx<T>> for IdxMap<T, V> {
    #[track_caller]
    fn index_mut(&mut self, index: Idx<T>) -> &mut Self::Output {
        &mut self.values[index.to_usize()]
    }
}
