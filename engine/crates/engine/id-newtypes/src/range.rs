/// A contiguous range of ids, `end` excluded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IdRange<Id> {
    pub start: Id,
    pub end: Id,
}

impl<Id> std::fmt::Debug for IdRange<Id>
where
    Id: Copy,
    usize: From<Id>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdRange({}..{})", usize::from(self.start), usize::from(self.end))
    }
}

impl<Id> Default for IdRange<Id>
where
    Id: From<usize>,
{
    fn default() -> Self {
        Self {
            start: Id::from(0),
            end: Id::from(0),
        }
    }
}

impl<Id> IdRange<Id>
where
    Id: From<usize> + Copy + 'static,
    usize: From<Id>,
{
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_start_and_end(start: usize, end: usize) -> Self {
        Self {
            start: Id::from(start),
            end: Id::from(end),
        }
    }

    pub fn from_start_and_length(start: usize, length: usize) -> Self {
        Self::from_start_and_end(start, start + length)
    }

    pub fn len(&self) -> usize {
        usize::from(self.end).saturating_sub(usize::from(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, offset: usize) -> Option<Id> {
        (offset < self.len()).then(|| Id::from(usize::from(self.start) + offset))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Id> + DoubleEndedIterator + 'static {
        (usize::from(self.start)..usize::from(self.end)).map(Id::from)
    }
}

impl<Id> IntoIterator for IdRange<Id>
where
    Id: From<usize> + Copy + 'static,
    usize: From<Id>,
{
    type Item = Id;
    type IntoIter = std::iter::Map<std::ops::Range<usize>, fn(usize) -> Id>;

    fn into_iter(self) -> Self::IntoIter {
        (usize::from(self.start)..usize::from(self.end)).map(Id::from as fn(usize) -> Id)
    }
}
