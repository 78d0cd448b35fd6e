/*!
# Growable Vertex Buffers

Flat `Pod` buffers backed by a zero-filled allocation that doubles whenever
the next write would not fit. Only the written prefix is ever exposed.
*/

use bytemuck::Pod;

/// Starting float slots for vertex positions (x, y pairs)
pub const STARTING_POSITIONS_LENGTH: usize = 1 << 20;
/// Starting slots for per-vertex palette indices
pub const STARTING_COLORS_LENGTH: usize = 1 << 21;
/// Starting slots for triangle vertex indices
pub const STARTING_INDICES_LENGTH: usize = 1 << 21;

#[derive(Debug, Clone)]
pub struct GrowableBuffer<T: Pod> {
    data: Vec<T>,
    len: usize,
    grow_events: usize,
}

impl<T: Pod> GrowableBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![T::zeroed(); capacity.max(1)],
            len: 0,
            grow_events: 0,
        }
    }

    /// Make room for `additional` more elements, doubling as often as needed.
    pub fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.len + additional;
        if needed <= self.data.len() {
            return;
        }

        let mut capacity = self.data.len();
        while capacity < needed {
            capacity *= 2;
        }
        log::trace!("Growing buffer from {} to {} slots", self.data.len(), capacity);
        self.data.resize(capacity, T::zeroed());
        self.grow_events += 1;
    }

    pub fn push(&mut self, value: T) {
        self.ensure_capacity(1);
        self.data[self.len] = value;
        self.len += 1;
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.ensure_capacity(values.len());
        self.data[self.len..self.len + values.len()].copy_from_slice(values);
        self.len += values.len();
    }

    /// Forget the written elements but keep the allocation
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of times the backing allocation has doubled
    pub fn grow_events(&self) -> usize {
        self.grow_events
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.len]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Owned copy of the written prefix
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_doubles_when_full() {
        let mut buffer = GrowableBuffer::<f32>::with_capacity(4);
        for i in 0..5 {
            buffer.push(i as f32);
        }
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.grow_events(), 1);
        assert_eq!(buffer.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_large_extend_grows_enough() {
        let mut buffer = GrowableBuffer::<i32>::with_capacity(2);
        buffer.extend_from_slice(&[1; 9]);
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.len(), 9);
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut buffer = GrowableBuffer::<i32>::with_capacity(2);
        buffer.extend_from_slice(&[1, 2, 3]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
        assert!(buffer.as_slice().is_empty());
    }

    #[test]
    fn test_byte_view_is_exact() {
        let mut buffer = GrowableBuffer::<f32>::with_capacity(16);
        buffer.extend_from_slice(&[1.0, 2.0]);
        assert_eq!(buffer.as_bytes().len(), 8);
        assert_eq!(&buffer.as_bytes()[..4], &1.0f32.to_ne_bytes());
    }

    proptest! {
        #[test]
        fn prop_growth_preserves_prefix(values in prop::collection::vec(any::<i32>(), 1..200), start in 1usize..8) {
            let mut buffer = GrowableBuffer::<i32>::with_capacity(start);
            for (i, v) in values.iter().enumerate() {
                let before = buffer.to_vec();
                buffer.push(*v);
                prop_assert_eq!(&buffer.as_slice()[..i], &before[..]);
            }
            prop_assert_eq!(buffer.as_slice(), &values[..]);
        }
    }
}
