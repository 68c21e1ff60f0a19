//! Element-data pointers: a per-element index from data name to the data's
//! type and the frames where it has a value.
//!
//! The index is derived. It is updated on every write and can always be
//! rebuilt from the element's static data and its per-frame data.

use std::collections::BTreeMap;

use openlabel_core::{DataType, ElementData, ElementDataSet, FrameInterval, FrameIntervals};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementDataPointer {
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Empty when the data only exists statically.
    #[serde(default)]
    pub frame_intervals: FrameIntervals,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_pointers: BTreeMap<String, DataType>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPointers {
    pointers: BTreeMap<String, ElementDataPointer>,
}

impl DataPointers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn get(&self, name: &str) -> Option<&ElementDataPointer> {
        self.pointers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ElementDataPointer)> {
        self.pointers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Frames where any payload of the element has a value.
    pub fn frame_intervals(&self) -> FrameIntervals {
        let mut out = FrameIntervals::new();
        for pointer in self.pointers.values() {
            out.union(&pointer.frame_intervals);
        }
        out
    }

    /// Account for one write of `data`, statically or at `frame`.
    ///
    /// The recorded type is the one of the value at the latest frame, or of
    /// the static value when the name has no frames. It does not depend on
    /// the order of the writes.
    pub fn record(&mut self, data: &ElementData, frame: Option<u64>) {
        let pointer = self
            .pointers
            .entry(data.name.clone())
            .or_insert_with(|| ElementDataPointer {
                data_type: data.data_type(),
                frame_intervals: FrameIntervals::new(),
                attribute_pointers: BTreeMap::new(),
            });
        let latest = match frame {
            None => pointer.frame_intervals.is_empty(),
            Some(f) => pointer
                .frame_intervals
                .outer()
                .map_or(true, |outer| f >= outer.end()),
        };
        if latest {
            pointer.data_type = data.data_type();
        }
        if let Some(f) = frame {
            pointer.frame_intervals.union_interval(FrameInterval::single(f));
        }
        for attr in data.attributes.iter() {
            pointer
                .attribute_pointers
                .insert(attr.name.clone(), attr.data_type());
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ElementDataPointer> {
        self.pointers.remove(name)
    }

    /// Recompute from scratch: static data first, then frames ascending.
    pub fn rebuild<'a>(
        static_data: &ElementDataSet,
        frames: impl IntoIterator<Item = (u64, &'a ElementDataSet)>,
    ) -> Self {
        let mut out = Self::new();
        for data in static_data.iter() {
            out.record(data, None);
        }
        let mut frames: Vec<_> = frames.into_iter().collect();
        frames.sort_by_key(|(f, _)| *f);
        for (f, set) in frames {
            for data in set.iter() {
                out.record(data, Some(f));
            }
        }
        out
    }
}
